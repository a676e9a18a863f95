//! Remote command channel.
//!
//! Everything the provisioning engine does to a machine goes through
//! [`CommandChannel::run`]: one shell command in, trimmed stdout out.
//! There is no retry at this layer.

mod ssh;

use anyhow::Result;

pub use ssh::SshChannel;

/// Runs a shell command on the remote host.
pub trait CommandChannel: Send + Sync {
    /// Executes `command` remotely.
    ///
    /// Returns the trimmed standard output on success. A non-zero exit or an
    /// unreachable host is reported as an error.
    fn run(&self, command: &str) -> Result<String>;
}

/// Quotes `value` for a POSIX shell.
///
/// Bare words made only of safe characters are returned unchanged; anything
/// else is wrapped in single quotes with embedded quotes spelled `'\''`.
pub fn shell_quote(value: &str) -> String {
    let is_safe = |c: char| c.is_ascii_alphanumeric() || "@%+=:,./_-".contains(c);
    if !value.is_empty() && value.chars().all(is_safe) {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Builds a command that writes `content` verbatim to `path` with root privileges.
pub(crate) fn write_file_command(content: &str, path: &str) -> String {
    format!(
        "printf %s {} | sudo tee {} > /dev/null",
        shell_quote(content),
        shell_quote(path)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_quote_safe_word_unchanged() {
        assert_eq!(shell_quote("docker"), "docker");
        assert_eq!(shell_quote("/etc/docker/ca.pem"), "/etc/docker/ca.pem");
        assert_eq!(shell_quote("provider=generic"), "provider=generic");
    }

    #[test]
    fn test_shell_quote_wraps_spaces_and_metacharacters() {
        assert_eq!(shell_quote("a b"), "'a b'");
        assert_eq!(shell_quote("$(reboot)"), "'$(reboot)'");
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn test_shell_quote_escapes_single_quote() {
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }

    #[test]
    fn test_write_file_command() {
        assert_eq!(
            write_file_command("a\nb", "/etc/hostname"),
            "printf %s 'a\nb' | sudo tee /etc/hostname > /dev/null"
        );
    }
}
