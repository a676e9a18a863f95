//! Remote OS identification.

use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;

use crate::channel::CommandChannel;
use crate::error::RsmachineError;

const PROBE_COMMAND: &str = "cat /etc/os-release 2>/dev/null || cat /usr/lib/os-release";

static LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Z][A-Z0-9_]*)=(.*)$").expect("valid regex")
});

/// Identity fields of an `os-release` file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OsRelease {
    pub name: String,
    pub id: String,
    pub id_like: String,
    pub pretty_name: String,
    pub version: String,
    pub version_id: String,
}

fn unquote(value: &str) -> String {
    let value = value.trim();
    let stripped = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value);
    stripped.replace("\\\"", "\"")
}

impl OsRelease {
    /// Parses `KEY=value` lines; unknown keys, comments and junk are ignored.
    pub fn parse(content: &str) -> Self {
        let mut release = Self::default();
        for line in content.lines() {
            let Some(caps) = LINE_RE.captures(line.trim()) else {
                continue;
            };
            let value = unquote(&caps[2]);
            match &caps[1] {
                "NAME" => release.name = value,
                "ID" => release.id = value,
                "ID_LIKE" => release.id_like = value,
                "PRETTY_NAME" => release.pretty_name = value,
                "VERSION" => release.version = value,
                "VERSION_ID" => release.version_id = value,
                _ => {}
            }
        }
        release
    }

    /// Runs the identification probe over `channel`.
    ///
    /// A probe failure is fatal and carries [`RsmachineError::Probe`] in its chain.
    pub fn probe(channel: &dyn CommandChannel) -> Result<Self> {
        let content = channel.run(PROBE_COMMAND).map_err(|e| {
            e.context(RsmachineError::Probe(
                "failed to read os-release from the remote host".to_string(),
            ))
        })?;
        Ok(Self::parse(&content))
    }

    /// True if `ID_LIKE` lists `family` as one of its words.
    pub fn id_like_contains(&self, family: &str) -> bool {
        self.id_like.split_whitespace().any(|w| w == family)
    }

    /// `VERSION_ID` as `(major, minor)`; a missing minor counts as 0.
    pub fn version_tuple(&self) -> Option<(u32, u32)> {
        let mut parts = self.version_id.split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = match parts.next() {
            Some(minor) => minor.parse().ok()?,
            None => 0,
        };
        Some((major, minor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UBUNTU_1404: &str = r#"NAME="Ubuntu"
VERSION="14.04.5 LTS, Trusty Tahr"
ID=ubuntu
ID_LIKE=debian
PRETTY_NAME="Ubuntu 14.04.5 LTS"
VERSION_ID="14.04"
HOME_URL="http://www.ubuntu.com/"
"#;

    #[test]
    fn test_parse_ubuntu() {
        let release = OsRelease::parse(UBUNTU_1404);
        assert_eq!(release.name, "Ubuntu");
        assert_eq!(release.id, "ubuntu");
        assert_eq!(release.id_like, "debian");
        assert_eq!(release.pretty_name, "Ubuntu 14.04.5 LTS");
        assert_eq!(release.version, "14.04.5 LTS, Trusty Tahr");
        assert_eq!(release.version_id, "14.04");
        assert_eq!(release.version_tuple(), Some((14, 4)));
    }

    #[test]
    fn test_parse_ignores_comments_and_junk() {
        let release = OsRelease::parse("# comment\n\nnot a line\nID='arch'\n");
        assert_eq!(release.id, "arch");
        assert!(release.version_id.is_empty());
    }

    #[test]
    fn test_id_like_matches_whole_words() {
        let release = OsRelease {
            id_like: "suse opensuse".to_string(),
            ..Default::default()
        };
        assert!(release.id_like_contains("suse"));
        assert!(!release.id_like_contains("sus"));
    }

    #[test]
    fn test_version_tuple_edge_cases() {
        let with = |v: &str| OsRelease {
            version_id: v.to_string(),
            ..Default::default()
        };
        assert_eq!(with("9").version_tuple(), Some((9, 0)));
        assert_eq!(with("15.04").version_tuple(), Some((15, 4)));
        assert_eq!(with("").version_tuple(), None);
        assert_eq!(with("rolling").version_tuple(), None);
    }
}
