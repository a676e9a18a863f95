//! Command channel backed by the system `ssh` client.

use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use super::CommandChannel;
use crate::driver::Driver;
use crate::error::RsmachineError;
use crate::executor::{CommandExecutor, CommandSpec};

/// Runs remote commands by invoking `ssh` through a local [`CommandExecutor`].
pub struct SshChannel {
    executor: Arc<dyn CommandExecutor>,
    host: String,
    port: u16,
    user: String,
    key_path: Option<String>,
}

impl SshChannel {
    /// Creates a channel for `user@host:port`, optionally authenticating with a key file.
    pub fn new(
        executor: Arc<dyn CommandExecutor>,
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        key_path: Option<String>,
    ) -> Self {
        Self {
            executor,
            host: host.into(),
            port,
            user: user.into(),
            key_path,
        }
    }

    /// Creates a channel using the SSH coordinates exposed by `driver`.
    pub fn from_driver(executor: Arc<dyn CommandExecutor>, driver: &dyn Driver) -> Result<Self> {
        Ok(Self::new(
            executor,
            driver.ip()?,
            driver.ssh_port(),
            driver.ssh_user(),
            driver.ssh_key_path().map(str::to_string),
        ))
    }

    /// Builds the `ssh` invocation for a remote command.
    pub(crate) fn command_spec(&self, command: &str) -> CommandSpec {
        let mut args: Vec<String> = [
            "StrictHostKeyChecking=no",
            "UserKnownHostsFile=/dev/null",
            "LogLevel=quiet",
            "PasswordAuthentication=no",
            "ConnectionAttempts=3",
            "ConnectTimeout=10",
            "ControlMaster=no",
            "ControlPath=none",
        ]
        .iter()
        .flat_map(|opt| ["-o".to_string(), opt.to_string()])
        .collect();

        if let Some(key) = &self.key_path {
            args.extend(["-o".to_string(), "IdentitiesOnly=yes".to_string()]);
            args.extend(["-i".to_string(), key.clone()]);
        }
        args.extend(["-p".to_string(), self.port.to_string()]);
        args.push(format!("{}@{}", self.user, self.host));
        args.push("--".to_string());
        args.push(command.to_string());

        CommandSpec::new("ssh", args)
    }
}

impl CommandChannel for SshChannel {
    fn run(&self, command: &str) -> Result<String> {
        debug!(host = %self.host, "ssh: {}", command);
        let spec = self.command_spec(command);
        let result = self.executor.execute(&spec)?;

        if !result.success() {
            let status = match result.code() {
                Some(code) => format!("exit status: {}", code),
                None => "terminated by signal".to_string(),
            };
            return Err(RsmachineError::Execution {
                command: command.to_string(),
                status,
            }
            .into());
        }

        Ok(result.stdout.trim().to_string())
    }
}
