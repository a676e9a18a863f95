//! Init-system commands.

use strum::Display;

/// Operation on a remote system service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ServiceAction {
    Start,
    Stop,
    Restart,
    Enable,
    Disable,
    DaemonReload,
}

/// Service manager running on the remote host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum InitSystem {
    Systemd,
    Upstart,
}

impl InitSystem {
    /// Command performing `action` on the service called `name`.
    pub fn service_command(self, name: &str, action: ServiceAction) -> String {
        match (self, action) {
            (Self::Systemd, ServiceAction::DaemonReload) => "sudo systemctl daemon-reload".to_string(),
            (Self::Systemd, action) => format!("sudo systemctl -f {} {}", action, name),
            (Self::Upstart, ServiceAction::DaemonReload) => {
                "sudo initctl reload-configuration".to_string()
            }
            (Self::Upstart, ServiceAction::Enable | ServiceAction::Disable) => {
                format!("sudo update-rc.d {} {}", name, action)
            }
            (Self::Upstart, action) => format!("sudo service {} {}", name, action),
        }
    }

    /// Command that activates a changed unit for `name`.
    pub fn apply_command(self, name: &str) -> String {
        match self {
            Self::Systemd => format!(
                "{} && {} && {}",
                self.service_command(name, ServiceAction::DaemonReload),
                self.service_command(name, ServiceAction::Enable),
                self.service_command(name, ServiceAction::Restart)
            ),
            Self::Upstart => self.service_command(name, ServiceAction::Restart),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_action_display() {
        assert_eq!(ServiceAction::DaemonReload.to_string(), "daemon-reload");
        assert_eq!(ServiceAction::Restart.to_string(), "restart");
    }

    #[test]
    fn test_systemd_commands() {
        assert_eq!(
            InitSystem::Systemd.service_command("docker", ServiceAction::Start),
            "sudo systemctl -f start docker"
        );
        assert_eq!(
            InitSystem::Systemd.apply_command("docker"),
            "sudo systemctl daemon-reload && sudo systemctl -f enable docker && sudo systemctl -f restart docker"
        );
    }

    #[test]
    fn test_upstart_commands() {
        assert_eq!(
            InitSystem::Upstart.service_command("docker", ServiceAction::Stop),
            "sudo service docker stop"
        );
        assert_eq!(
            InitSystem::Upstart.service_command("docker", ServiceAction::Enable),
            "sudo update-rc.d docker enable"
        );
        assert_eq!(InitSystem::Upstart.apply_command("docker"), "sudo service docker restart");
    }
}
