//! Package manager command table.

use anyhow::Result;
use strum::Display;
use tracing::{debug, info};

use crate::channel::{CommandChannel, shell_quote};

/// Operation on a remote package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, clap::ValueEnum)]
#[strum(serialize_all = "lowercase")]
pub enum PackageAction {
    Install,
    Remove,
    Upgrade,
}

/// Package manager of an OS family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum PackageManager {
    Apt,
    Zypper,
    Pacman,
    Yum,
    Dnf,
    /// The image ships everything it needs; package operations are no-ops.
    None,
}

struct PackageCommands {
    install: &'static str,
    remove: &'static str,
    upgrade: &'static str,
    installed: &'static str,
}

const APT: PackageCommands = PackageCommands {
    install: "sudo apt-get update -qq && DEBIAN_FRONTEND=noninteractive sudo -E apt-get install -y -o Dpkg::Options::=--force-confnew",
    remove: "DEBIAN_FRONTEND=noninteractive sudo -E apt-get remove -y",
    upgrade: "sudo apt-get update -qq && DEBIAN_FRONTEND=noninteractive sudo -E apt-get upgrade -y -o Dpkg::Options::=--force-confnew",
    installed: "dpkg -s",
};

const ZYPPER: PackageCommands = PackageCommands {
    install: "sudo -E zypper -n in",
    remove: "sudo -E zypper -n rm",
    upgrade: "sudo -E zypper -n up",
    installed: "rpm -q",
};

const PACMAN: PackageCommands = PackageCommands {
    install: "sudo pacman -S --noconfirm --needed",
    remove: "sudo pacman -R --noconfirm",
    upgrade: "sudo pacman -Syu --noconfirm",
    installed: "pacman -Q",
};

const YUM: PackageCommands = PackageCommands {
    install: "sudo -E yum install -y",
    remove: "sudo -E yum remove -y",
    upgrade: "sudo -E yum upgrade -y",
    installed: "rpm -q",
};

const DNF: PackageCommands = PackageCommands {
    install: "sudo -E dnf install -y",
    remove: "sudo -E dnf remove -y",
    upgrade: "sudo -E dnf upgrade -y",
    installed: "rpm -q",
};

impl PackageManager {
    fn commands(self) -> Option<&'static PackageCommands> {
        match self {
            Self::Apt => Some(&APT),
            Self::Zypper => Some(&ZYPPER),
            Self::Pacman => Some(&PACMAN),
            Self::Yum => Some(&YUM),
            Self::Dnf => Some(&DNF),
            Self::None => None,
        }
    }

    /// Command line performing `action` on `name`, or `None` for a no-op manager.
    pub fn command(self, name: &str, action: PackageAction) -> Option<String> {
        let commands = self.commands()?;
        let prefix = match action {
            PackageAction::Install => commands.install,
            PackageAction::Remove => commands.remove,
            PackageAction::Upgrade => commands.upgrade,
        };
        Some(format!("{} {}", prefix, shell_quote(name)))
    }

    /// Command exiting zero when `name` is already installed.
    pub fn installed_check(self, name: &str) -> Option<String> {
        let commands = self.commands()?;
        Some(format!("{} {} >/dev/null 2>&1", commands.installed, shell_quote(name)))
    }

    /// Runs `action` on `name` through `channel`.
    ///
    /// An install is skipped when the installed check succeeds.
    pub fn run(self, channel: &dyn CommandChannel, name: &str, action: PackageAction) -> Result<()> {
        let Some(command) = self.command(name, action) else {
            debug!("{}: skipping package {} of {}", self, action, name);
            return Ok(());
        };

        if action == PackageAction::Install {
            let installed = self
                .installed_check(name)
                .is_some_and(|check| channel.run(&check).is_ok());
            if installed {
                debug!("package {} is already installed", name);
                return Ok(());
            }
        }

        info!("{}: {} {}", self, action, name);
        channel.run(&command)?;
        Ok(())
    }
}
