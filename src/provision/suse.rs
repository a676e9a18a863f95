//! SUSE Linux Enterprise and openSUSE.

use anyhow::{Context, Result};
use tracing::{debug, info};

use super::{
    FamilyTraits, InitSystem, PackageManager, ProvisionContext, Provisioner, ProvisionerBase,
    StorageDriverDefault, UnitTemplate, provisioner_plumbing,
};
use crate::engine::DEFAULT_PORT;

static TRAITS: FamilyTraits = FamilyTraits {
    package_manager: PackageManager::Zypper,
    init_system: InitSystem::Systemd,
    unit_template: UnitTemplate::Systemd,
    storage_driver: StorageDriverDefault::ProbeBtrfs,
    base_packages: &["curl"],
    daemon_package: Some("docker"),
    options_dir: "/etc/docker",
    unit_path: "/etc/systemd/system/docker.service",
};

const CONTAINERS_MODULE: &str = "sudo -E SUSEConnect -p sle-module-containers/12/$(uname -m) -r ''";

pub struct SuseProvisioner {
    base: ProvisionerBase,
}

impl SuseProvisioner {
    pub fn new(context: ProvisionContext) -> Self {
        Self {
            base: ProvisionerBase::new(context, &TRAITS),
        }
    }

    fn is_opensuse(&self) -> bool {
        self.os_release()
            .is_some_and(|r| r.id.to_lowercase().starts_with("opensuse"))
    }
}

impl Provisioner for SuseProvisioner {
    provisioner_plumbing!(TRAITS);

    fn name(&self) -> &'static str {
        "suse"
    }

    fn compatible_with_host(&self) -> bool {
        self.os_release().is_some_and(|r| r.id_like_contains("suse"))
    }

    // SLE needs the containers module before docker can be installed.
    fn before_install(&mut self) -> Result<()> {
        if self.is_opensuse() {
            return Ok(());
        }
        info!("adding the SLE containers module");
        self.ssh_command(CONTAINERS_MODULE).context(
            "failed to add the 'containers' module; make sure this machine is registered \
             against SUSE Customer Center or a local Subscription Management Tool",
        )?;
        Ok(())
    }

    fn after_install(&mut self) -> Result<()> {
        self.ssh_command("yes no | sudo -E ln -si /usr/sbin/runc /usr/sbin/docker-runc")?;
        self.ssh_command("sudo -E ln -sf /usr/sbin/containerd /usr/sbin/docker-containerd")?;
        self.ssh_command(
            "sudo -E ln -sf /usr/sbin/containerd-shim /usr/sbin/docker-containerd-shim",
        )?;

        if self.ssh_command("rpm -q yast2-firewall").is_ok() {
            debug!("opening docker port in the firewall");
            self.ssh_command(&format!(
                "sudo -E /sbin/yast2 firewall services add ipprotocol=tcp tcpport={} zone=EXT",
                DEFAULT_PORT
            ))?;
        }
        Ok(())
    }
}
