//! Debian and Raspbian.

use super::{
    FamilyTraits, InitSystem, PackageManager, ProvisionContext, Provisioner, ProvisionerBase,
    StorageDriverDefault, UnitTemplate, provisioner_plumbing,
};

static TRAITS: FamilyTraits = FamilyTraits {
    package_manager: PackageManager::Apt,
    init_system: InitSystem::Systemd,
    unit_template: UnitTemplate::Systemd,
    storage_driver: StorageDriverDefault::Fixed("overlay2"),
    base_packages: &["curl"],
    daemon_package: Some("docker.io"),
    options_dir: "/etc/docker",
    unit_path: "/etc/systemd/system/docker.service",
};

pub struct DebianProvisioner {
    base: ProvisionerBase,
}

impl DebianProvisioner {
    pub fn new(context: ProvisionContext) -> Self {
        Self {
            base: ProvisionerBase::new(context, &TRAITS),
        }
    }
}

impl Provisioner for DebianProvisioner {
    provisioner_plumbing!(TRAITS);

    fn name(&self) -> &'static str {
        "debian"
    }

    fn compatible_with_host(&self) -> bool {
        self.os_release()
            .is_some_and(|r| matches!(r.id.as_str(), "debian" | "raspbian"))
    }
}
