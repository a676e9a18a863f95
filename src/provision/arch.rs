//! Arch Linux and derivatives.

use super::{
    FamilyTraits, InitSystem, PackageManager, ProvisionContext, Provisioner, ProvisionerBase,
    StorageDriverDefault, UnitTemplate, provisioner_plumbing,
};

static TRAITS: FamilyTraits = FamilyTraits {
    package_manager: PackageManager::Pacman,
    init_system: InitSystem::Systemd,
    unit_template: UnitTemplate::Systemd,
    storage_driver: StorageDriverDefault::Fixed("overlay2"),
    base_packages: &[],
    daemon_package: Some("docker"),
    options_dir: "/etc/docker",
    unit_path: "/etc/systemd/system/docker.service",
};

pub struct ArchProvisioner {
    base: ProvisionerBase,
}

impl ArchProvisioner {
    pub fn new(context: ProvisionContext) -> Self {
        Self {
            base: ProvisionerBase::new(context, &TRAITS),
        }
    }
}

impl Provisioner for ArchProvisioner {
    provisioner_plumbing!(TRAITS);

    fn name(&self) -> &'static str {
        "arch"
    }

    fn compatible_with_host(&self) -> bool {
        self.os_release()
            .is_some_and(|r| r.id == "arch" || r.id_like_contains("arch"))
    }
}
