//! Buildroot images (boot2docker-style).
//!
//! The daemon binary is baked into the image, so nothing is installed; the
//! image's own unit is overridden with a drop-in.

use super::{
    FamilyTraits, InitSystem, PackageManager, ProvisionContext, Provisioner, ProvisionerBase,
    StorageDriverDefault, UnitTemplate, provisioner_plumbing,
};

static TRAITS: FamilyTraits = FamilyTraits {
    package_manager: PackageManager::None,
    init_system: InitSystem::Systemd,
    unit_template: UnitTemplate::SystemdDropIn,
    storage_driver: StorageDriverDefault::Fixed("overlay2"),
    base_packages: &[],
    daemon_package: None,
    options_dir: "/var/lib/buildroot",
    unit_path: "/etc/systemd/system/docker.service.d/10-machine.conf",
};

pub struct BuildrootProvisioner {
    base: ProvisionerBase,
}

impl BuildrootProvisioner {
    pub fn new(context: ProvisionContext) -> Self {
        Self {
            base: ProvisionerBase::new(context, &TRAITS),
        }
    }
}

impl Provisioner for BuildrootProvisioner {
    provisioner_plumbing!(TRAITS);

    fn name(&self) -> &'static str {
        "buildroot"
    }

    fn compatible_with_host(&self) -> bool {
        self.os_release().is_some_and(|r| r.id == "buildroot")
    }
}
