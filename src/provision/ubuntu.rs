//! Ubuntu, split at 15.04 where the init system moved to systemd.

use super::{
    FamilyTraits, InitSystem, OsRelease, PackageManager, ProvisionContext, Provisioner,
    ProvisionerBase, StorageDriverDefault, UnitTemplate, provisioner_plumbing,
};

const FIRST_SYSTEMD_RELEASE: (u32, u32) = (15, 4);

static SYSTEMD_TRAITS: FamilyTraits = FamilyTraits {
    package_manager: PackageManager::Apt,
    init_system: InitSystem::Systemd,
    unit_template: UnitTemplate::Systemd,
    storage_driver: StorageDriverDefault::Fixed("overlay2"),
    base_packages: &["curl"],
    daemon_package: Some("docker.io"),
    options_dir: "/etc/docker",
    unit_path: "/etc/systemd/system/docker.service",
};

static UPSTART_TRAITS: FamilyTraits = FamilyTraits {
    package_manager: PackageManager::Apt,
    init_system: InitSystem::Upstart,
    unit_template: UnitTemplate::Upstart,
    storage_driver: StorageDriverDefault::Fixed("overlay2"),
    base_packages: &["curl"],
    daemon_package: Some("docker.io"),
    options_dir: "/etc/docker",
    unit_path: "/etc/default/docker",
};

fn ubuntu_version(release: Option<&OsRelease>) -> Option<(u32, u32)> {
    release.filter(|r| r.id == "ubuntu")?.version_tuple()
}

pub struct UbuntuSystemdProvisioner {
    base: ProvisionerBase,
}

impl UbuntuSystemdProvisioner {
    pub fn new(context: ProvisionContext) -> Self {
        Self {
            base: ProvisionerBase::new(context, &SYSTEMD_TRAITS),
        }
    }
}

impl Provisioner for UbuntuSystemdProvisioner {
    provisioner_plumbing!(SYSTEMD_TRAITS);

    fn name(&self) -> &'static str {
        "ubuntu-systemd"
    }

    fn compatible_with_host(&self) -> bool {
        ubuntu_version(self.os_release()).is_some_and(|v| v >= FIRST_SYSTEMD_RELEASE)
    }
}

pub struct UbuntuUpstartProvisioner {
    base: ProvisionerBase,
}

impl UbuntuUpstartProvisioner {
    pub fn new(context: ProvisionContext) -> Self {
        Self {
            base: ProvisionerBase::new(context, &UPSTART_TRAITS),
        }
    }
}

impl Provisioner for UbuntuUpstartProvisioner {
    provisioner_plumbing!(UPSTART_TRAITS);

    fn name(&self) -> &'static str {
        "ubuntu-upstart"
    }

    fn compatible_with_host(&self) -> bool {
        ubuntu_version(self.os_release()).is_some_and(|v| v < FIRST_SYSTEMD_RELEASE)
    }
}
