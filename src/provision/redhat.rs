//! Red Hat family: RHEL, CentOS and Fedora.

use super::{
    FamilyTraits, InitSystem, PackageManager, ProvisionContext, Provisioner, ProvisionerBase,
    StorageDriverDefault, UnitTemplate, provisioner_plumbing,
};

static YUM_TRAITS: FamilyTraits = FamilyTraits {
    package_manager: PackageManager::Yum,
    init_system: InitSystem::Systemd,
    unit_template: UnitTemplate::Systemd,
    storage_driver: StorageDriverDefault::Fixed("overlay2"),
    base_packages: &["curl"],
    daemon_package: Some("docker"),
    options_dir: "/etc/docker",
    unit_path: "/etc/systemd/system/docker.service",
};

static DNF_TRAITS: FamilyTraits = FamilyTraits {
    package_manager: PackageManager::Dnf,
    init_system: InitSystem::Systemd,
    unit_template: UnitTemplate::Systemd,
    storage_driver: StorageDriverDefault::Fixed("overlay2"),
    base_packages: &["curl"],
    daemon_package: Some("docker"),
    options_dir: "/etc/docker",
    unit_path: "/etc/systemd/system/docker.service",
};

pub struct RedHatProvisioner {
    base: ProvisionerBase,
}

impl RedHatProvisioner {
    pub fn new(context: ProvisionContext) -> Self {
        Self {
            base: ProvisionerBase::new(context, &YUM_TRAITS),
        }
    }
}

impl Provisioner for RedHatProvisioner {
    provisioner_plumbing!(YUM_TRAITS);

    fn name(&self) -> &'static str {
        "redhat"
    }

    fn compatible_with_host(&self) -> bool {
        self.os_release().is_some_and(|r| r.id == "rhel")
    }
}

pub struct CentosProvisioner {
    base: ProvisionerBase,
}

impl CentosProvisioner {
    pub fn new(context: ProvisionContext) -> Self {
        Self {
            base: ProvisionerBase::new(context, &YUM_TRAITS),
        }
    }
}

impl Provisioner for CentosProvisioner {
    provisioner_plumbing!(YUM_TRAITS);

    fn name(&self) -> &'static str {
        "centos"
    }

    fn compatible_with_host(&self) -> bool {
        self.os_release().is_some_and(|r| r.id == "centos")
    }
}

pub struct FedoraProvisioner {
    base: ProvisionerBase,
}

impl FedoraProvisioner {
    pub fn new(context: ProvisionContext) -> Self {
        Self {
            base: ProvisionerBase::new(context, &DNF_TRAITS),
        }
    }
}

impl Provisioner for FedoraProvisioner {
    provisioner_plumbing!(DNF_TRAITS);

    fn name(&self) -> &'static str {
        "fedora"
    }

    fn compatible_with_host(&self) -> bool {
        self.os_release().is_some_and(|r| r.id == "fedora")
    }
}
