//! Provisioner registry.

use super::{
    ArchProvisioner, BuildrootProvisioner, CentosProvisioner, DebianProvisioner,
    FedoraProvisioner, ProvisionContext, Provisioner, RedHatProvisioner, SuseProvisioner,
    UbuntuSystemdProvisioner, UbuntuUpstartProvisioner,
};

/// Builds a provisioner bound to one machine.
pub type ProvisionerConstructor = fn(ProvisionContext) -> Box<dyn Provisioner>;

/// A named provisioner constructor.
#[derive(Debug, Clone, Copy)]
pub struct RegisteredProvisioner {
    pub name: &'static str,
    pub new: ProvisionerConstructor,
}

/// Ordered set of provisioner constructors.
///
/// Detection walks the entries in registration order, so the order is part
/// of the contract. A registry is built once and then only read.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: Vec<RegisteredProvisioner>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in OS family in its fixed order.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("arch", |ctx| Box::new(ArchProvisioner::new(ctx)));
        registry.register("buildroot", |ctx| Box::new(BuildrootProvisioner::new(ctx)));
        registry.register("centos", |ctx| Box::new(CentosProvisioner::new(ctx)));
        registry.register("debian", |ctx| Box::new(DebianProvisioner::new(ctx)));
        registry.register("fedora", |ctx| Box::new(FedoraProvisioner::new(ctx)));
        registry.register("redhat", |ctx| Box::new(RedHatProvisioner::new(ctx)));
        registry.register("suse", |ctx| Box::new(SuseProvisioner::new(ctx)));
        registry.register("ubuntu-systemd", |ctx| Box::new(UbuntuSystemdProvisioner::new(ctx)));
        registry.register("ubuntu-upstart", |ctx| Box::new(UbuntuUpstartProvisioner::new(ctx)));
        registry
    }

    /// Adds `name`; re-registering a name replaces its constructor in place.
    pub fn register(&mut self, name: &'static str, new: ProvisionerConstructor) {
        let entry = RegisteredProvisioner { name, new };
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredProvisioner> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredProvisioner> {
        self.entries.iter()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.name).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
