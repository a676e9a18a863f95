//! Docker daemon runtime options.

use serde::{Deserialize, Serialize};

/// Port the daemon listens on for TLS-secured remote access.
pub const DEFAULT_PORT: u16 = 2376;

/// Daemon runtime configuration.
///
/// Each list entry becomes one repeated flag on the daemon command line;
/// `env` entries are `KEY=VALUE` pairs exported to the daemon process.
/// An empty `storage_driver` means "unset" and is filled in by the
/// provisioner with its family default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineOptions {
    pub env: Vec<String>,
    pub labels: Vec<String>,
    pub insecure_registry: Vec<String>,
    pub registry_mirror: Vec<String>,
    pub storage_driver: String,
    pub arbitrary_flags: Vec<String>,
}

impl EngineOptions {
    /// Appends `label` unless it is already present.
    pub fn add_label(&mut self, label: String) {
        if !self.labels.contains(&label) {
            self.labels.push(label);
        }
    }

    /// Iterates over every value that ends up on the daemon command line.
    pub(crate) fn flag_values(&self) -> impl Iterator<Item = &str> {
        self.labels
            .iter()
            .chain(&self.insecure_registry)
            .chain(&self.registry_mirror)
            .chain(&self.arbitrary_flags)
            .map(String::as_str)
            .chain(std::iter::once(self.storage_driver.as_str()))
    }
}
