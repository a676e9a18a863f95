//! Provisioner selection.

use anyhow::Result;
use tracing::{debug, info};

use super::{OsRelease, ProvisionContext, Provisioner, Registry};
use crate::error::RsmachineError;

/// Picks the provisioner for a machine from a [`Registry`].
pub struct Detector<'a> {
    registry: &'a Registry,
}

impl<'a> Detector<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    /// Probes the remote OS once and returns the first compatible provisioner.
    ///
    /// # Errors
    ///
    /// A failed probe is returned as-is (no retry). If no entry accepts the
    /// host, fails with [`RsmachineError::NoCompatibleProvisioner`].
    pub fn detect(&self, context: &ProvisionContext) -> Result<Box<dyn Provisioner>> {
        info!("waiting for SSH to be available and detecting the operating system");
        let release = OsRelease::probe(context.channel.as_ref())?;
        debug!(id = %release.id, version_id = %release.version_id, "remote os-release");

        for entry in self.registry.iter() {
            let mut provisioner = (entry.new)(context.clone());
            provisioner.set_os_release_info(release.clone());
            if provisioner.compatible_with_host() {
                info!("detected provisioner: {}", entry.name);
                return Ok(provisioner);
            }
        }

        Err(RsmachineError::NoCompatibleProvisioner { id: release.id }.into())
    }
}
