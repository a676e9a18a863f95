//! TLS trust for the daemon endpoint.
//!
//! [`AuthOptions`] carries the local certificate paths from the machine
//! profile and the remote paths the provisioner finalizes. The
//! [`AuthConfigurer`] trait is the seam the pipeline calls once the daemon
//! is up; [`CertCopier`] is the built-in implementation that distributes
//! existing PEM files (no certificate generation happens here).

use std::fs;

use anyhow::Result;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::channel::{shell_quote, write_file_command};
use crate::engine::DEFAULT_PORT;
use crate::error::RsmachineError;
use crate::provision::{Provisioner, UnitUpdate, wait_for_docker};

/// Certificate locations, local and remote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthOptions {
    pub ca_cert_path: Option<Utf8PathBuf>,
    pub server_cert_path: Option<Utf8PathBuf>,
    pub server_key_path: Option<Utf8PathBuf>,
    #[serde(skip_deserializing)]
    pub ca_cert_remote_path: String,
    #[serde(skip_deserializing)]
    pub server_cert_remote_path: String,
    #[serde(skip_deserializing)]
    pub server_key_remote_path: String,
}

impl AuthOptions {
    /// True when all three remote paths are set.
    pub fn tls_configured(&self) -> bool {
        !self.ca_cert_remote_path.is_empty()
            && !self.server_cert_remote_path.is_empty()
            && !self.server_key_remote_path.is_empty()
    }

    /// True when local material is configured and its remote paths are
    /// finalized, i.e. the daemon listens on its TCP port.
    pub fn serves_tls(&self) -> bool {
        self.local_material().is_some() && self.tls_configured()
    }

    /// Pairs of (local file, remote path), if all local files are configured.
    pub fn local_material(&self) -> Option<[(&Utf8Path, &str); 3]> {
        Some([
            (self.ca_cert_path.as_deref()?, self.ca_cert_remote_path.as_str()),
            (self.server_cert_path.as_deref()?, self.server_cert_remote_path.as_str()),
            (self.server_key_path.as_deref()?, self.server_key_remote_path.as_str()),
        ])
    }

    /// Resolves relative local paths against `base_dir`.
    pub fn resolve_paths(&mut self, base_dir: &Utf8Path) {
        for path in [
            &mut self.ca_cert_path,
            &mut self.server_cert_path,
            &mut self.server_key_path,
        ]
        .into_iter()
        .flatten()
        {
            if path.is_relative() {
                *path = base_dir.join(&*path);
            }
        }
    }
}

/// Secures the daemon endpoint of a provisioned machine.
pub trait AuthConfigurer: Send + Sync {
    /// Installs TLS material on the machine behind `provisioner`.
    ///
    /// Called after the remote auth paths have been finalized; the
    /// configurer may update the provisioner's auth options. When local
    /// material is configured the pipeline has not installed daemon options
    /// yet, so the configurer must render and apply them.
    fn configure_auth(&self, provisioner: &mut dyn Provisioner) -> Result<()>;
}

/// Uploads pre-generated certificates and switches the daemon to TLS.
#[derive(Debug, Default, Clone, Copy)]
pub struct CertCopier;

impl AuthConfigurer for CertCopier {
    fn configure_auth(&self, provisioner: &mut dyn Provisioner) -> Result<()> {
        let auth = provisioner.auth_options().clone();
        let Some(material) = auth.local_material() else {
            warn!(
                "no TLS material configured for {}; the daemon stays on its local socket",
                provisioner.driver().machine_name()
            );
            return Ok(());
        };

        info!("copying certs to the remote machine");
        for (local, remote) in material {
            let content = fs::read_to_string(local)
                .map_err(|e| RsmachineError::io(format!("failed to read certificate: {}", local), e))?;
            provisioner.ssh_command(&write_file_command(&content, remote))?;
        }
        provisioner.ssh_command(&format!(
            "sudo chmod 600 {}",
            shell_quote(&auth.server_key_remote_path)
        ))?;

        info!("setting docker configuration on the remote daemon");
        let options = provisioner.generate_docker_options(DEFAULT_PORT)?;
        if provisioner.apply_docker_options(&options)? == UnitUpdate::Changed {
            wait_for_docker(&*provisioner)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tls_configured_requires_all_remote_paths() {
        let mut auth = AuthOptions {
            ca_cert_remote_path: "/etc/docker/ca.pem".to_string(),
            server_cert_remote_path: "/etc/docker/server.pem".to_string(),
            ..Default::default()
        };
        assert!(!auth.tls_configured());
        auth.server_key_remote_path = "/etc/docker/server-key.pem".to_string();
        assert!(auth.tls_configured());
    }

    #[test]
    fn test_local_material_requires_all_local_paths() {
        let mut auth = AuthOptions {
            ca_cert_path: Some("ca.pem".into()),
            server_cert_path: Some("server.pem".into()),
            ..Default::default()
        };
        assert!(auth.local_material().is_none());
        auth.server_key_path = Some("server-key.pem".into());
        assert!(auth.local_material().is_some());
    }

    #[test]
    fn test_serves_tls_needs_material_and_remote_paths() {
        let mut auth = AuthOptions {
            ca_cert_remote_path: "/etc/docker/ca.pem".to_string(),
            server_cert_remote_path: "/etc/docker/server.pem".to_string(),
            server_key_remote_path: "/etc/docker/server-key.pem".to_string(),
            ..Default::default()
        };
        assert!(!auth.serves_tls());
        auth.ca_cert_path = Some("ca.pem".into());
        auth.server_cert_path = Some("server.pem".into());
        auth.server_key_path = Some("server-key.pem".into());
        assert!(auth.serves_tls());
        auth.ca_cert_remote_path.clear();
        assert!(!auth.serves_tls());
    }

    #[test]
    fn test_resolve_paths_keeps_absolute() {
        let mut auth = AuthOptions {
            ca_cert_path: Some("certs/ca.pem".into()),
            server_cert_path: Some("/abs/server.pem".into()),
            server_key_path: None,
            ..Default::default()
        };
        auth.resolve_paths(Utf8Path::new("/profiles"));
        assert_eq!(auth.ca_cert_path.as_deref(), Some(Utf8Path::new("/profiles/certs/ca.pem")));
        assert_eq!(auth.server_cert_path.as_deref(), Some(Utf8Path::new("/abs/server.pem")));
        assert!(auth.server_key_path.is_none());
    }
}
