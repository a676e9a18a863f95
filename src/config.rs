//! Machine profile loading and validation.

use std::fs::File;
use std::io::BufReader;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use tracing::debug;

use crate::auth::AuthOptions;
use crate::driver::DriverConfig;
use crate::engine::EngineOptions;
use crate::error::RsmachineError;
use crate::provision::is_valid_hostname;
use crate::swarm::SwarmOptions;
use crate::waiter::WaiterConfig;

/// One machine and everything needed to provision it.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Profile {
    /// Machine name; becomes the remote hostname.
    pub name: String,
    pub driver: DriverConfig,
    #[serde(default)]
    pub engine: EngineOptions,
    #[serde(default)]
    pub auth: AuthOptions,
    #[serde(default)]
    pub swarm: SwarmOptions,
    #[serde(default)]
    pub waiter: WaiterConfig,
}

impl Profile {
    /// Resolves relative local paths (TLS material, SSH key) against `base_dir`.
    pub fn resolve_paths(&mut self, base_dir: &Utf8Path) {
        self.auth.resolve_paths(base_dir);
        let DriverConfig::Generic(generic) = &mut self.driver;
        if let Some(key) = generic.ssh_key.as_mut().filter(|k| k.is_relative()) {
            *key = base_dir.join(&*key);
        }
    }

    /// Checks constraints serde cannot express.
    pub fn validate(&self) -> Result<(), RsmachineError> {
        if !is_valid_hostname(&self.name) {
            return Err(RsmachineError::Validation(format!(
                "machine name '{}' is not a valid hostname",
                self.name
            )));
        }

        let DriverConfig::Generic(generic) = &self.driver;
        if generic.ip.trim().is_empty() {
            return Err(RsmachineError::Validation(
                "generic driver requires a non-empty ip".to_string(),
            ));
        }

        if self.waiter.max_attempts == 0 {
            return Err(RsmachineError::Validation(
                "waiter.max_attempts must be greater than 0".to_string(),
            ));
        }

        if let Some(value) = self.engine.flag_values().find(|v| v.contains(['\n', '\r'])) {
            return Err(RsmachineError::Validation(format!(
                "engine option {:?} must not contain a line break",
                value
            )));
        }

        if self.swarm.is_swarm && self.swarm.discovery.trim().is_empty() {
            return Err(RsmachineError::Validation(
                "swarm is enabled but no discovery is configured".to_string(),
            ));
        }

        let tls_paths = [
            &self.auth.ca_cert_path,
            &self.auth.server_cert_path,
            &self.auth.server_key_path,
        ];
        let configured = tls_paths.iter().filter(|p| p.is_some()).count();
        if configured != 0 && configured != tls_paths.len() {
            return Err(RsmachineError::Validation(
                "auth requires ca_cert_path, server_cert_path and server_key_path together"
                    .to_string(),
            ));
        }

        if self.swarm.is_swarm && configured == 0 {
            return Err(RsmachineError::Validation(
                "swarm is enabled but no TLS material is configured in auth".to_string(),
            ));
        }

        Ok(())
    }
}

/// Reads a profile and resolves its relative paths against its own directory.
///
/// # Errors
///
/// Returns `RsmachineError::Io` if the file cannot be opened and
/// `RsmachineError::Config` if it is not a valid profile.
pub fn load_profile(path: &Utf8Path) -> Result<Profile, RsmachineError> {
    let file = File::open(path)
        .map_err(|e| RsmachineError::io(format!("failed to load file: {}", path), e))?;
    let reader = BufReader::new(file);
    let mut profile: Profile = serde_yaml::from_reader(reader)
        .map_err(|e| RsmachineError::Config(format!("failed to parse yaml: {}: {}", path, e)))?;

    let base_dir = match path.parent() {
        Some(dir) if !dir.as_str().is_empty() => dir.to_path_buf(),
        _ => Utf8PathBuf::from("."),
    };
    profile.resolve_paths(&base_dir);
    debug!("loaded profile for machine {}", profile.name);

    Ok(profile)
}
