//! Machine driver interface.
//!
//! Drivers own the machine's lifecycle; the provisioning engine only needs
//! its name, its address and how to reach it over SSH.

use anyhow::Result;
use serde::Deserialize;
use std::sync::Arc;

use crate::error::RsmachineError;

/// Read-only view of the machine being provisioned.
pub trait Driver: Send + Sync {
    /// Logical machine name; becomes the remote hostname.
    fn machine_name(&self) -> &str;

    /// Short driver identifier, used for the `provider=` engine label.
    fn driver_name(&self) -> &str;

    /// Address of the machine as seen from the caller.
    fn ip(&self) -> Result<String>;

    fn ssh_port(&self) -> u16 {
        22
    }

    fn ssh_user(&self) -> &str {
        "root"
    }

    fn ssh_key_path(&self) -> Option<&str> {
        None
    }
}

/// Driver for an already running host reachable over SSH.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericDriver {
    pub machine_name: String,
    pub ip: String,
    pub ssh_user: String,
    pub ssh_port: u16,
    pub ssh_key: Option<String>,
}

impl Driver for GenericDriver {
    fn machine_name(&self) -> &str {
        &self.machine_name
    }

    fn driver_name(&self) -> &str {
        "generic"
    }

    fn ip(&self) -> Result<String> {
        if self.ip.is_empty() {
            return Err(RsmachineError::Validation(format!(
                "machine '{}' has no IP address",
                self.machine_name
            ))
            .into());
        }
        Ok(self.ip.clone())
    }

    fn ssh_port(&self) -> u16 {
        self.ssh_port
    }

    fn ssh_user(&self) -> &str {
        &self.ssh_user
    }

    fn ssh_key_path(&self) -> Option<&str> {
        self.ssh_key.as_deref()
    }
}

/// `generic` driver section of a machine profile.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct GenericDriverConfig {
    pub ip: String,
    #[serde(default = "default_ssh_user")]
    pub ssh_user: String,
    #[serde(default = "default_ssh_port")]
    pub ssh_port: u16,
    #[serde(default)]
    pub ssh_key: Option<camino::Utf8PathBuf>,
}

fn default_ssh_user() -> String {
    "root".to_string()
}

fn default_ssh_port() -> u16 {
    22
}

/// Driver configuration.
///
/// The `type` field in YAML selects the driver.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DriverConfig {
    /// Existing host reachable over SSH
    Generic(GenericDriverConfig),
}

impl DriverConfig {
    /// Builds the driver for the machine called `machine_name`.
    pub fn as_driver(&self, machine_name: &str) -> Arc<dyn Driver> {
        match self {
            DriverConfig::Generic(cfg) => Arc::new(GenericDriver {
                machine_name: machine_name.to_string(),
                ip: cfg.ip.clone(),
                ssh_user: cfg.ssh_user.clone(),
                ssh_port: cfg.ssh_port,
                ssh_key: cfg.ssh_key.as_ref().map(|p| p.to_string()),
            }),
        }
    }
}
