//! Cluster membership.
//!
//! [`SwarmConfigurer`] is called at the end of the provisioning pipeline with
//! the finalized auth options. [`SwarmContainers`] launches the classic swarm
//! agents as containers on the freshly provisioned daemon; it does not speak
//! the cluster protocol itself. Agents reach each other through the
//! daemon's TLS endpoint, so swarm needs installed TLS material.

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;
use url::Url;

use crate::auth::AuthOptions;
use crate::channel::shell_quote;
use crate::engine::DEFAULT_PORT;
use crate::error::RsmachineError;
use crate::provision::Provisioner;

const DEFAULT_SWARM_PORT: u16 = 3376;

/// Cluster-join configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct SwarmOptions {
    #[serde(rename = "enabled")]
    pub is_swarm: bool,
    pub master: bool,
    pub discovery: String,
    pub host: String,
    pub image: String,
    pub strategy: String,
    pub arbitrary_flags: Vec<String>,
    /// Mirrors the engine environment; overwritten by the pipeline.
    #[serde(skip)]
    pub env: Vec<String>,
}

impl Default for SwarmOptions {
    fn default() -> Self {
        Self {
            is_swarm: false,
            master: false,
            discovery: String::new(),
            host: format!("tcp://0.0.0.0:{}", DEFAULT_SWARM_PORT),
            image: "swarm:latest".to_string(),
            strategy: "spread".to_string(),
            arbitrary_flags: Vec::new(),
            env: Vec::new(),
        }
    }
}

impl SwarmOptions {
    /// Port the swarm manager listens on, taken from `host`.
    pub fn manager_port(&self) -> Result<u16> {
        let url = Url::parse(&self.host)
            .with_context(|| format!("invalid swarm host: {}", self.host))?;
        Ok(url.port().unwrap_or(DEFAULT_SWARM_PORT))
    }
}

/// Configures cluster membership of a provisioned machine.
pub trait SwarmConfigurer: Send + Sync {
    fn configure_swarm(
        &self,
        provisioner: &dyn Provisioner,
        swarm: &SwarmOptions,
        auth: &AuthOptions,
    ) -> Result<()>;
}

/// Runs the swarm manager and agent as containers.
#[derive(Debug, Default, Clone, Copy)]
pub struct SwarmContainers;

impl SwarmContainers {
    fn env_args(swarm: &SwarmOptions) -> String {
        swarm
            .env
            .iter()
            .map(|entry| format!(" -e {}", shell_quote(entry)))
            .collect()
    }

    fn replace_container(provisioner: &dyn Provisioner, name: &str, run: String) -> Result<()> {
        provisioner.ssh_command(&format!(
            "sudo docker rm -f {} >/dev/null 2>&1 || true",
            name
        ))?;
        provisioner
            .ssh_command(&run)
            .with_context(|| format!("failed to start {}", name))?;
        Ok(())
    }

    fn manager_command(swarm: &SwarmOptions, auth: &AuthOptions, ip: &str, port: u16) -> String {
        let dir = std::path::Path::new(&auth.ca_cert_remote_path)
            .parent()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "/etc/docker".to_string());
        let mut cmd = format!(
            "sudo docker run -d --restart=always --name swarm-agent-master -p {port}:{port} -v {dir}:{dir}:ro",
            port = port,
            dir = shell_quote(&dir)
        );
        cmd.push_str(&Self::env_args(swarm));
        cmd.push_str(&format!(
            " {} manage --tlsverify --tlscacert={} --tlscert={} --tlskey={}",
            shell_quote(&swarm.image),
            shell_quote(&auth.ca_cert_remote_path),
            shell_quote(&auth.server_cert_remote_path),
            shell_quote(&auth.server_key_remote_path)
        ));
        cmd.push_str(&format!(
            " -H tcp://0.0.0.0:{} --strategy {} --advertise {}:{}",
            port,
            shell_quote(&swarm.strategy),
            ip,
            port
        ));
        for flag in &swarm.arbitrary_flags {
            cmd.push_str(&format!(" --{}", shell_quote(flag)));
        }
        cmd.push_str(&format!(" {}", shell_quote(&swarm.discovery)));
        cmd
    }

    fn agent_command(swarm: &SwarmOptions, ip: &str) -> String {
        format!(
            "sudo docker run -d --restart=always --name swarm-agent{} {} join --advertise {}:{} {}",
            Self::env_args(swarm),
            shell_quote(&swarm.image),
            ip,
            DEFAULT_PORT,
            shell_quote(&swarm.discovery)
        )
    }
}

impl SwarmConfigurer for SwarmContainers {
    fn configure_swarm(
        &self,
        provisioner: &dyn Provisioner,
        swarm: &SwarmOptions,
        auth: &AuthOptions,
    ) -> Result<()> {
        if !swarm.is_swarm {
            return Ok(());
        }
        if !auth.serves_tls() {
            return Err(RsmachineError::Validation(format!(
                "swarm on {} needs TLS material: agents join through the daemon's TCP port",
                provisioner.driver().machine_name()
            ))
            .into());
        }

        let ip = provisioner.driver().ip()?;
        info!("configuring swarm");

        if swarm.master {
            let port = swarm.manager_port()?;
            Self::replace_container(
                provisioner,
                "swarm-agent-master",
                Self::manager_command(swarm, auth, &ip, port),
            )?;
        }
        Self::replace_container(provisioner, "swarm-agent", Self::agent_command(swarm, &ip))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled() -> SwarmOptions {
        SwarmOptions {
            is_swarm: true,
            discovery: "token://abc".to_string(),
            env: vec!["HTTP_PROXY=http://proxy:3128".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_default_manager_port() {
        assert_eq!(SwarmOptions::default().manager_port().unwrap(), 3376);
    }

    #[test]
    fn test_manager_port_from_host() {
        let swarm = SwarmOptions {
            host: "tcp://0.0.0.0:4000".to_string(),
            ..Default::default()
        };
        assert_eq!(swarm.manager_port().unwrap(), 4000);
    }

    #[test]
    fn test_invalid_host_is_error() {
        let swarm = SwarmOptions {
            host: "not a url".to_string(),
            ..Default::default()
        };
        assert!(swarm.manager_port().is_err());
    }

    #[test]
    fn test_agent_command_passes_env_and_advertise() {
        let cmd = SwarmContainers::agent_command(&enabled(), "10.0.0.5");
        assert_eq!(
            cmd,
            "sudo docker run -d --restart=always --name swarm-agent \
             -e HTTP_PROXY=http://proxy:3128 swarm:latest join --advertise 10.0.0.5:2376 token://abc"
        );
    }

    #[test]
    fn test_manager_command_with_tls() {
        let auth = AuthOptions {
            ca_cert_remote_path: "/etc/docker/ca.pem".to_string(),
            server_cert_remote_path: "/etc/docker/server.pem".to_string(),
            server_key_remote_path: "/etc/docker/server-key.pem".to_string(),
            ..Default::default()
        };
        let cmd = SwarmContainers::manager_command(&enabled(), &auth, "10.0.0.5", 3376);
        assert!(cmd.contains("-v /etc/docker:/etc/docker:ro"), "got: {}", cmd);
        assert!(cmd.contains("--tlscacert=/etc/docker/ca.pem"), "got: {}", cmd);
        assert!(cmd.contains("manage --tlsverify"), "got: {}", cmd);
        assert!(cmd.contains("-H tcp://0.0.0.0:3376 --strategy spread --advertise 10.0.0.5:3376"));
        assert!(cmd.ends_with(" token://abc"), "got: {}", cmd);
    }
}
