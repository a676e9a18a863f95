//! Provisioning engine.
//!
//! A [`Provisioner`] turns a bare machine into a Docker host. Every OS family
//! gets one implementation; they share [`ProvisionerBase`] for state and the
//! trait's default methods for behaviour, and describe what differs between
//! families through a static [`FamilyTraits`] row. The [`Detector`] picks the
//! implementation by walking a [`Registry`] against the probed
//! [`OsRelease`].
//!
//! ```text
//! Detector ──probe──▶ OsRelease
//!    │
//!    ▼
//! Provisioner::provision
//!    hostname → options dir → packages → unit (render + update_unit)
//!    → start → wait_for_docker → auth → swarm → enable → reachability
//! ```

mod arch;
mod buildroot;
mod debian;
mod detector;
mod os_release;
mod package;
mod pipeline;
mod redhat;
mod registry;
mod service;
mod suse;
mod template;
mod ubuntu;
mod unit;

use std::net::{TcpStream, ToSocketAddrs};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::{debug, info, warn};
use url::Url;

use crate::auth::{AuthConfigurer, AuthOptions, CertCopier};
use crate::channel::CommandChannel;
use crate::driver::Driver;
use crate::engine::EngineOptions;
use crate::error::RsmachineError;
use crate::swarm::{SwarmConfigurer, SwarmContainers, SwarmOptions};
use crate::waiter::Waiter;

pub use arch::ArchProvisioner;
pub use buildroot::BuildrootProvisioner;
pub use debian::DebianProvisioner;
pub use detector::Detector;
pub use os_release::OsRelease;
pub use pipeline::run as run_pipeline;
pub use package::{PackageAction, PackageManager};
pub use redhat::{CentosProvisioner, FedoraProvisioner, RedHatProvisioner};
pub use registry::{ProvisionerConstructor, RegisteredProvisioner, Registry};
pub use service::{InitSystem, ServiceAction};
pub use suse::SuseProvisioner;
pub use template::{EngineConfigContext, Escaping, UnitTemplate};
pub use ubuntu::{UbuntuSystemdProvisioner, UbuntuUpstartProvisioner};
pub use unit::{UnitUpdate, update_unit};

/// Canonical name of the daemon service.
pub const DOCKER_SERVICE: &str = "docker";

const IP_CONTACT_TIMEOUT: Duration = Duration::from_secs(5);

static HOSTNAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?(\.[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$")
        .expect("valid regex")
});

/// True if `name` is a valid hostname (dot-separated RFC 1123 labels).
pub fn is_valid_hostname(name: &str) -> bool {
    name.len() <= 253 && HOSTNAME_RE.is_match(name)
}

/// Rendered daemon configuration and where it is installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerOptions {
    pub engine_options: String,
    pub engine_options_path: String,
}

/// How a family picks the storage driver when none is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageDriverDefault {
    Fixed(&'static str),
    /// `btrfs` when `/var/lib/docker` lives on btrfs, `overlay2` otherwise.
    ProbeBtrfs,
}

impl StorageDriverDefault {
    pub fn resolve(self, channel: &dyn CommandChannel) -> Result<String> {
        match self {
            Self::Fixed(driver) => Ok(driver.to_string()),
            Self::ProbeBtrfs => {
                let fs = channel
                    .run("stat -f -c %T /var/lib/docker")
                    .or_else(|_| channel.run("stat -f -c %T /var/lib/"))?;
                debug!("/var/lib/docker filesystem: {}", fs);
                let driver = if fs.contains("btrfs") { "btrfs" } else { "overlay2" };
                Ok(driver.to_string())
            }
        }
    }
}

/// Static description of an OS family.
#[derive(Debug)]
pub struct FamilyTraits {
    pub package_manager: PackageManager,
    pub init_system: InitSystem,
    pub unit_template: UnitTemplate,
    pub storage_driver: StorageDriverDefault,
    /// Installed before the daemon package.
    pub base_packages: &'static [&'static str],
    /// `None` when the image already ships the daemon.
    pub daemon_package: Option<&'static str>,
    pub options_dir: &'static str,
    pub unit_path: &'static str,
}

/// Collaborators a provisioner works with.
#[derive(Clone)]
pub struct ProvisionContext {
    pub driver: Arc<dyn Driver>,
    pub channel: Arc<dyn CommandChannel>,
    pub auth: Arc<dyn AuthConfigurer>,
    pub swarm: Arc<dyn SwarmConfigurer>,
    pub waiter: Waiter,
}

impl ProvisionContext {
    /// Context with the built-in configurers and the default waiter.
    pub fn new(driver: Arc<dyn Driver>, channel: Arc<dyn CommandChannel>) -> Self {
        Self {
            driver,
            channel,
            auth: Arc::new(CertCopier),
            swarm: Arc::new(SwarmContainers),
            waiter: Waiter::default(),
        }
    }

    #[must_use]
    pub fn with_auth_configurer(mut self, auth: Arc<dyn AuthConfigurer>) -> Self {
        self.auth = auth;
        self
    }

    #[must_use]
    pub fn with_swarm_configurer(mut self, swarm: Arc<dyn SwarmConfigurer>) -> Self {
        self.swarm = swarm;
        self
    }

    #[must_use]
    pub fn with_waiter(mut self, waiter: Waiter) -> Self {
        self.waiter = waiter;
        self
    }
}

/// State shared by every provisioner.
pub struct ProvisionerBase {
    pub context: ProvisionContext,
    pub os_release: Option<OsRelease>,
    pub engine_options: EngineOptions,
    pub auth_options: AuthOptions,
    pub swarm_options: SwarmOptions,
    pub packages: Vec<String>,
}

impl ProvisionerBase {
    pub fn new(context: ProvisionContext, traits: &FamilyTraits) -> Self {
        Self {
            context,
            os_release: None,
            engine_options: EngineOptions::default(),
            auth_options: AuthOptions::default(),
            swarm_options: SwarmOptions::default(),
            packages: traits.base_packages.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Implements the plumbing methods of [`Provisioner`] for a type with a
/// `base` field, backed by the given `FamilyTraits` static.
macro_rules! provisioner_plumbing {
    ($traits:expr) => {
        fn base(&self) -> &$crate::provision::ProvisionerBase {
            &self.base
        }

        fn base_mut(&mut self) -> &mut $crate::provision::ProvisionerBase {
            &mut self.base
        }

        fn traits(&self) -> &'static $crate::provision::FamilyTraits {
            &$traits
        }

        fn provision(
            &mut self,
            swarm: $crate::swarm::SwarmOptions,
            auth: $crate::auth::AuthOptions,
            engine: $crate::engine::EngineOptions,
        ) -> anyhow::Result<()> {
            $crate::provision::run_pipeline(self, swarm, auth, engine)
        }
    };
}
pub(crate) use provisioner_plumbing;

/// Per-machine provisioning capability.
///
/// Implementors supply the family-specific parts; everything else has a
/// default built on [`FamilyTraits`] and the command channel.
pub trait Provisioner: Send {
    /// Registry name of this family.
    fn name(&self) -> &'static str;

    fn base(&self) -> &ProvisionerBase;

    fn base_mut(&mut self) -> &mut ProvisionerBase;

    fn traits(&self) -> &'static FamilyTraits;

    /// Whether this family handles the cached OS release. Pure; false when
    /// nothing has been probed.
    fn compatible_with_host(&self) -> bool;

    /// Runs the full provisioning pipeline.
    ///
    /// The first failing step aborts the run and its error is returned.
    fn provision(&mut self, swarm: SwarmOptions, auth: AuthOptions, engine: EngineOptions) -> Result<()>;

    /// Runs `command` on the machine and returns its trimmed output.
    fn ssh_command(&self, command: &str) -> Result<String> {
        self.base().context.channel.run(command)
    }

    fn driver(&self) -> &dyn Driver {
        self.base().context.driver.as_ref()
    }

    fn os_release(&self) -> Option<&OsRelease> {
        self.base().os_release.as_ref()
    }

    fn set_os_release_info(&mut self, info: OsRelease) {
        self.base_mut().os_release = Some(info);
    }

    fn engine_options(&self) -> &EngineOptions {
        &self.base().engine_options
    }

    fn set_engine_options(&mut self, engine: EngineOptions) {
        self.base_mut().engine_options = engine;
    }

    fn auth_options(&self) -> &AuthOptions {
        &self.base().auth_options
    }

    fn set_auth_options(&mut self, auth: AuthOptions) {
        self.base_mut().auth_options = auth;
    }

    fn swarm_options(&self) -> &SwarmOptions {
        &self.base().swarm_options
    }

    fn set_swarm_options(&mut self, swarm: SwarmOptions) {
        self.base_mut().swarm_options = swarm;
    }

    /// Remote directory holding the daemon's TLS material.
    fn docker_options_dir(&self) -> &str {
        self.traits().options_dir
    }

    fn package(&self, name: &str, action: PackageAction) -> Result<()> {
        self.traits()
            .package_manager
            .run(self.base().context.channel.as_ref(), name, action)
    }

    fn service(&self, name: &str, action: ServiceAction) -> Result<()> {
        self.ssh_command(&self.traits().init_system.service_command(name, action))?;
        Ok(())
    }

    fn hostname(&self) -> Result<String> {
        self.ssh_command("hostname")
    }

    fn set_hostname(&self, hostname: &str) -> Result<()> {
        if !is_valid_hostname(hostname) {
            return Err(RsmachineError::Validation(format!("invalid hostname: '{}'", hostname)).into());
        }

        info!("setting hostname to {}", hostname);
        self.ssh_command(&format!(
            "sudo hostname {h} && echo {h} | sudo tee /etc/hostname > /dev/null",
            h = hostname
        ))?;
        self.ssh_command(&format!(
            r"if ! grep -xq '.*\s{h}' /etc/hosts; then if grep -xq '127.0.1.1\s.*' /etc/hosts; then sudo sed -i 's/^127.0.1.1\s.*/127.0.1.1 {h}/g' /etc/hosts; else echo '127.0.1.1 {h}' | sudo tee -a /etc/hosts > /dev/null; fi; fi",
            h = hostname
        ))?;
        Ok(())
    }

    fn default_storage_driver(&self) -> Result<String> {
        self.traits()
            .storage_driver
            .resolve(self.base().context.channel.as_ref())
    }

    /// Runs before any package is installed.
    fn before_install(&mut self) -> Result<()> {
        Ok(())
    }

    /// Runs after the daemon package is installed.
    fn after_install(&mut self) -> Result<()> {
        Ok(())
    }

    /// Renders the daemon unit for `port`.
    ///
    /// Adds the `provider=<driver>` label the first time it is called.
    fn generate_docker_options(&mut self, port: u16) -> Result<DockerOptions> {
        let label = format!("provider={}", self.driver().driver_name());
        self.base_mut().engine_options.add_label(label);

        let traits = self.traits();
        let base = self.base();
        let context = traits
            .unit_template
            .context(port, &base.auth_options, &base.engine_options);
        Ok(DockerOptions {
            engine_options: traits.unit_template.render(&context)?,
            engine_options_path: traits.unit_path.to_string(),
        })
    }

    /// Installs rendered options, restarting the daemon only on change.
    fn apply_docker_options(&self, options: &DockerOptions) -> Result<UnitUpdate> {
        update_unit(
            self.base().context.channel.as_ref(),
            self.traits().init_system,
            DOCKER_SERVICE,
            &options.engine_options,
            &options.engine_options_path,
        )
    }
}

impl std::fmt::Debug for dyn Provisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provisioner").field("name", &self.name()).finish_non_exhaustive()
    }
}

/// Points the remote certificate paths into the provisioner's options dir.
pub fn set_remote_auth_options(provisioner: &mut dyn Provisioner) {
    let dir = provisioner.docker_options_dir().trim_end_matches('/').to_string();
    let auth = &mut provisioner.base_mut().auth_options;
    auth.ca_cert_remote_path = format!("{}/ca.pem", dir);
    auth.server_cert_remote_path = format!("{}/server.pem", dir);
    auth.server_key_remote_path = format!("{}/server-key.pem", dir);
}

/// One readiness probe: does `docker version` succeed on the machine?
pub fn docker_daemon_responding(provisioner: &dyn Provisioner) -> bool {
    debug!("checking docker daemon");
    match provisioner.ssh_command("sudo docker version") {
        Ok(_) => true,
        Err(e) => {
            debug!("docker daemon not responding yet: {:#}", e);
            false
        }
    }
}

/// Polls the daemon with the context's waiter until it responds.
pub fn wait_for_docker(provisioner: &dyn Provisioner) -> Result<()> {
    info!("waiting for docker daemon");
    provisioner
        .base()
        .context
        .waiter
        .wait_for(|| docker_daemon_responding(provisioner))?;
    Ok(())
}

/// `tcp://<ip>:<port>` of the daemon endpoint.
pub fn docker_url(driver: &dyn Driver, port: u16) -> Result<Url> {
    let ip = driver.ip()?;
    let host = if ip.contains(':') { format!("[{}]", ip) } else { ip };
    Url::parse(&format!("tcp://{}:{}", host, port)).context("failed to build docker URL")
}

/// Checks that the daemon port is reachable from here; only ever warns.
pub fn attempt_ip_contact(driver: &dyn Driver, port: u16) {
    let ip = match driver.ip() {
        Ok(ip) => ip,
        Err(e) => {
            warn!("could not get IP address for machine {}: {:#}", driver.machine_name(), e);
            return;
        }
    };

    let addr = match (ip.as_str(), port).to_socket_addrs().map(|mut a| a.next()) {
        Ok(Some(addr)) => addr,
        Ok(None) | Err(_) => {
            warn!("could not resolve {}:{}", ip, port);
            return;
        }
    };

    if let Err(e) = TcpStream::connect_timeout(&addr, IP_CONTACT_TIMEOUT) {
        warn!(
            "machine {} has IP address {} but port {} is not reachable ({}); \
             SSH should still work, but connecting to the docker daemon may not. \
             This could be due to a VPN, proxy or firewall configuration.",
            driver.machine_name(),
            ip,
            port,
            e
        );
    }
}
