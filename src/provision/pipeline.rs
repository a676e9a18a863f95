//! The provisioning pipeline shared by every OS family.

use anyhow::Result;
use tracing::info;

use super::{
    DOCKER_SERVICE, PackageAction, Provisioner, ServiceAction, attempt_ip_contact, docker_url,
    set_remote_auth_options, wait_for_docker,
};
use crate::auth::AuthOptions;
use crate::channel::shell_quote;
use crate::engine::{DEFAULT_PORT, EngineOptions};
use crate::swarm::SwarmOptions;

/// Brings the machine behind `p` to a running, secured daemon.
///
/// Steps run strictly in order; the first error is returned unchanged.
/// When TLS material is configured the daemon options are rendered once,
/// by the auth configurer after the material is on the machine.
pub fn run(
    p: &mut dyn Provisioner,
    mut swarm: SwarmOptions,
    auth: AuthOptions,
    engine: EngineOptions,
) -> Result<()> {
    swarm.env = engine.env.clone();
    p.set_swarm_options(swarm);
    p.set_auth_options(auth);
    p.set_engine_options(engine);

    if p.engine_options().storage_driver.is_empty() {
        let driver = p.default_storage_driver()?;
        info!("using default storage driver: {}", driver);
        p.base_mut().engine_options.storage_driver = driver;
    }

    let machine_name = p.driver().machine_name().to_string();
    p.set_hostname(&machine_name)?;

    let options_dir = p.docker_options_dir().to_string();
    p.ssh_command(&format!("sudo mkdir -p {}", shell_quote(&options_dir)))?;

    p.before_install()?;

    info!("installing base packages");
    for package in p.base().packages.clone() {
        p.package(&package, PackageAction::Install)?;
    }

    if let Some(daemon) = p.traits().daemon_package {
        info!("installing docker");
        p.package(daemon, PackageAction::Install)?;
    }

    p.after_install()?;

    if p.auth_options().local_material().is_some() {
        info!("daemon options are installed together with the TLS material");
    } else {
        let options = p.generate_docker_options(DEFAULT_PORT)?;
        p.apply_docker_options(&options)?;
    }

    info!("starting docker service");
    p.service(DOCKER_SERVICE, ServiceAction::Start)?;

    wait_for_docker(&*p)?;

    set_remote_auth_options(p);
    info!("configuring auth");
    let auth_configurer = p.base().context.auth.clone();
    auth_configurer.configure_auth(p)?;

    let engine_env = p.engine_options().env.clone();
    p.base_mut().swarm_options.env = engine_env;
    info!("configuring swarm");
    let swarm_configurer = p.base().context.swarm.clone();
    let swarm = p.swarm_options().clone();
    let auth = p.auth_options().clone();
    swarm_configurer.configure_swarm(&*p, &swarm, &auth)?;

    info!("enabling docker service");
    p.service(DOCKER_SERVICE, ServiceAction::Enable)?;

    if !p.auth_options().serves_tls() {
        info!("docker is up and running on its local socket");
        return Ok(());
    }
    attempt_ip_contact(p.driver(), DEFAULT_PORT);
    if let Ok(url) = docker_url(p.driver(), DEFAULT_PORT) {
        info!("docker is up and running at {}", url);
    }

    Ok(())
}
