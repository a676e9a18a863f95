pub mod auth;
pub mod channel;
pub mod cli;
pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod executor;
pub mod provision;
pub mod swarm;
pub mod waiter;

pub use error::RsmachineError;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{FmtSubscriber, filter::LevelFilter};

use crate::channel::SshChannel;
use crate::executor::CommandExecutor;
use crate::provision::{Detector, ProvisionContext, Provisioner, Registry};

pub fn init_logging(log_level: cli::LogLevel) -> Result<()> {
    let filter = match log_level {
        cli::LogLevel::Trace => LevelFilter::TRACE,
        cli::LogLevel::Debug => LevelFilter::DEBUG,
        cli::LogLevel::Info => LevelFilter::INFO,
        cli::LogLevel::Warn => LevelFilter::WARN,
        cli::LogLevel::Error => LevelFilter::ERROR,
    };

    tracing::subscriber::set_global_default(
        FmtSubscriber::builder().with_max_level(filter).finish(),
    )
    .context("failed to set global default tracing subscriber")
}

/// Loads and validates the profile named by `common`.
fn load_validated_profile(common: &cli::CommonArgs) -> Result<config::Profile> {
    let profile = config::load_profile(&common.file)
        .with_context(|| format!("failed to load profile from {}", common.file))?;
    profile.validate().context("profile validation failed")?;
    Ok(profile)
}

/// Wires driver, SSH channel and waiter for the machine in `profile`.
fn build_context(
    profile: &config::Profile,
    executor: Arc<dyn CommandExecutor>,
    timeout: Option<Duration>,
) -> Result<ProvisionContext> {
    let driver = profile.driver.as_driver(&profile.name);
    let channel = SshChannel::from_driver(executor, driver.as_ref())
        .with_context(|| format!("failed to open command channel to {}", profile.name))?;

    let mut waiter = profile.waiter.as_waiter();
    if let Some(timeout) = timeout {
        waiter = waiter.with_deadline(Instant::now() + timeout);
    }

    Ok(ProvisionContext::new(driver, Arc::new(channel)).with_waiter(waiter))
}

fn detect(context: &ProvisionContext) -> Result<Box<dyn Provisioner>> {
    let registry = Registry::builtin();
    Detector::new(&registry).detect(context)
}

pub fn run_provision(opts: &cli::ProvisionArgs, executor: Arc<dyn CommandExecutor>) -> Result<()> {
    let profile = load_validated_profile(&opts.common)?;
    let context = build_context(&profile, executor, opts.timeout.map(Duration::from_secs))?;

    let mut provisioner = detect(&context)?;
    info!("provisioning {} with {}", profile.name, provisioner.name());
    provisioner
        .provision(profile.swarm, profile.auth, profile.engine)
        .with_context(|| format!("failed to provision {}", profile.name))?;

    info!("machine {} provisioned successfully", profile.name);
    Ok(())
}

/// Returns the name of the provisioner selected for the machine.
pub fn run_detect(opts: &cli::DetectArgs, executor: Arc<dyn CommandExecutor>) -> Result<String> {
    let profile = load_validated_profile(&opts.common)?;
    let context = build_context(&profile, executor, None)?;
    let provisioner = detect(&context)?;
    Ok(provisioner.name().to_string())
}

pub fn run_package(opts: &cli::PackageArgs, executor: Arc<dyn CommandExecutor>) -> Result<()> {
    let profile = load_validated_profile(&opts.common)?;
    let context = build_context(&profile, executor, None)?;
    let provisioner = detect(&context)?;
    provisioner
        .package(&opts.name, opts.action)
        .with_context(|| format!("failed to {} package {}", opts.action, opts.name))
}

pub fn run_validate(opts: &cli::ValidateArgs) -> Result<()> {
    let profile = load_validated_profile(&opts.common)?;
    info!("validation successful:\n{:#?}", profile);
    Ok(())
}
