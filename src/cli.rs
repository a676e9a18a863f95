use anyhow::Result;
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use crate::provision::PackageAction;

#[derive(Parser, Debug)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = env!("CARGO_PKG_DESCRIPTION"),
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Detect the remote OS and provision the Docker daemon
    Provision(ProvisionArgs),

    /// Print the provisioner selected for the remote OS
    Detect(DetectArgs),

    /// Run one package operation on the machine
    Package(PackageArgs),

    /// Validate the given YAML profile
    Validate(ValidateArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Options shared by every command that reads a profile.
#[derive(Args, Debug)]
pub struct CommonArgs {
    /// Path to the YAML file defining the machine
    #[arg(short, long, default_value = "machine.yml")]
    pub file: Utf8PathBuf,

    /// Set the log level
    #[arg(short, long, default_value = "info")]
    pub log_level: LogLevel,
}

#[derive(Args, Debug)]
pub struct ProvisionArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Give up waiting for the daemon after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

#[derive(Args, Debug)]
pub struct DetectArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Args, Debug)]
pub struct PackageArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Operation to perform
    pub action: PackageAction,

    /// Package name
    pub name: String,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: Shell,
}

impl Commands {
    /// Log level requested on the command line, if the command takes one.
    pub fn log_level(&self) -> Option<LogLevel> {
        match self {
            Commands::Provision(opts) => Some(opts.common.log_level),
            Commands::Detect(opts) => Some(opts.common.log_level),
            Commands::Package(opts) => Some(opts.common.log_level),
            Commands::Validate(opts) => Some(opts.common.log_level),
            Commands::Completions(_) => None,
        }
    }
}

/// Represents log levels for controlling the verbosity of logging output.
///
/// This enum maps directly to the log levels used by the `tracing` crate:
/// - `Trace`: Designates very detailed application-level information, including remote command output.
/// - `Debug`: Designates information useful for debugging, such as each remote command.
/// - `Info`: Designates general operational messages (pipeline steps).
/// - `Warn`: Designates potentially harmful situations.
/// - `Error`: Designates error events that might still allow the application to continue running.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

pub fn parse_args() -> Result<Cli> {
    Ok(Cli::parse())
}
