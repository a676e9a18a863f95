use std::io;
use std::process;
use std::sync::Arc;

use clap::CommandFactory;
use tracing::error;

use rsmachine::cli::{self, Commands};
use rsmachine::executor::{CommandExecutor, RealCommandExecutor};

fn main() {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error parsing arguments: {:#}", e);
            process::exit(1);
        }
    };

    if let Some(log_level) = args.command.log_level() {
        if let Err(e) = rsmachine::init_logging(log_level) {
            eprintln!("{:#}", e);
            process::exit(1);
        }
    }

    let executor: Arc<dyn CommandExecutor> = Arc::new(RealCommandExecutor);

    let result = match &args.command {
        Commands::Provision(opts) => rsmachine::run_provision(opts, executor),
        Commands::Detect(opts) => rsmachine::run_detect(opts, executor).map(|name| println!("{}", name)),
        Commands::Package(opts) => rsmachine::run_package(opts, executor),
        Commands::Validate(opts) => rsmachine::run_validate(opts),
        Commands::Completions(opts) => {
            let mut cmd = cli::Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(opts.shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        error!("{:#}", e);
        process::exit(1);
    }
}
