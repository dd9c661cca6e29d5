//! `substitute` command-line entry point.
use anyhow::{Context as _, Result};
use clap::Parser;

use scoped_substitute::{cli, commands, logging};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = cli::Cli::parse();
    logging::init_subscriber(args.verbose, args.log_file.as_deref())
        .context("failed to open log file")?;
    let log = logging::Logger::new();

    match args.command {
        cli::Command::Run(opts) => {
            let code = commands::run::run(&opts, &log)?;
            std::process::exit(code);
        }
        cli::Command::Probe(opts) => commands::probe::run(&opts, &log),
        cli::Command::Version => {
            commands::version::run();
            Ok(())
        }
    }
}
