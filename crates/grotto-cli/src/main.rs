//! Grotto CLI - apply ordered SQL migrations exactly once, all or nothing

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;
mod logging;

use cli::Cli;
use commands::common::ExitCode;
use commands::{migrate, status};

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    logging::init(cli.global.verbose);

    match dispatch(&cli) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => match err.downcast_ref::<ExitCode>() {
            Some(code) => std::process::ExitCode::from(code.0),
            None => {
                eprintln!("Error: {err:#}");
                std::process::ExitCode::from(ExitCode::FAILURE.0)
            }
        },
    }
}

fn dispatch(cli: &Cli) -> Result<()> {
    match &cli.command {
        cli::Commands::Migrate(args) => migrate::execute(args, &cli.global),
        cli::Commands::Status(args) => status::execute(args, &cli.global),
    }
}
