//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Grotto - apply ordered SQL migrations exactly once, all or nothing
///
/// Runs are not coordinated with each other: run one `grotto migrate` at a
/// time per database.
#[derive(Parser, Debug)]
#[command(name = "grotto")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to grotto.yml (default: look in the current directory)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Override the database path (`:memory:` for an in-memory database)
    #[arg(short, long, global = true, env = "GROTTO_DATABASE")]
    pub database: Option<String>,

    /// Override the migrations directory
    #[arg(short, long, global = true)]
    pub migrations_dir: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply every pending migration in one transaction
    Migrate(MigrateArgs),

    /// Show which migrations are applied and which are pending
    Status(StatusArgs),
}

/// Arguments for the migrate command
#[derive(Args, Debug, Default)]
pub struct MigrateArgs {
    /// Abort and roll back if the run takes longer than this many seconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,
}

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: OutputFormat,
}

/// Output formats for reporting commands
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON output
    Json,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
