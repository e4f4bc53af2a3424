//! Migrate command implementation

use anyhow::Result;
use grotto_db::DuckDbLedger;
use grotto_engine::{EngineOptions, FatalError, RunFailure, RunOutcome, RunReport};
use std::time::Duration;

use crate::cli::{GlobalArgs, MigrateArgs};
use crate::commands::common::{load_settings, ExitCode};

/// Execute the migrate command
pub(crate) fn execute(args: &MigrateArgs, global: &GlobalArgs) -> Result<()> {
    let settings = load_settings(global)?;
    let backend = settings.open_database()?;
    let options = EngineOptions {
        deadline: args.timeout.map(Duration::from_secs).or(settings.timeout),
    };

    match grotto_engine::migrate(
        &backend,
        &DuckDbLedger::new(),
        &settings.migrations_dir,
        options,
    ) {
        Ok(RunOutcome::Committed(report)) => {
            print_success(&report);
            Ok(())
        }
        Ok(RunOutcome::RolledBack(failure)) => {
            print_failure(&failure);
            Err(ExitCode::ROLLED_BACK.into())
        }
        Err(fatal) => {
            print_fatal(&fatal);
            Err(ExitCode::FATAL.into())
        }
    }
}

fn print_success(report: &RunReport) {
    if report.applied.is_empty() {
        println!(
            "Database is up to date ({} migration{} already applied)",
            report.skipped.len(),
            plural(report.skipped.len())
        );
        return;
    }

    for name in &report.applied {
        if report.blank.contains(name) {
            println!("  applied  {name} (empty)");
        } else {
            println!("  applied  {name}");
        }
    }
    println!();
    println!(
        "Applied {} migration{}, {} already applied ({:.2}s)",
        report.applied.len(),
        plural(report.applied.len()),
        report.skipped.len(),
        report.elapsed.as_secs_f64()
    );
}

fn print_failure(failure: &RunFailure) {
    match &failure.script {
        Some(script) => eprintln!("Migration {script} failed: {}", failure.cause),
        None => eprintln!("Migration run failed: {}", failure.cause),
    }
    eprintln!("All changes were rolled back; the database was left unchanged.");
}

fn print_fatal(fatal: &FatalError) {
    eprintln!("Fatal: {fatal}");
    if let FatalError::RollbackFailed {
        script: Some(script),
        ..
    } = fatal
    {
        eprintln!("The run stopped at {script}. Inspect the database before retrying.");
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}
