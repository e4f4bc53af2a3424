//! Status command implementation

use anyhow::{Context, Result};
use grotto_db::DuckDbLedger;
use grotto_engine::{ScriptState, StatusReport};

use crate::cli::{GlobalArgs, OutputFormat, StatusArgs};
use crate::commands::common::load_settings;

/// Execute the status command
pub(crate) fn execute(args: &StatusArgs, global: &GlobalArgs) -> Result<()> {
    let settings = load_settings(global)?;
    let backend = settings.open_database()?;

    let report = grotto_engine::status(&backend, &DuckDbLedger::new(), &settings.migrations_dir)
        .context("Failed to read migration status")?;

    match args.output {
        OutputFormat::Table => print_table(&report),
        OutputFormat::Json => print_json(&report)?,
    }
    Ok(())
}

/// Print status in table format
fn print_table(report: &StatusReport) {
    if report.scripts.is_empty() && report.orphaned.is_empty() {
        println!("No migrations found.");
        return;
    }

    let name_width = report
        .scripts
        .iter()
        .map(|s| s.name.len())
        .max()
        .unwrap_or(4)
        .max(4);

    println!(
        "{:<name_width$}  {:<8}  {:<19}",
        "NAME",
        "STATE",
        "APPLIED_AT",
        name_width = name_width,
    );
    println!(
        "{:-<name_width$}  {:-<8}  {:-<19}",
        "",
        "",
        "",
        name_width = name_width,
    );

    for script in &report.scripts {
        let (state, applied_at) = match &script.state {
            ScriptState::Applied { applied_at } => {
                ("applied", applied_at.format("%Y-%m-%d %H:%M:%S").to_string())
            }
            ScriptState::Pending => ("pending", "-".to_string()),
        };
        println!(
            "{:<name_width$}  {:<8}  {}",
            script.name.as_str(),
            state,
            applied_at,
            name_width = name_width,
        );
    }

    println!();
    println!(
        "{} applied, {} pending",
        report.applied_count(),
        report.pending_count()
    );

    if !report.orphaned.is_empty() {
        println!();
        println!("Applied but no longer on disk:");
        for entry in &report.orphaned {
            println!(
                "  {}  {}",
                entry.script_name,
                entry.applied_at.format("%Y-%m-%d %H:%M:%S")
            );
        }
    }
}

/// Print status in JSON format
fn print_json(report: &StatusReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize to JSON")?;
    println!("{}", json);
    Ok(())
}
