//! The migration run loop.
//!
//! [`MigrationEngine::run`] owns the run's transaction from start to finish:
//!
//! 1. ensure the ledger table exists
//! 2. read the ordered scripts from the source
//! 3. for each script, skip it if the ledger has it, otherwise execute it
//!    and record it
//! 4. commit if every step succeeded, roll back otherwise
//!
//! The first failing step stops the run. Nothing is retried.

use crate::error::{EngineError, EngineResult, FatalError};
use crate::report::{RunFailure, RunOutcome, RunReport};
use crate::status::{ScriptState, ScriptStatus, StatusReport};
use grotto_core::{ScriptName, ScriptProvider, ScriptUnit};
use grotto_db::{MigrationLedger, ScriptTransaction};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Tunables for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineOptions {
    /// Cooperative deadline for the whole run, checked between steps.
    /// A statement already running is never interrupted.
    pub deadline: Option<Duration>,
}

/// A step failure, tagged with the script being processed at the time.
struct StepFailure {
    script: Option<ScriptName>,
    cause: EngineError,
}

impl StepFailure {
    fn setup(cause: impl Into<EngineError>) -> Self {
        Self {
            script: None,
            cause: cause.into(),
        }
    }

    fn at(script: &ScriptName, cause: impl Into<EngineError>) -> Self {
        Self {
            script: Some(script.clone()),
            cause: cause.into(),
        }
    }
}

/// Applies scripts from a [`ScriptProvider`] and records them through a
/// [`MigrationLedger`].
#[derive(Debug, Clone)]
pub struct MigrationEngine<S, L> {
    source: S,
    ledger: L,
    options: EngineOptions,
}

impl<S: ScriptProvider, L> MigrationEngine<S, L> {
    /// Create an engine with default options.
    pub fn new(source: S, ledger: L) -> Self {
        Self {
            source,
            ledger,
            options: EngineOptions::default(),
        }
    }

    /// Replace the engine's options.
    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// The engine's options.
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Run every pending script inside `tx`, then commit or roll back.
    ///
    /// Returns [`RunOutcome::RolledBack`] for any failure that was followed by
    /// a successful rollback, including a failed commit. Only a failed
    /// rollback is returned as an error.
    pub fn run<T>(&self, tx: T) -> Result<RunOutcome, FatalError>
    where
        T: ScriptTransaction,
        L: MigrationLedger<T>,
    {
        let started = Instant::now();
        let mut report = RunReport::default();

        let result = self.apply_pending(&tx, started, &mut report);
        report.elapsed = started.elapsed();

        match result {
            Ok(()) => match tx.commit() {
                Ok(()) => {
                    log::info!(
                        "Migration committed: {} applied, {} already applied",
                        report.applied.len(),
                        report.skipped.len()
                    );
                    Ok(RunOutcome::Committed(report))
                }
                Err(e) => {
                    log::error!("Commit failed, no changes were persisted: {e}");
                    Ok(RunOutcome::RolledBack(RunFailure {
                        script: None,
                        cause: e.into(),
                        report,
                    }))
                }
            },
            Err(StepFailure { script, cause }) => {
                match &script {
                    Some(name) => log::error!("Migration failed at {name}: {cause}"),
                    None => log::error!("Migration failed: {cause}"),
                }

                if let Err(rollback) = tx.rollback() {
                    log::error!("Rollback failed, database state is unknown: {rollback}");
                    return Err(FatalError::RollbackFailed {
                        script,
                        cause: Box::new(cause),
                        rollback,
                    });
                }

                log::error!("Transaction rolled back, database left unchanged");
                Ok(RunOutcome::RolledBack(RunFailure {
                    script,
                    cause,
                    report,
                }))
            }
        }
    }

    fn apply_pending<T>(
        &self,
        tx: &T,
        started: Instant,
        report: &mut RunReport,
    ) -> Result<(), StepFailure>
    where
        T: ScriptTransaction,
        L: MigrationLedger<T>,
    {
        self.check_deadline(started).map_err(StepFailure::setup)?;
        self.ledger
            .ensure_table_exists(tx)
            .map_err(StepFailure::setup)?;

        self.check_deadline(started).map_err(StepFailure::setup)?;
        let scripts = self.source.scripts().map_err(StepFailure::setup)?;
        log::info!("Found {} migration script(s)", scripts.len());

        for script in &scripts {
            self.check_deadline(started)
                .map_err(|e| StepFailure::at(&script.name, e))?;
            self.apply_one(tx, script, report)
                .map_err(|e| StepFailure::at(&script.name, e))?;
        }
        Ok(())
    }

    fn apply_one<T>(&self, tx: &T, script: &ScriptUnit, report: &mut RunReport) -> EngineResult<()>
    where
        T: ScriptTransaction,
        L: MigrationLedger<T>,
    {
        if self.ledger.has_applied(tx, &script.name)? {
            log::info!("Script already applied, skipping: {}", script.name);
            report.skipped.push(script.name.clone());
            return Ok(());
        }

        if script.is_blank() {
            log::warn!(
                "Script {} is empty, recording it without executing",
                script.name
            );
            report.blank.push(script.name.clone());
        } else {
            log::info!("Applying script: {}", script.name);
            tx.execute_script(script)?;
        }

        self.ledger.record_applied(tx, &script.name)?;
        report.applied.push(script.name.clone());
        Ok(())
    }

    fn check_deadline(&self, started: Instant) -> EngineResult<()> {
        match self.options.deadline {
            Some(limit) if started.elapsed() >= limit => {
                Err(EngineError::DeadlineExceeded { limit })
            }
            _ => Ok(()),
        }
    }

    /// Compare the source's scripts against the ledger without applying
    /// anything.
    ///
    /// The ledger table is ensured inside `tx` so a fresh database reports
    /// everything as pending. Callers should roll `tx` back afterwards.
    pub fn plan<T>(&self, tx: &T) -> EngineResult<StatusReport>
    where
        L: MigrationLedger<T>,
    {
        self.ledger.ensure_table_exists(tx)?;
        let scripts = self.source.scripts()?;
        let entries = self.ledger.applied_entries(tx)?;

        let mut by_name: HashMap<&str, usize> = HashMap::with_capacity(entries.len());
        for (idx, entry) in entries.iter().enumerate() {
            by_name.insert(entry.script_name.as_str(), idx);
        }

        let statuses = scripts
            .iter()
            .map(|script| {
                let state = match by_name.remove(script.name.as_str()) {
                    Some(idx) => ScriptState::Applied {
                        applied_at: entries[idx].applied_at,
                    },
                    None => ScriptState::Pending,
                };
                ScriptStatus {
                    name: script.name.clone(),
                    state,
                }
            })
            .collect();

        let mut orphaned_idx: Vec<usize> = by_name.into_values().collect();
        orphaned_idx.sort_unstable();
        let orphaned = orphaned_idx
            .into_iter()
            .map(|idx| entries[idx].clone())
            .collect();

        Ok(StatusReport {
            scripts: statuses,
            orphaned,
        })
    }
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod tests;
