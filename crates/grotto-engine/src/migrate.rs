//! Entry points for running against a DuckDB database.

use crate::engine::{EngineOptions, MigrationEngine};
use crate::error::{EngineResult, FatalError};
use crate::report::RunOutcome;
use crate::status::StatusReport;
use grotto_core::DirectorySource;
use grotto_db::{DuckDbBackend, DuckDbLedger, ScriptTransaction};
use std::path::Path;

/// Apply every pending script in `dir` to `backend` in one transaction.
///
/// A transaction that cannot be opened is fatal and no run takes place.
pub fn migrate(
    backend: &DuckDbBackend,
    ledger: &DuckDbLedger,
    dir: &Path,
    options: EngineOptions,
) -> Result<RunOutcome, FatalError> {
    log::info!("Running migrations from {}", dir.display());
    let engine = MigrationEngine::new(DirectorySource::new(dir), ledger).with_options(options);
    let tx = backend
        .begin()
        .map_err(FatalError::TransactionStartFailed)?;
    engine.run(tx)
}

/// Report which scripts in `dir` are applied or pending.
///
/// Runs inside a transaction that is always rolled back, so inspecting a
/// fresh database does not leave a ledger table behind.
pub fn status(
    backend: &DuckDbBackend,
    ledger: &DuckDbLedger,
    dir: &Path,
) -> EngineResult<StatusReport> {
    let engine = MigrationEngine::new(DirectorySource::new(dir), ledger);
    let tx = backend.begin()?;
    let result = engine.plan(&tx);
    tx.rollback()?;
    result
}
