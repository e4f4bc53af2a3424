//! Error types for grotto-engine

use grotto_core::{CoreError, ScriptName};
use grotto_db::DbError;
use std::time::Duration;
use thiserror::Error;

/// Why a run stopped. Every `EngineError` ends in an orderly rollback.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Script discovery failed
    #[error(transparent)]
    Source(#[from] CoreError),

    /// Ledger, script, or transaction operation failed
    #[error(transparent)]
    Db(#[from] DbError),

    /// The run's cooperative deadline passed (R001)
    #[error("[R001] Migration run exceeded its deadline of {limit:?}")]
    DeadlineExceeded { limit: Duration },
}

/// Result type alias for EngineError
pub type EngineResult<T> = Result<T, EngineError>;

/// Conditions that leave the database in an unknown state.
///
/// Unlike [`EngineError`], these are not followed by a successful rollback
/// and should terminate the process.
#[derive(Error, Debug)]
pub enum FatalError {
    /// No transaction could be opened, so no run took place (R002)
    #[error("[R002] Could not start migration transaction: {0}")]
    TransactionStartFailed(#[source] DbError),

    /// The run failed and the rollback failed too (R003)
    #[error("[R003] Rollback failed after error ({cause}); database state is unknown: {rollback}")]
    RollbackFailed {
        script: Option<ScriptName>,
        cause: Box<EngineError>,
        #[source]
        rollback: DbError,
    },
}
