//! Error types for grotto-db

use thiserror::Error;

/// Database operation errors
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection error (D001)
    #[error("[D001] Database connection failed: {0}")]
    ConnectionError(String),

    /// Could not open the run's transaction (D002)
    #[error("[D002] Failed to start transaction: {0}")]
    TransactionStartFailed(String),

    /// Ledger table could not be created (D003)
    #[error("[D003] Failed to create migration ledger table: {0}")]
    TableCreationFailed(String),

    /// Ledger lookup failed (D004)
    #[error("[D004] Migration ledger query failed for '{script}': {message}")]
    LedgerQueryFailed { script: String, message: String },

    /// Ledger insert failed (D005)
    #[error("[D005] Failed to record '{script}' in migration ledger: {message}")]
    LedgerWriteFailed { script: String, message: String },

    /// A migration script's SQL failed (D006)
    #[error("[D006] Script '{script}' failed: {message}")]
    ScriptExecutionFailed { script: String, message: String },

    /// COMMIT failed; the transaction did not persist (D007)
    #[error("[D007] Failed to commit transaction: {0}")]
    CommitFailed(String),

    /// ROLLBACK failed; transaction state is unknown (D008)
    #[error("[D008] Failed to roll back transaction: {0}")]
    RollbackFailed(String),
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;
