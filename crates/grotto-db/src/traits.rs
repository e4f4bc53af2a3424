//! Capability traits the migration engine is written against.
//!
//! The engine never talks to a connection directly. It receives one open
//! transaction implementing [`ScriptTransaction`] and a ledger implementing
//! [`MigrationLedger`] for that transaction type, so test doubles can stand
//! in for either.

use crate::error::DbResult;
use crate::ledger::LedgerEntry;
use grotto_core::{ScriptName, ScriptUnit};

/// One open database transaction, exclusively owned by a run.
///
/// `commit` and `rollback` consume the transaction; there is no way to keep
/// using it after the outcome is decided.
pub trait ScriptTransaction: Sized {
    /// Execute a script body verbatim as a statement batch.
    fn execute_script(&self, script: &ScriptUnit) -> DbResult<()>;

    /// Make every change in the transaction durable.
    fn commit(self) -> DbResult<()>;

    /// Discard every change in the transaction.
    fn rollback(self) -> DbResult<()>;
}

/// Durable record of applied scripts, accessed through the caller's
/// transaction `T`.
pub trait MigrationLedger<T> {
    /// Create the ledger table if it does not exist yet. Idempotent.
    fn ensure_table_exists(&self, tx: &T) -> DbResult<()>;

    /// True if `name` has a ledger row.
    fn has_applied(&self, tx: &T, name: &ScriptName) -> DbResult<bool>;

    /// Insert a ledger row for `name`.
    fn record_applied(&self, tx: &T, name: &ScriptName) -> DbResult<()>;

    /// All ledger rows, oldest first.
    fn applied_entries(&self, tx: &T) -> DbResult<Vec<LedgerEntry>>;
}

impl<T, L: MigrationLedger<T> + ?Sized> MigrationLedger<T> for &L {
    fn ensure_table_exists(&self, tx: &T) -> DbResult<()> {
        (**self).ensure_table_exists(tx)
    }

    fn has_applied(&self, tx: &T, name: &ScriptName) -> DbResult<bool> {
        (**self).has_applied(tx, name)
    }

    fn record_applied(&self, tx: &T, name: &ScriptName) -> DbResult<()> {
        (**self).record_applied(tx, name)
    }

    fn applied_entries(&self, tx: &T) -> DbResult<Vec<LedgerEntry>> {
        (**self).applied_entries(tx)
    }
}
