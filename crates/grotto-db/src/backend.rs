//! DuckDB database backend and transaction implementation

use crate::error::{DbError, DbResult};
use crate::traits::ScriptTransaction;
use duckdb::Connection;
use grotto_core::ScriptUnit;
use std::path::Path;

/// Path string that selects an in-memory database in [`DuckDbBackend::new`].
pub const MEMORY_PATH: &str = ":memory:";

/// DuckDB database backend
///
/// Single-threaded: a run holds the connection for its whole transaction, so
/// no `Mutex` is needed.
pub struct DuckDbBackend {
    conn: Connection,
}

impl DuckDbBackend {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Open (or create) a DuckDB database file
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{e}: {}", path.display())))?;
        Ok(Self { conn })
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == MEMORY_PATH {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    /// Borrow the underlying DuckDB connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open a transaction with an explicit `BEGIN TRANSACTION`.
    ///
    /// The returned guard must be finished with
    /// [`commit`](ScriptTransaction::commit) or
    /// [`rollback`](ScriptTransaction::rollback); dropping it rolls back.
    pub fn begin(&self) -> DbResult<DuckDbTransaction<'_>> {
        DuckDbTransaction::begin(&self.conn)
    }

    /// Check if a table or view exists. Unqualified names are looked up in
    /// the `main` schema.
    pub fn relation_exists(&self, name: &str) -> DbResult<bool> {
        let (schema, table) = match name.rfind('.') {
            Some(pos) => (&name[..pos], &name[pos + 1..]),
            None => ("main", name),
        };

        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = ? AND table_name = ?",
                duckdb::params![schema, table],
                |row| row.get(0),
            )
            .map_err(|e| DbError::ConnectionError(format!("catalog lookup failed: {e}")))?;

        Ok(count > 0)
    }
}

/// An open DuckDB transaction on a borrowed connection.
///
/// Mirrors the `BEGIN` / `COMMIT` / `ROLLBACK` pattern: every exit path ends
/// the transaction, including drop.
pub struct DuckDbTransaction<'conn> {
    conn: &'conn Connection,
    open: bool,
}

impl<'conn> DuckDbTransaction<'conn> {
    fn begin(conn: &'conn Connection) -> DbResult<Self> {
        conn.execute_batch("BEGIN TRANSACTION")
            .map_err(|e| DbError::TransactionStartFailed(e.to_string()))?;
        log::debug!("Transaction started");
        Ok(Self { conn, open: true })
    }

    /// Borrow the connection the transaction runs on.
    pub fn conn(&self) -> &Connection {
        self.conn
    }
}

impl ScriptTransaction for DuckDbTransaction<'_> {
    fn execute_script(&self, script: &ScriptUnit) -> DbResult<()> {
        self.conn
            .execute_batch(&script.content)
            .map_err(|e| DbError::ScriptExecutionFailed {
                script: script.name.to_string(),
                message: e.to_string(),
            })
    }

    fn commit(mut self) -> DbResult<()> {
        self.open = false;
        if let Err(commit_err) = self.conn.execute_batch("COMMIT") {
            // DuckDB aborts the transaction on a failed COMMIT; this only
            // clears any leftover state.
            let _ = self.conn.execute_batch("ROLLBACK");
            return Err(DbError::CommitFailed(commit_err.to_string()));
        }
        log::debug!("Transaction committed");
        Ok(())
    }

    fn rollback(mut self) -> DbResult<()> {
        self.open = false;
        self.conn
            .execute_batch("ROLLBACK")
            .map_err(|e| DbError::RollbackFailed(e.to_string()))?;
        log::debug!("Transaction rolled back");
        Ok(())
    }
}

impl Drop for DuckDbTransaction<'_> {
    fn drop(&mut self) {
        if !self.open {
            return;
        }
        match self.conn.execute_batch("ROLLBACK") {
            Ok(()) => log::warn!("Transaction dropped without commit or rollback, rolled back"),
            Err(e) => log::error!("Failed to roll back dropped transaction: {e}"),
        }
    }
}

#[cfg(test)]
#[path = "backend_test.rs"]
mod tests;
