//! Applied-migration ledger.
//!
//! The ledger is a table inside the target database with one row per script
//! that executed successfully in a committed run. Rows are only ever
//! inserted, inside the same transaction as the script bodies, so a
//! rolled-back run leaves no trace in it.

use crate::backend::DuckDbTransaction;
use crate::error::{DbError, DbResult};
use crate::traits::MigrationLedger;
use chrono::{DateTime, Utc};
use grotto_core::ScriptName;
use serde::Serialize;

/// Name of the ledger table.
pub const LEDGER_TABLE: &str = "grotto_migration";

/// Sequence backing the ledger's surrogate key.
const LEDGER_SEQUENCE: &str = "grotto_migration_id_seq";

/// One ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    /// Monotonically increasing surrogate key.
    pub id: i64,
    /// Name of the applied script.
    pub script_name: String,
    /// Insertion time, set by the database.
    pub applied_at: DateTime<Utc>,
}

/// DuckDB-backed ledger.
#[derive(Debug, Clone, Default)]
pub struct DuckDbLedger {
    schema: Option<String>,
}

impl DuckDbLedger {
    /// Ledger in the connection's default schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger in a specific schema. The schema must already exist.
    pub fn in_schema(schema: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
        }
    }

    /// Fully-qualified, quoted name of `object` in the ledger's schema.
    fn qualified(&self, object: &str) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", quote_ident(schema), quote_ident(object)),
            None => quote_ident(object),
        }
    }

    fn table(&self) -> String {
        self.qualified(LEDGER_TABLE)
    }

    fn create_sql(&self) -> String {
        let sequence = self.qualified(LEDGER_SEQUENCE);
        // nextval() takes the sequence name as a string literal
        let sequence_literal = match &self.schema {
            Some(schema) => format!("{schema}.{LEDGER_SEQUENCE}"),
            None => LEDGER_SEQUENCE.to_string(),
        }
        .replace('\'', "''");
        format!(
            "CREATE SEQUENCE IF NOT EXISTS {sequence} START 1;
             CREATE TABLE IF NOT EXISTS {table} (
                 id          BIGINT PRIMARY KEY DEFAULT nextval('{sequence_literal}'),
                 script_name VARCHAR NOT NULL UNIQUE,
                 applied_at  TIMESTAMP NOT NULL DEFAULT current_timestamp
             );",
            table = self.table(),
        )
    }
}

/// Double-quote an identifier, escaping embedded quotes.
fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

impl MigrationLedger<DuckDbTransaction<'_>> for DuckDbLedger {
    fn ensure_table_exists(&self, tx: &DuckDbTransaction<'_>) -> DbResult<()> {
        tx.conn()
            .execute_batch(&self.create_sql())
            .map_err(|e| DbError::TableCreationFailed(e.to_string()))?;
        log::debug!("Migration ledger {} ready", self.table());
        Ok(())
    }

    fn has_applied(&self, tx: &DuckDbTransaction<'_>, name: &ScriptName) -> DbResult<bool> {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE script_name = ?", self.table());
        let count: i64 = tx
            .conn()
            .query_row(&sql, duckdb::params![name.as_str()], |row| row.get(0))
            .map_err(|e| DbError::LedgerQueryFailed {
                script: name.to_string(),
                message: e.to_string(),
            })?;
        Ok(count > 0)
    }

    fn record_applied(&self, tx: &DuckDbTransaction<'_>, name: &ScriptName) -> DbResult<()> {
        let sql = format!("INSERT INTO {} (script_name) VALUES (?)", self.table());
        tx.conn()
            .execute(&sql, duckdb::params![name.as_str()])
            .map_err(|e| DbError::LedgerWriteFailed {
                script: name.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    fn applied_entries(&self, tx: &DuckDbTransaction<'_>) -> DbResult<Vec<LedgerEntry>> {
        let query_failed = |message: String| DbError::LedgerQueryFailed {
            script: "*".to_string(),
            message,
        };

        let sql = format!(
            "SELECT id, script_name, epoch_ms(applied_at) FROM {} ORDER BY id",
            self.table()
        );
        let mut stmt = tx
            .conn()
            .prepare(&sql)
            .map_err(|e| query_failed(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })
            .map_err(|e| query_failed(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| query_failed(e.to_string()))?;

        rows.into_iter()
            .map(|(id, script_name, millis)| {
                let applied_at = DateTime::<Utc>::from_timestamp_millis(millis).ok_or_else(|| {
                    query_failed(format!("applied_at out of range for '{script_name}'"))
                })?;
                Ok(LedgerEntry {
                    id,
                    script_name,
                    applied_at,
                })
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "ledger_test.rs"]
mod tests;
