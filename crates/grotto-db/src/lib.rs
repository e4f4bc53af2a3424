//! grotto-db - Database layer for Grotto
//!
//! This crate provides the two capabilities the migration engine needs from a
//! database, an open transaction that can run script bodies
//! ([`ScriptTransaction`]) and the applied-script ledger
//! ([`MigrationLedger`]), along with their DuckDB implementations.

pub mod backend;
pub mod error;
pub mod ledger;
pub mod traits;

pub use backend::{DuckDbBackend, DuckDbTransaction};
pub use error::{DbError, DbResult};
pub use ledger::{DuckDbLedger, LedgerEntry, LEDGER_TABLE};
pub use traits::{MigrationLedger, ScriptTransaction};
