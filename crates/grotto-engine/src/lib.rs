//! grotto-engine - Migration engine for Grotto
//!
//! Applies an ordered set of SQL scripts exactly once each inside a single
//! transaction. A run either applies and records every pending script and
//! commits, or rolls back and leaves the database as it found it.
//!
//! Runs against the same database are not coordinated with each other. Two
//! concurrent runs on an empty ledger race on the ledger's uniqueness
//! constraint and the loser rolls back; run one migration process at a time.

pub mod engine;
pub mod error;
pub mod migrate;
pub mod report;
pub mod status;

pub use engine::{EngineOptions, MigrationEngine};
pub use error::{EngineError, EngineResult, FatalError};
pub use migrate::{migrate, status};
pub use report::{RunFailure, RunOutcome, RunReport};
pub use status::{ScriptState, ScriptStatus, StatusReport};
