//! grotto-core - Core library for Grotto
//!
//! This crate provides the migration script model, discovery of `.sql`
//! scripts from a migration directory, and `grotto.yml` configuration
//! parsing shared by the database, engine, and CLI crates.

pub mod config;
pub mod error;
pub mod script;
pub mod script_name;
pub mod source;

pub use config::{Config, DatabaseConfig};
pub use error::{CoreError, CoreResult};
pub use script::ScriptUnit;
pub use script_name::ScriptName;
pub use source::{discover, DirectorySource, ScriptProvider, SCRIPT_EXTENSION};
