//! Error types for grotto-core

use thiserror::Error;

/// Core error type for Grotto
#[derive(Error, Debug)]
pub enum CoreError {
    /// G001: Migration directory could not be listed
    #[error("[G001] Migration directory unreadable: {path}: {source}")]
    DirectoryUnreadable {
        path: String,
        source: std::io::Error,
    },

    /// G002: A migration script could not be read
    #[error("[G002] Migration script unreadable: {path}: {source}")]
    FileUnreadable {
        path: String,
        source: std::io::Error,
    },

    /// G003: Configuration file not found
    #[error("[G003] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// G004: Failed to parse configuration file
    #[error("[G004] Failed to parse config {path}: {message}")]
    ConfigParseError { path: String, message: String },

    /// G005: Invalid configuration value
    #[error("[G005] Invalid config: {message}")]
    ConfigInvalid { message: String },
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
