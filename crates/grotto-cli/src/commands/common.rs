//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use grotto_core::config::MEMORY_DB_PATH;
use grotto_core::{Config, CoreError};
use grotto_db::DuckDbBackend;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::GlobalArgs;

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode::ROLLED_BACK.into())` instead of
/// `std::process::exit` so that destructors run and the database connection
/// is closed properly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ExitCode(pub(crate) u8);

impl ExitCode {
    /// User error: bad arguments, bad config, unreadable database.
    pub(crate) const FAILURE: ExitCode = ExitCode(1);
    /// The run failed and was rolled back cleanly.
    pub(crate) const ROLLED_BACK: ExitCode = ExitCode(1);
    /// Transaction start or rollback failed; database state is unknown.
    pub(crate) const FATAL: ExitCode = ExitCode(2);
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Empty: ExitCode is control flow, the real message was already
        // printed by the command.
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// Effective settings after merging grotto.yml with command-line overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Settings {
    /// DuckDB path, or `:memory:`
    pub database: String,
    pub migrations_dir: PathBuf,
    pub timeout: Option<Duration>,
}

impl Settings {
    /// Open the configured database.
    pub(crate) fn open_database(&self) -> Result<DuckDbBackend> {
        log::debug!("Opening database {}", self.database);
        DuckDbBackend::new(&self.database)
            .with_context(|| format!("Failed to open database {}", self.database))
    }
}

/// Resolve settings relative to the process working directory.
pub(crate) fn load_settings(global: &GlobalArgs) -> Result<Settings> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    resolve_settings(global, &cwd)
}

/// Merge config and flags.
///
/// Paths from the config file resolve against the file's directory; paths
/// given as flags resolve against `cwd`. A missing config file is only an
/// error when `--config` named it.
pub(crate) fn resolve_settings(global: &GlobalArgs, cwd: &Path) -> Result<Settings> {
    let (config, root) = match &global.config {
        Some(path) => {
            let path = cwd.join(path);
            let config = Config::load(&path).context("Failed to load config")?;
            let root = path.parent().map(Path::to_path_buf).unwrap_or_else(|| cwd.to_path_buf());
            (config, root)
        }
        None => match Config::load_from_dir(cwd) {
            Ok(config) => (config, cwd.to_path_buf()),
            Err(CoreError::ConfigNotFound { .. }) => {
                log::debug!("No grotto.yml in {}, using defaults", cwd.display());
                (Config::default(), cwd.to_path_buf())
            }
            Err(e) => return Err(e).context("Failed to load config"),
        },
    };

    let database = match &global.database {
        Some(path) if path == MEMORY_DB_PATH => path.clone(),
        Some(path) => cwd.join(path).display().to_string(),
        None => config.database_path_absolute(&root),
    };
    let migrations_dir = match &global.migrations_dir {
        Some(dir) => cwd.join(dir),
        None => config.migrations_dir_absolute(&root),
    };

    Ok(Settings {
        database,
        migrations_dir,
        timeout: config.timeout(),
    })
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
