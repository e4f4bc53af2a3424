//! Configuration types and parsing for grotto.yml

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file names looked up by [`Config::load_from_dir`], in order.
pub const CONFIG_FILE_NAMES: &[&str] = &["grotto.yml", "grotto.yaml"];

/// DuckDB path that selects an in-memory database.
pub const MEMORY_DB_PATH: &str = ":memory:";

const DEFAULT_MIGRATIONS_DIR: &str = "migrations";

/// Main configuration from grotto.yml
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Database connection configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Directory containing the `.sql` migration scripts
    #[serde(default = "default_migrations_dir")]
    pub migrations_dir: String,

    /// Optional deadline for a whole run, in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Database connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// DuckDB database file, or `:memory:`
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            migrations_dir: default_migrations_dir(),
            timeout_secs: None,
        }
    }
}

fn default_db_path() -> String {
    MEMORY_DB_PATH.to_string()
}

fn default_migrations_dir() -> String {
    DEFAULT_MIGRATIONS_DIR.to_string()
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content =
            std::fs::read_to_string(path).map_err(|e| CoreError::ConfigParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| CoreError::ConfigParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a directory.
    /// Looks for grotto.yml or grotto.yaml
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        for name in CONFIG_FILE_NAMES {
            let path = dir.join(name);
            if path.exists() {
                return Self::load(&path);
            }
        }
        Err(CoreError::ConfigNotFound {
            path: dir.join(CONFIG_FILE_NAMES[0]).display().to_string(),
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> CoreResult<()> {
        if self.database.path.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "database.path cannot be empty".to_string(),
            });
        }

        if self.migrations_dir.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "migrations_dir cannot be empty".to_string(),
            });
        }

        if self.timeout_secs == Some(0) {
            return Err(CoreError::ConfigInvalid {
                message: "timeout_secs must be greater than zero".to_string(),
            });
        }

        Ok(())
    }

    /// True when the configured database lives in memory only.
    pub fn is_memory_database(&self) -> bool {
        self.database.path == MEMORY_DB_PATH
    }

    /// Resolve the database path against `root`, leaving `:memory:` alone.
    pub fn database_path_absolute(&self, root: &Path) -> String {
        if self.is_memory_database() {
            return self.database.path.clone();
        }
        root.join(&self.database.path).display().to_string()
    }

    /// Get the absolute migrations directory relative to `root`
    pub fn migrations_dir_absolute(&self, root: &Path) -> PathBuf {
        root.join(&self.migrations_dir)
    }

    /// Run deadline, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
