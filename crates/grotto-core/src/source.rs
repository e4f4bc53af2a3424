//! Migration script discovery.
//!
//! A migration directory is a flat folder of `.sql` files. Every file whose
//! name ends in [`SCRIPT_EXTENSION`] is a migration; everything else is
//! ignored. Scripts are applied in byte-wise filename order, so callers must
//! name files such that lexicographic order is the intended apply order
//! (`0002_` sorts after `0001_`, but `10_` sorts before `2_`).

use crate::error::{CoreError, CoreResult};
use crate::script::ScriptUnit;
use crate::script_name::ScriptName;
use std::path::{Path, PathBuf};

/// File name suffix that marks a migration script.
pub const SCRIPT_EXTENSION: &str = ".sql";

/// Anything that can produce the ordered list of scripts for a run.
pub trait ScriptProvider {
    /// Return every candidate script, sorted into apply order.
    fn scripts(&self) -> CoreResult<Vec<ScriptUnit>>;
}

/// Reads scripts from a migration directory on disk.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    /// Create a source for `dir`. The directory is not touched until
    /// [`ScriptProvider::scripts`] is called.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The migration directory this source reads from.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ScriptProvider for DirectorySource {
    fn scripts(&self) -> CoreResult<Vec<ScriptUnit>> {
        discover(&self.dir)
    }
}

impl ScriptProvider for [ScriptUnit] {
    fn scripts(&self) -> CoreResult<Vec<ScriptUnit>> {
        let mut scripts = self.to_vec();
        scripts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(scripts)
    }
}

impl ScriptProvider for Vec<ScriptUnit> {
    fn scripts(&self) -> CoreResult<Vec<ScriptUnit>> {
        self.as_slice().scripts()
    }
}

impl<P: ScriptProvider + ?Sized> ScriptProvider for &P {
    fn scripts(&self) -> CoreResult<Vec<ScriptUnit>> {
        (**self).scripts()
    }
}

/// Discover all migration scripts in `dir`, read their contents, and return
/// them sorted by file name.
///
/// Only regular files directly inside `dir` are considered; subdirectories
/// are not descended into. A directory with no matching files yields an
/// empty list. Any listing or read failure aborts discovery, since running
/// against a partial view of the script set is unsafe.
pub fn discover(dir: &Path) -> CoreResult<Vec<ScriptUnit>> {
    let unreadable_dir = |source| CoreError::DirectoryUnreadable {
        path: dir.display().to_string(),
        source,
    };

    let mut candidates: Vec<(ScriptName, PathBuf)> = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(unreadable_dir)? {
        let entry = entry.map_err(unreadable_dir)?;
        let path = entry.path();

        let Some(file_name) = entry.file_name().to_str().map(str::to_string) else {
            log::warn!(
                "Ignoring migration directory entry with non UTF-8 name: {}",
                path.display()
            );
            continue;
        };

        if !file_name.ends_with(SCRIPT_EXTENSION) || !path.is_file() {
            log::debug!("Ignoring non-script entry: {}", path.display());
            continue;
        }

        // ends_with(".sql") guarantees a non-empty name
        candidates.push((ScriptName::new(file_name), path));
    }

    if candidates.is_empty() {
        log::info!(
            "No migration scripts found in {}, nothing to apply",
            dir.display()
        );
        return Ok(Vec::new());
    }

    candidates.sort_by(|a, b| a.0.cmp(&b.0));

    let mut scripts = Vec::with_capacity(candidates.len());
    for (name, path) in candidates {
        let content =
            std::fs::read_to_string(&path).map_err(|source| CoreError::FileUnreadable {
                path: path.display().to_string(),
                source,
            })?;
        scripts.push(ScriptUnit::new(name, content));
    }

    log::debug!(
        "Discovered {} migration script(s) in {}",
        scripts.len(),
        dir.display()
    );
    Ok(scripts)
}

#[cfg(test)]
#[path = "source_test.rs"]
mod tests;
