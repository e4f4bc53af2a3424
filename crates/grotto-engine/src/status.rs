//! Applied/pending status of a migration directory against a ledger.

use chrono::{DateTime, Utc};
use grotto_core::ScriptName;
use grotto_db::LedgerEntry;
use serde::Serialize;

/// Whether a script has been applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ScriptState {
    /// In the ledger.
    Applied { applied_at: DateTime<Utc> },
    /// Not in the ledger; the next run will apply it.
    Pending,
}

/// One script on disk and its state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptStatus {
    pub name: ScriptName,
    #[serde(flatten)]
    pub state: ScriptState,
}

/// Status of every script in apply order, plus ledger rows whose script is
/// no longer on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub scripts: Vec<ScriptStatus>,
    pub orphaned: Vec<LedgerEntry>,
}

impl StatusReport {
    /// Scripts the next run would apply, in order.
    pub fn pending(&self) -> impl Iterator<Item = &ScriptName> {
        self.scripts
            .iter()
            .filter(|s| s.state == ScriptState::Pending)
            .map(|s| &s.name)
    }

    /// Number of scripts already in the ledger.
    pub fn applied_count(&self) -> usize {
        self.scripts
            .iter()
            .filter(|s| matches!(s.state, ScriptState::Applied { .. }))
            .count()
    }

    /// Number of scripts the next run would apply.
    pub fn pending_count(&self) -> usize {
        self.pending().count()
    }
}
