//! Run outcomes and reports.

use crate::error::EngineError;
use grotto_core::ScriptName;
use std::fmt;
use std::time::Duration;

/// What a run did, in apply order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Scripts executed and recorded in this run.
    pub applied: Vec<ScriptName>,
    /// Scripts skipped because the ledger already had them.
    pub skipped: Vec<ScriptName>,
    /// Blank scripts recorded without execution (also listed in `applied`).
    pub blank: Vec<ScriptName>,
    /// Wall-clock time of the run.
    pub elapsed: Duration,
}

impl RunReport {
    /// Number of scripts considered.
    pub fn total(&self) -> usize {
        self.applied.len() + self.skipped.len()
    }
}

/// A run that rolled back cleanly.
#[derive(Debug)]
pub struct RunFailure {
    /// Script being processed when the run stopped; `None` for setup
    /// failures (ledger creation, discovery, commit).
    pub script: Option<ScriptName>,
    /// The originating error.
    pub cause: EngineError,
    /// Progress made before the failure. None of it persisted.
    pub report: RunReport,
}

impl fmt::Display for RunFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.script {
            Some(script) => write!(f, "migration failed at {script}: {}", self.cause),
            None => write!(f, "migration failed: {}", self.cause),
        }
    }
}

/// How a run ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// Every pending script was applied and the transaction committed.
    Committed(RunReport),
    /// Something failed and the transaction was rolled back.
    RolledBack(RunFailure),
}

impl RunOutcome {
    /// True if the run committed.
    pub fn is_committed(&self) -> bool {
        matches!(self, RunOutcome::Committed(_))
    }

    /// The run's report, whichever way it ended.
    pub fn report(&self) -> &RunReport {
        match self {
            RunOutcome::Committed(report) => report,
            RunOutcome::RolledBack(failure) => &failure.report,
        }
    }
}
