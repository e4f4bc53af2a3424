//! Migration script model.

use crate::script_name::ScriptName;

/// One migration script: its file name and the SQL to run verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptUnit {
    /// File base name including the `.sql` extension; the ledger key.
    pub name: ScriptName,

    /// Raw SQL text, passed to the database untouched.
    pub content: String,
}

impl ScriptUnit {
    /// Create a script from a name and its SQL body.
    pub fn new(name: ScriptName, content: impl Into<String>) -> Self {
        Self {
            name,
            content: content.into(),
        }
    }

    /// True when the body is empty or whitespace only.
    ///
    /// Blank scripts are recorded in the ledger without being sent to the
    /// database.
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}
