use std::fmt;

use serde::{Deserialize, Serialize};

/// Derived learner-facing state of a single module.
///
/// The four states are mutually exclusive. Precedence when deriving them is
/// `Completed` > `Current` > `Locked`/`Available`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleStatus {
    /// The learner has a completion record marked completed.
    Completed,
    /// The module the learner is actively working through.
    Current,
    /// Open for the learner to start.
    Available,
    /// Gated behind an unfinished predecessor.
    Locked,
}

impl ModuleStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ModuleStatus::Completed => "completed",
            ModuleStatus::Current => "current",
            ModuleStatus::Available => "available",
            ModuleStatus::Locked => "locked",
        }
    }

    /// Whether the learner can open the module right now.
    #[must_use]
    pub fn is_open(self) -> bool {
        !matches!(self, ModuleStatus::Locked)
    }
}

impl fmt::Display for ModuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
