use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{CompletionId, ModuleId};

/// Durable fact that a learner worked on (and possibly finished) a module.
///
/// There is at most one record per (learner, module). A module without a
/// record is treated as not completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleCompletion {
    pub id: CompletionId,
    pub module_id: ModuleId,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub time_spent_minutes: u32,
}

impl ModuleCompletion {
    /// Record for a module the learner has finished.
    #[must_use]
    pub fn completed(
        id: CompletionId,
        module_id: ModuleId,
        completed_at: DateTime<Utc>,
        time_spent_minutes: u32,
    ) -> Self {
        Self {
            id,
            module_id,
            is_completed: true,
            completed_at: Some(completed_at),
            time_spent_minutes,
        }
    }

    /// Record for a module that was started (or reset) but is not finished.
    #[must_use]
    pub fn in_progress(id: CompletionId, module_id: ModuleId, time_spent_minutes: u32) -> Self {
        Self {
            id,
            module_id,
            is_completed: false,
            completed_at: None,
            time_spent_minutes,
        }
    }

    /// Last-write-wins ordering between two records for the same module.
    ///
    /// Returns true when `self` should replace `existing`: a newer
    /// `completed_at` wins, an untimestamped write never replaces a
    /// timestamped one, and ties go to the incoming record.
    #[must_use]
    pub fn supersedes(&self, existing: &ModuleCompletion) -> bool {
        match (self.completed_at, existing.completed_at) {
            (Some(incoming), Some(current)) => incoming >= current,
            (None, Some(_)) => false,
            (Some(_), None) | (None, None) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    #[test]
    fn newer_timestamp_supersedes_older() {
        let older = ModuleCompletion::completed(CompletionId::new(1), ModuleId::new(1), fixed_now(), 5);
        let newer = ModuleCompletion::completed(
            CompletionId::new(2),
            ModuleId::new(1),
            fixed_now() + Duration::minutes(1),
            7,
        );

        assert!(newer.supersedes(&older));
        assert!(!older.supersedes(&newer));
    }

    #[test]
    fn untimestamped_write_does_not_replace_completed_record() {
        let done = ModuleCompletion::completed(CompletionId::new(1), ModuleId::new(1), fixed_now(), 5);
        let reset = ModuleCompletion::in_progress(CompletionId::new(1), ModuleId::new(1), 0);

        assert!(!reset.supersedes(&done));
        assert!(done.supersedes(&reset));
        assert!(reset.supersedes(&reset.clone()));
    }

    #[test]
    fn missing_flags_default_to_not_completed() {
        let record: ModuleCompletion =
            serde_json::from_str(r#"{"id": 1, "module_id": 3}"#).unwrap();
        assert!(!record.is_completed);
        assert_eq!(record.completed_at, None);
        assert_eq!(record.time_spent_minutes, 0);
    }
}
