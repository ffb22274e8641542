use serde::{Deserialize, Serialize};

use crate::model::ids::{CourseId, ModuleId};

/// A single lesson unit within a course, ordered by position.
///
/// Modules are authored outside of this crate and are read-only here. The
/// `order` field is the 1-based ordinal inside the owning course. It is kept
/// signed so that malformed payloads (zero or negative ordinals) can still be
/// represented and classified permissively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub id: ModuleId,
    pub course_id: CourseId,
    pub order: i32,
    #[serde(default)]
    pub duration_minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Module {
    #[must_use]
    pub fn new(id: ModuleId, course_id: CourseId, order: i32, duration_minutes: u32) -> Self {
        Self {
            id,
            course_id,
            order,
            duration_minutes,
            title: None,
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        let title = title.into();
        let trimmed = title.trim();
        self.title = (!trimmed.is_empty()).then(|| trimmed.to_owned());
        self
    }

    /// True for the first module of a course, which is never locked.
    #[must_use]
    pub fn is_first(&self) -> bool {
        self.order == 1
    }

    /// Ordinal of the module that gates this one, if the ordinal is valid.
    #[must_use]
    pub fn predecessor_order(&self) -> Option<i32> {
        (self.order > 1).then(|| self.order - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predecessor_order_only_for_later_modules() {
        let first = Module::new(ModuleId::new(1), CourseId::new(1), 1, 10);
        let third = Module::new(ModuleId::new(3), CourseId::new(1), 3, 10);
        let broken = Module::new(ModuleId::new(9), CourseId::new(1), -2, 10);

        assert!(first.is_first());
        assert_eq!(first.predecessor_order(), None);
        assert_eq!(third.predecessor_order(), Some(2));
        assert_eq!(broken.predecessor_order(), None);
    }

    #[test]
    fn blank_title_is_dropped() {
        let module = Module::new(ModuleId::new(1), CourseId::new(1), 1, 5).with_title("   ");
        assert_eq!(module.title, None);

        let module = module.with_title(" Intro ");
        assert_eq!(module.title.as_deref(), Some("Intro"));
    }

    #[test]
    fn deserializes_api_payload_with_missing_optional_fields() {
        let module: Module =
            serde_json::from_str(r#"{"id": 4, "course_id": 2, "order": 2}"#).unwrap();
        assert_eq!(module.id, ModuleId::new(4));
        assert_eq!(module.duration_minutes, 0);
        assert_eq!(module.title, None);
    }
}
