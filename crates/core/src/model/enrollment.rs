use serde::{Deserialize, Serialize};

use crate::model::ids::{CourseId, EnrollmentId, ModuleId};

/// A learner's relationship to a course.
///
/// The aggregate fields (`progress_percentage`, `completed_modules_count`,
/// `total_modules_count`) and `current_module` are a cached view of the
/// completion set. They may arrive pre-computed from the backend but are
/// always recomputed by [`crate::progression::refresh_enrollment`] before
/// being shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseEnrollment {
    pub id: EnrollmentId,
    pub course_id: CourseId,
    #[serde(default)]
    pub current_module: Option<ModuleId>,
    #[serde(default)]
    pub progress_percentage: u8,
    #[serde(default)]
    pub completed_modules_count: u32,
    #[serde(default)]
    pub total_modules_count: u32,
}

impl CourseEnrollment {
    /// A fresh enrollment with no progress and no current module.
    #[must_use]
    pub fn new(id: EnrollmentId, course_id: CourseId) -> Self {
        Self {
            id,
            course_id,
            current_module: None,
            progress_percentage: 0,
            completed_modules_count: 0,
            total_modules_count: 0,
        }
    }

    #[must_use]
    pub fn with_current_module(mut self, module_id: ModuleId) -> Self {
        self.current_module = Some(module_id);
        self
    }

    /// True when the enrollment's pointer names the given module.
    #[must_use]
    pub fn is_current(&self, module_id: ModuleId) -> bool {
        self.current_module == Some(module_id)
    }
}
