use serde::Serialize;

use learn_core::model::{CourseEnrollment, CourseId, Module, ModuleId, ModuleStatus};
use learn_core::progression::{CourseProgress, DashboardProgress, ModulePartition};

/// A module together with its derived status, ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleView {
    pub module: Module,
    pub status: ModuleStatus,
}

/// Everything a course-detail screen needs for one learner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseOverview {
    pub course_id: CourseId,
    /// Modules in ordinal order.
    pub modules: Vec<ModuleView>,
    pub progress: CourseProgress,
    /// Module to open by default, `None` once the course is finished.
    pub current_module: Option<ModuleId>,
    /// Recomputed enrollment, `None` when the learner is not enrolled.
    pub enrollment: Option<CourseEnrollment>,
}

impl CourseOverview {
    #[must_use]
    pub fn status_of(&self, module_id: ModuleId) -> Option<ModuleStatus> {
        self.modules
            .iter()
            .find(|view| view.module.id == module_id)
            .map(|view| view.status)
    }

    #[must_use]
    pub fn statuses(&self) -> Vec<ModuleStatus> {
        self.modules.iter().map(|view| view.status).collect()
    }

    #[must_use]
    pub fn is_enrolled(&self) -> bool {
        self.enrollment.is_some()
    }
}

/// Owned copy of a [`ModulePartition`], detached from the loaded snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ModuleBuckets {
    pub completed: Vec<Module>,
    pub current: Vec<Module>,
    pub available: Vec<Module>,
    pub locked: Vec<Module>,
}

impl ModuleBuckets {
    /// Modules to surface under "continue learning": current first, then available.
    #[must_use]
    pub fn continue_learning(&self) -> Vec<&Module> {
        self.current.iter().chain(self.available.iter()).collect()
    }
}

impl From<ModulePartition<'_>> for ModuleBuckets {
    fn from(partition: ModulePartition<'_>) -> Self {
        let owned = |bucket: Vec<&Module>| -> Vec<Module> { bucket.into_iter().cloned().collect() };
        Self {
            completed: owned(partition.completed),
            current: owned(partition.current),
            available: owned(partition.available),
            locked: owned(partition.locked),
        }
    }
}

/// Learner dashboard: progress per enrolled course plus module buckets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardView {
    pub progress: DashboardProgress,
    pub modules: ModuleBuckets,
}
