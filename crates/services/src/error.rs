//! Shared error types for the services crate.

use thiserror::Error;

use learn_core::model::{CourseId, ModuleId};
use storage::repository::StorageError;

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error("learner is not enrolled in course {course_id}")]
    NotEnrolled { course_id: CourseId },
    #[error("module {module_id} does not exist")]
    UnknownModule { module_id: ModuleId },
    #[error("module {module_id} is locked")]
    ModuleLocked { module_id: ModuleId },
    #[error("completion of module {module_id} was superseded by a newer record")]
    CompletionRejected { module_id: ModuleId },
    #[error(transparent)]
    Storage(#[from] StorageError),
}
