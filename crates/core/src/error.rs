use thiserror::Error;

use crate::model::{CourseId, ModuleId};

/// Problems found by [`crate::progression::check_ordinals`].
///
/// The progression engine never raises these on its own; they exist for
/// callers that want to reject malformed course layouts up front.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum OrdinalError {
    #[error("module {module_id} in course {course_id} has non-positive ordinal {order}")]
    NonPositive {
        course_id: CourseId,
        module_id: ModuleId,
        order: i32,
    },

    #[error("modules {first} and {second} in course {course_id} share ordinal {order}")]
    Duplicate {
        course_id: CourseId,
        order: i32,
        first: ModuleId,
        second: ModuleId,
    },
}
