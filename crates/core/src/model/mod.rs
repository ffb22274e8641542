mod completion;
mod enrollment;
mod ids;
mod module;
mod status;

pub use completion::ModuleCompletion;
pub use enrollment::CourseEnrollment;
pub use ids::{CompletionId, CourseId, EnrollmentId, LearnerId, ModuleId, ParseIdError};
pub use module::Module;
pub use status::ModuleStatus;
