#![forbid(unsafe_code)]

pub mod error;
pub mod progress_service;
pub mod progress_view;

pub use learn_core::Clock;

pub use error::ProgressServiceError;
pub use progress_service::ProgressService;
pub use progress_view::{CourseOverview, DashboardView, ModuleBuckets, ModuleView};
