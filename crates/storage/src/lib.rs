#![forbid(unsafe_code)]

pub mod repository;
pub mod snapshot;

pub use repository::{
    CompletionRepository, EnrollmentRepository, InMemoryRepository, ModuleRepository, Storage,
    StorageError,
};
pub use snapshot::Snapshot;
