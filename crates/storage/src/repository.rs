use async_trait::async_trait;
use learn_core::model::{
    CompletionId, CourseEnrollment, CourseId, LearnerId, Module, ModuleCompletion, ModuleId,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing::debug;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Read access to the course catalogue.
#[async_trait]
pub trait ModuleRepository: Send + Sync {
    /// Every known module, grouped by course and ordered by ordinal.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the catalogue cannot be read.
    async fn list_modules(&self) -> Result<Vec<Module>, StorageError>;

    /// Modules of one course ordered by ordinal. Unknown courses yield an empty list.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the catalogue cannot be read.
    async fn list_course_modules(&self, course_id: CourseId) -> Result<Vec<Module>, StorageError>;

    /// Fetch a module by ID. Returns `Ok(None)` when missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the catalogue cannot be read.
    async fn get_module(&self, id: ModuleId) -> Result<Option<Module>, StorageError>;

    /// Insert or replace a module.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the module cannot be stored.
    async fn upsert_module(&self, module: &Module) -> Result<(), StorageError>;
}

/// Per-learner completion records.
#[async_trait]
pub trait CompletionRepository: Send + Sync {
    /// All completion records of a learner, ordered by module ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if records cannot be read.
    async fn list_completions(
        &self,
        learner: LearnerId,
    ) -> Result<Vec<ModuleCompletion>, StorageError>;

    /// Store a completion record using last-write-wins per (learner, module).
    ///
    /// Returns the record that is stored after the write, which is the
    /// existing one when the incoming record is older.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn upsert_completion(
        &self,
        learner: LearnerId,
        completion: &ModuleCompletion,
    ) -> Result<ModuleCompletion, StorageError>;

    /// Allocate an unused completion record ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the ID sequence cannot be read.
    async fn next_completion_id(&self) -> Result<CompletionId, StorageError>;
}

/// Per-learner course enrollments.
#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    /// All enrollments of a learner, ordered by course ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if enrollments cannot be read.
    async fn list_enrollments(
        &self,
        learner: LearnerId,
    ) -> Result<Vec<CourseEnrollment>, StorageError>;

    /// Enrollment of a learner in a course, `Ok(None)` when not enrolled.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if enrollments cannot be read.
    async fn get_enrollment(
        &self,
        learner: LearnerId,
        course_id: CourseId,
    ) -> Result<Option<CourseEnrollment>, StorageError>;

    /// Insert or replace the enrollment for (learner, course).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the enrollment cannot be stored.
    async fn upsert_enrollment(
        &self,
        learner: LearnerId,
        enrollment: &CourseEnrollment,
    ) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    modules: Arc<Mutex<BTreeMap<ModuleId, Module>>>,
    completions: Arc<Mutex<BTreeMap<(LearnerId, ModuleId), ModuleCompletion>>>,
    enrollments: Arc<Mutex<BTreeMap<(LearnerId, CourseId), CourseEnrollment>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StorageError> {
    mutex
        .lock()
        .map_err(|e| StorageError::Connection(e.to_string()))
}

fn sort_by_ordinal(modules: &mut [Module]) {
    modules.sort_by_key(|m| (m.course_id, m.order, m.id));
}

#[async_trait]
impl ModuleRepository for InMemoryRepository {
    async fn list_modules(&self) -> Result<Vec<Module>, StorageError> {
        let guard = lock(&self.modules)?;
        let mut modules: Vec<Module> = guard.values().cloned().collect();
        sort_by_ordinal(&mut modules);
        Ok(modules)
    }

    async fn list_course_modules(&self, course_id: CourseId) -> Result<Vec<Module>, StorageError> {
        let guard = lock(&self.modules)?;
        let mut modules: Vec<Module> = guard
            .values()
            .filter(|m| m.course_id == course_id)
            .cloned()
            .collect();
        sort_by_ordinal(&mut modules);
        Ok(modules)
    }

    async fn get_module(&self, id: ModuleId) -> Result<Option<Module>, StorageError> {
        let guard = lock(&self.modules)?;
        Ok(guard.get(&id).cloned())
    }

    async fn upsert_module(&self, module: &Module) -> Result<(), StorageError> {
        let mut guard = lock(&self.modules)?;
        guard.insert(module.id, module.clone());
        Ok(())
    }
}

#[async_trait]
impl CompletionRepository for InMemoryRepository {
    async fn list_completions(
        &self,
        learner: LearnerId,
    ) -> Result<Vec<ModuleCompletion>, StorageError> {
        let guard = lock(&self.completions)?;
        Ok(guard
            .iter()
            .filter(|((owner, _), _)| *owner == learner)
            .map(|(_, record)| record.clone())
            .collect())
    }

    async fn upsert_completion(
        &self,
        learner: LearnerId,
        completion: &ModuleCompletion,
    ) -> Result<ModuleCompletion, StorageError> {
        let mut guard = lock(&self.completions)?;
        let key = (learner, completion.module_id);
        if let Some(existing) = guard.get(&key).filter(|e| !completion.supersedes(e)) {
            debug!(
                learner = %learner,
                module = %completion.module_id,
                "ignoring stale completion write"
            );
            return Ok(existing.clone());
        }
        guard.insert(key, completion.clone());
        Ok(completion.clone())
    }

    async fn next_completion_id(&self) -> Result<CompletionId, StorageError> {
        let guard = lock(&self.completions)?;
        let highest = guard.values().map(|c| c.id.value()).max().unwrap_or(0);
        Ok(CompletionId::new(highest + 1))
    }
}

#[async_trait]
impl EnrollmentRepository for InMemoryRepository {
    async fn list_enrollments(
        &self,
        learner: LearnerId,
    ) -> Result<Vec<CourseEnrollment>, StorageError> {
        let guard = lock(&self.enrollments)?;
        Ok(guard
            .iter()
            .filter(|((owner, _), _)| *owner == learner)
            .map(|(_, enrollment)| enrollment.clone())
            .collect())
    }

    async fn get_enrollment(
        &self,
        learner: LearnerId,
        course_id: CourseId,
    ) -> Result<Option<CourseEnrollment>, StorageError> {
        let guard = lock(&self.enrollments)?;
        Ok(guard.get(&(learner, course_id)).cloned())
    }

    async fn upsert_enrollment(
        &self,
        learner: LearnerId,
        enrollment: &CourseEnrollment,
    ) -> Result<(), StorageError> {
        let mut guard = lock(&self.enrollments)?;
        guard.insert((learner, enrollment.course_id), enrollment.clone());
        Ok(())
    }
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub modules: Arc<dyn ModuleRepository>,
    pub completions: Arc<dyn CompletionRepository>,
    pub enrollments: Arc<dyn EnrollmentRepository>,
}

impl Storage {
    #[must_use]
    pub fn from_repository(repo: InMemoryRepository) -> Self {
        let modules: Arc<dyn ModuleRepository> = Arc::new(repo.clone());
        let completions: Arc<dyn CompletionRepository> = Arc::new(repo.clone());
        let enrollments: Arc<dyn EnrollmentRepository> = Arc::new(repo);
        Self {
            modules,
            completions,
            enrollments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use learn_core::model::EnrollmentId;
    use learn_core::time::fixed_now;

    fn module(id: u64, course: u64, order: i32) -> Module {
        Module::new(ModuleId::new(id), CourseId::new(course), order, 10)
    }

    #[tokio::test]
    async fn lists_course_modules_in_ordinal_order() {
        let repo = InMemoryRepository::new();
        for m in [module(3, 1, 2), module(1, 1, 1), module(9, 2, 1), module(2, 1, 3)] {
            repo.upsert_module(&m).await.unwrap();
        }

        let ids: Vec<u64> = repo
            .list_course_modules(CourseId::new(1))
            .await
            .unwrap()
            .iter()
            .map(|m| m.id.value())
            .collect();
        assert_eq!(ids, vec![1, 3, 2]);

        assert_eq!(repo.list_modules().await.unwrap().len(), 4);
        assert!(repo.get_module(ModuleId::new(42)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn completion_writes_are_last_write_wins() {
        let repo = InMemoryRepository::new();
        let learner = LearnerId::new(1);
        let newer = ModuleCompletion::completed(
            CompletionId::new(1),
            ModuleId::new(1),
            fixed_now() + Duration::hours(1),
            20,
        );
        let older =
            ModuleCompletion::completed(CompletionId::new(1), ModuleId::new(1), fixed_now(), 5);

        repo.upsert_completion(learner, &newer).await.unwrap();
        let stored = repo.upsert_completion(learner, &older).await.unwrap();
        assert_eq!(stored, newer);

        let listed = repo.list_completions(learner).await.unwrap();
        assert_eq!(listed, vec![newer]);
        assert_eq!(repo.next_completion_id().await.unwrap(), CompletionId::new(2));
        assert!(repo.list_completions(LearnerId::new(2)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn enrollments_are_scoped_per_learner() {
        let repo = InMemoryRepository::new();
        let enrollment = CourseEnrollment::new(EnrollmentId::new(5), CourseId::new(1));
        repo.upsert_enrollment(LearnerId::new(1), &enrollment)
            .await
            .unwrap();

        let found = repo
            .get_enrollment(LearnerId::new(1), CourseId::new(1))
            .await
            .unwrap();
        assert_eq!(found, Some(enrollment));

        let missing = repo
            .get_enrollment(LearnerId::new(2), CourseId::new(1))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn repository_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<InMemoryRepository>();
        assert_send_sync::<Storage>();
    }
}
