//! JSON snapshots handed over by the API layer.
//!
//! A snapshot is everything the progression engine needs for one learner:
//! the course catalogue, that learner's completion records and enrollments.

use learn_core::model::{CourseEnrollment, LearnerId, Module, ModuleCompletion};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::repository::{
    CompletionRepository, EnrollmentRepository, InMemoryRepository, ModuleRepository, Storage,
    StorageError,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub learner_id: LearnerId,
    #[serde(default)]
    pub modules: Vec<Module>,
    #[serde(default)]
    pub completions: Vec<ModuleCompletion>,
    #[serde(default)]
    pub enrollments: Vec<CourseEnrollment>,
}

impl Snapshot {
    /// Parse a snapshot from JSON text.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the payload is not a valid snapshot.
    pub fn from_json(raw: &str) -> Result<Self, StorageError> {
        serde_json::from_str(raw).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    /// Render the snapshot back to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if encoding fails.
    pub fn to_json(&self) -> Result<String, StorageError> {
        serde_json::to_string_pretty(self).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    /// Seed an in-memory `Storage` with the snapshot contents.
    ///
    /// Completion records go through the regular last-write-wins upsert, so
    /// duplicate records for the same module collapse to the newest one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if any write fails.
    pub async fn into_storage(self) -> Result<Storage, StorageError> {
        let repo = InMemoryRepository::new();
        for module in &self.modules {
            repo.upsert_module(module).await?;
        }
        for completion in &self.completions {
            repo.upsert_completion(self.learner_id, completion).await?;
        }
        for enrollment in &self.enrollments {
            repo.upsert_enrollment(self.learner_id, enrollment).await?;
        }
        debug!(
            learner = %self.learner_id,
            modules = self.modules.len(),
            completions = self.completions.len(),
            enrollments = self.enrollments.len(),
            "seeded storage from snapshot"
        );
        Ok(Storage::from_repository(repo))
    }

    /// Read back everything `storage` holds for one learner.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if any repository read fails.
    pub async fn capture(storage: &Storage, learner_id: LearnerId) -> Result<Self, StorageError> {
        Ok(Self {
            learner_id,
            modules: storage.modules.list_modules().await?,
            completions: storage.completions.list_completions(learner_id).await?,
            enrollments: storage.enrollments.list_enrollments(learner_id).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use learn_core::model::{CourseId, ModuleId};

    const PAYLOAD: &str = r#"{
        "learner_id": 7,
        "modules": [
            {"id": 1, "course_id": 1, "order": 1, "duration_minutes": 15, "title": "Basics"},
            {"id": 2, "course_id": 1, "order": 2, "duration_minutes": 20}
        ],
        "completions": [
            {"id": 1, "module_id": 1, "is_completed": true,
             "completed_at": "2023-11-14T22:13:20Z", "time_spent_minutes": 14}
        ],
        "enrollments": [
            {"id": 3, "course_id": 1, "current_module": 2, "progress_percentage": 50,
             "completed_modules_count": 1, "total_modules_count": 2}
        ]
    }"#;

    #[test]
    fn parses_api_payload() {
        let snapshot = Snapshot::from_json(PAYLOAD).unwrap();
        assert_eq!(snapshot.learner_id, LearnerId::new(7));
        assert_eq!(snapshot.modules.len(), 2);
        assert_eq!(snapshot.modules[0].title.as_deref(), Some("Basics"));
        assert!(snapshot.completions[0].is_completed);
        assert_eq!(snapshot.enrollments[0].current_module, Some(ModuleId::new(2)));
    }

    #[test]
    fn rejects_malformed_payload() {
        let err = Snapshot::from_json("{\"modules\": []}").unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }

    #[test]
    fn json_round_trip_keeps_content() {
        let snapshot = Snapshot::from_json(PAYLOAD).unwrap();
        let again = Snapshot::from_json(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(snapshot, again);
    }

    #[tokio::test]
    async fn capture_reads_back_seeded_learner() {
        let snapshot = Snapshot::from_json(PAYLOAD).unwrap();
        let storage = snapshot.clone().into_storage().await.unwrap();

        let captured = Snapshot::capture(&storage, snapshot.learner_id)
            .await
            .unwrap();
        assert_eq!(captured, snapshot);
    }

    #[tokio::test]
    async fn seeds_storage_for_learner() {
        let storage = Snapshot::from_json(PAYLOAD)
            .unwrap()
            .into_storage()
            .await
            .unwrap();
        let learner = LearnerId::new(7);

        let modules = storage
            .modules
            .list_course_modules(CourseId::new(1))
            .await
            .unwrap();
        assert_eq!(modules.len(), 2);
        assert_eq!(storage.completions.list_completions(learner).await.unwrap().len(), 1);
        assert!(
            storage
                .enrollments
                .get_enrollment(learner, CourseId::new(1))
                .await
                .unwrap()
                .is_some()
        );
    }
}
