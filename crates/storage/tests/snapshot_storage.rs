use chrono::{TimeZone, Utc};
use learn_core::model::{CompletionId, CourseId, LearnerId, ModuleCompletion, ModuleId};
use storage::{CompletionRepository, EnrollmentRepository, ModuleRepository, Snapshot};

const PAYLOAD: &str = r#"{
    "learner_id": 5,
    "modules": [
        {"id": 2, "course_id": 1, "order": 2},
        {"id": 1, "course_id": 1, "order": 1},
        {"id": 3, "course_id": 2, "order": 1}
    ],
    "completions": [
        {"id": 1, "module_id": 1, "is_completed": true,
         "completed_at": "2023-11-14T10:00:00Z", "time_spent_minutes": 5},
        {"id": 2, "module_id": 1, "is_completed": false, "time_spent_minutes": 2}
    ],
    "enrollments": [
        {"id": 1, "course_id": 1}
    ]
}"#;

#[tokio::test]
async fn duplicate_completions_collapse_on_seed() {
    let storage = Snapshot::from_json(PAYLOAD)
        .unwrap()
        .into_storage()
        .await
        .unwrap();

    let completions = storage
        .completions
        .list_completions(LearnerId::new(5))
        .await
        .unwrap();
    assert_eq!(completions.len(), 1);
    assert!(completions[0].is_completed);
    assert_eq!(completions[0].time_spent_minutes, 5);
}

#[tokio::test]
async fn writes_show_up_in_captured_snapshot() {
    let storage = Snapshot::from_json(PAYLOAD)
        .unwrap()
        .into_storage()
        .await
        .unwrap();
    let learner = LearnerId::new(5);

    let id = storage.completions.next_completion_id().await.unwrap();
    assert_eq!(id, CompletionId::new(2));
    let at = Utc.with_ymd_and_hms(2023, 11, 15, 9, 0, 0).unwrap();
    storage
        .completions
        .upsert_completion(
            learner,
            &ModuleCompletion::completed(id, ModuleId::new(2), at, 12),
        )
        .await
        .unwrap();

    let captured = Snapshot::capture(&storage, learner).await.unwrap();
    let ordered: Vec<u64> = captured.modules.iter().map(|m| m.id.value()).collect();
    assert_eq!(ordered, vec![1, 2, 3]);
    assert_eq!(captured.completions.len(), 2);
    assert_eq!(captured.enrollments.len(), 1);

    let reparsed = Snapshot::from_json(&captured.to_json().unwrap()).unwrap();
    assert_eq!(reparsed, captured);
}

#[tokio::test]
async fn other_learners_see_nothing() {
    let storage = Snapshot::from_json(PAYLOAD)
        .unwrap()
        .into_storage()
        .await
        .unwrap();
    let stranger = LearnerId::new(6);

    assert!(
        storage
            .completions
            .list_completions(stranger)
            .await
            .unwrap()
            .is_empty()
    );
    assert!(
        storage
            .enrollments
            .get_enrollment(stranger, CourseId::new(1))
            .await
            .unwrap()
            .is_none()
    );
    assert_eq!(
        storage
            .modules
            .list_course_modules(CourseId::new(2))
            .await
            .unwrap()
            .len(),
        1
    );
}
