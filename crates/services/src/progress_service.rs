use std::sync::Arc;

use tracing::{debug, info, warn};

use learn_core::model::{
    CourseEnrollment, CourseId, LearnerId, Module, ModuleCompletion, ModuleId, ModuleStatus,
};
use learn_core::progression::{
    aggregate_course_progress, aggregate_dashboard_progress, classify_module,
    enrollment_is_consistent, partition_modules, refresh_enrollment, resolve_current_module,
};
use storage::repository::{CompletionRepository, EnrollmentRepository, ModuleRepository, Storage};

use crate::Clock;
use crate::error::ProgressServiceError;
use crate::progress_view::{CourseOverview, DashboardView, ModuleBuckets, ModuleView};

/// Loads learner snapshots from the repositories and derives progression views.
///
/// All derivation is delegated to `learn_core::progression`; this service
/// only fetches inputs, persists recomputed enrollments and stamps completion
/// times with its `Clock`.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    modules: Arc<dyn ModuleRepository>,
    completions: Arc<dyn CompletionRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        clock: Clock,
        modules: Arc<dyn ModuleRepository>,
        completions: Arc<dyn CompletionRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
    ) -> Self {
        Self {
            clock,
            modules,
            completions,
            enrollments,
        }
    }

    #[must_use]
    pub fn from_storage(clock: Clock, storage: &Storage) -> Self {
        Self::new(
            clock,
            Arc::clone(&storage.modules),
            Arc::clone(&storage.completions),
            Arc::clone(&storage.enrollments),
        )
    }

    /// Module statuses, progress and default module for one course.
    ///
    /// Statuses are derived against the refreshed enrollment, so an enrolled
    /// learner whose stored pointer is null or stale sees the resolved default
    /// module as `Current` rather than `Available`.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn course_overview(
        &self,
        learner: LearnerId,
        course_id: CourseId,
    ) -> Result<CourseOverview, ProgressServiceError> {
        let modules = self.modules.list_course_modules(course_id).await?;
        let completions = self.completions.list_completions(learner).await?;
        let stored = self.enrollments.get_enrollment(learner, course_id).await?;

        Ok(build_overview(course_id, &modules, &completions, stored.as_ref()))
    }

    /// Dashboard progress across enrolled courses plus status buckets for every module.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn dashboard(&self, learner: LearnerId) -> Result<DashboardView, ProgressServiceError> {
        let modules = self.modules.list_modules().await?;
        let completions = self.completions.list_completions(learner).await?;
        let enrollments: Vec<CourseEnrollment> = self
            .enrollments
            .list_enrollments(learner)
            .await?
            .iter()
            .map(|e| refresh_enrollment(e, &modules, &completions))
            .collect();

        let progress = aggregate_dashboard_progress(&modules, &completions, &enrollments);
        let buckets = ModuleBuckets::from(partition_modules(&modules, &completions, &enrollments));
        debug!(
            learner = %learner,
            courses = progress.courses.len(),
            overall = progress.overall.percentage,
            "built dashboard"
        );

        Ok(DashboardView {
            progress,
            modules: buckets,
        })
    }

    /// Mark a module finished for the learner and refresh the course enrollment.
    ///
    /// Time spent accumulates onto an existing record. Completing an already
    /// completed module only adds time. The record is stamped no earlier than
    /// the existing record's `completed_at`, so a backend clock running ahead
    /// of ours cannot make the write stale.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::UnknownModule` if the module does not exist.
    /// Returns `ProgressServiceError::NotEnrolled` if the learner is not enrolled.
    /// Returns `ProgressServiceError::ModuleLocked` if its predecessor is unfinished.
    /// Returns `ProgressServiceError::CompletionRejected` if storage kept another record.
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn complete_module(
        &self,
        learner: LearnerId,
        module_id: ModuleId,
        time_spent_minutes: u32,
    ) -> Result<CourseOverview, ProgressServiceError> {
        let module = self.require_module(module_id).await?;
        let course_id = module.course_id;
        let modules = self.modules.list_course_modules(course_id).await?;
        let completions = self.completions.list_completions(learner).await?;
        let enrollment = self
            .enrollments
            .get_enrollment(learner, course_id)
            .await?
            .ok_or(ProgressServiceError::NotEnrolled { course_id })?;

        let status = classify_module(&module, &modules, &completions, Some(&enrollment));
        if !status.is_open() {
            return Err(ProgressServiceError::ModuleLocked { module_id });
        }

        let existing = completions.iter().find(|c| c.module_id == module_id);
        let id = match existing {
            Some(record) => record.id,
            None => self.completions.next_completion_id().await?,
        };
        let total_time = existing
            .map_or(0, |record| record.time_spent_minutes)
            .saturating_add(time_spent_minutes);
        let now = self.clock.now();
        let stamp = existing
            .and_then(|record| record.completed_at)
            .map_or(now, |previous| previous.max(now));
        let record = ModuleCompletion::completed(id, module_id, stamp, total_time);
        let stored_record = self.completions.upsert_completion(learner, &record).await?;
        if stored_record != record {
            warn!(
                learner = %learner,
                module = %module_id,
                "completion write was superseded by a newer record"
            );
            return Err(ProgressServiceError::CompletionRejected { module_id });
        }
        info!(
            learner = %learner,
            module = %module_id,
            course = %course_id,
            minutes = stored_record.time_spent_minutes,
            "module completed"
        );

        let completions = self.completions.list_completions(learner).await?;
        let refreshed = refresh_enrollment(&enrollment, &modules, &completions);
        self.enrollments.upsert_enrollment(learner, &refreshed).await?;
        if aggregate_course_progress(&modules, &completions).is_finished() {
            info!(learner = %learner, course = %course_id, "course finished");
        }

        self.course_overview(learner, course_id).await
    }

    /// Point the learner's enrollment at a module they are opening.
    ///
    /// Opening a completed module leaves the pointer unchanged.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::UnknownModule` if the module does not exist.
    /// Returns `ProgressServiceError::NotEnrolled` if the learner is not enrolled.
    /// Returns `ProgressServiceError::ModuleLocked` if the module is locked.
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn start_module(
        &self,
        learner: LearnerId,
        module_id: ModuleId,
    ) -> Result<CourseOverview, ProgressServiceError> {
        let module = self.require_module(module_id).await?;
        let course_id = module.course_id;
        let enrollment = self
            .enrollments
            .get_enrollment(learner, course_id)
            .await?
            .ok_or(ProgressServiceError::NotEnrolled { course_id })?;
        let modules = self.modules.list_course_modules(course_id).await?;
        let completions = self.completions.list_completions(learner).await?;

        match classify_module(&module, &modules, &completions, Some(&enrollment)) {
            ModuleStatus::Locked => return Err(ProgressServiceError::ModuleLocked { module_id }),
            ModuleStatus::Completed | ModuleStatus::Current => {}
            ModuleStatus::Available => {
                let moved = enrollment.with_current_module(module_id);
                let refreshed = refresh_enrollment(&moved, &modules, &completions);
                self.enrollments.upsert_enrollment(learner, &refreshed).await?;
                debug!(learner = %learner, module = %module_id, "current module moved");
            }
        }

        self.course_overview(learner, course_id).await
    }

    /// Recompute and persist the cached aggregates of an enrollment.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::NotEnrolled` if the learner is not enrolled.
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn refresh_enrollment(
        &self,
        learner: LearnerId,
        course_id: CourseId,
    ) -> Result<CourseEnrollment, ProgressServiceError> {
        let enrollment = self
            .enrollments
            .get_enrollment(learner, course_id)
            .await?
            .ok_or(ProgressServiceError::NotEnrolled { course_id })?;
        let modules = self.modules.list_course_modules(course_id).await?;
        let completions = self.completions.list_completions(learner).await?;

        let refreshed = refresh_enrollment(&enrollment, &modules, &completions);
        if refreshed != enrollment {
            self.enrollments.upsert_enrollment(learner, &refreshed).await?;
        }
        Ok(refreshed)
    }

    async fn require_module(&self, module_id: ModuleId) -> Result<Module, ProgressServiceError> {
        self.modules
            .get_module(module_id)
            .await?
            .ok_or(ProgressServiceError::UnknownModule { module_id })
    }
}

fn build_overview(
    course_id: CourseId,
    modules: &[Module],
    completions: &[ModuleCompletion],
    stored: Option<&CourseEnrollment>,
) -> CourseOverview {
    if let Some(enrollment) = stored {
        if !enrollment_is_consistent(enrollment, modules, completions) {
            warn!(
                course = %course_id,
                stored_percentage = enrollment.progress_percentage,
                stored_completed = enrollment.completed_modules_count,
                stored_total = enrollment.total_modules_count,
                "stored enrollment aggregates are stale; recomputing"
            );
        }
    }

    let enrollment = stored.map(|e| refresh_enrollment(e, modules, completions));
    let views = modules
        .iter()
        .map(|module| ModuleView {
            module: module.clone(),
            status: classify_module(module, modules, completions, enrollment.as_ref()),
        })
        .collect();
    let current_module = match &enrollment {
        Some(e) => e.current_module,
        None => resolve_current_module(modules, completions, None),
    };

    CourseOverview {
        course_id,
        modules: views,
        progress: aggregate_course_progress(modules, completions),
        current_module,
        enrollment,
    }
}
