//! Module-progression state derivation.
//!
//! Every function here is pure: inputs are borrowed immutably, nothing is
//! cached between calls, and identical inputs always produce identical
//! output.
//!
//! # Permissive policy
//!
//! The engine never fails on malformed or partial data. Missing completion
//! records mean "not completed", a missing enrollment means "not locked", and
//! gaps or duplicates in the ordinal sequence unlock the affected module. A
//! wrong badge is preferable to an unrenderable screen. Callers that want to
//! reject bad layouts can run [`check_ordinals`] themselves.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::error::OrdinalError;
use crate::model::{CourseEnrollment, CourseId, Module, ModuleCompletion, ModuleId, ModuleStatus};

//
// ─── OUTPUT TYPES ──────────────────────────────────────────────────────────────
//

/// Completion ratio of a course (or of the whole dashboard).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CourseProgress {
    pub percentage: u8,
    pub completed_count: u32,
    pub total_count: u32,
}

impl CourseProgress {
    /// Build from raw counts, rounding half up and clamping to `0..=100`.
    ///
    /// A `total_count` of zero yields `0` percent.
    #[must_use]
    pub fn from_counts(completed_count: u32, total_count: u32) -> Self {
        let percentage = if total_count == 0 {
            0
        } else {
            let completed = u64::from(completed_count.min(total_count));
            let total = u64::from(total_count);
            let rounded = (completed * 200 + total) / (2 * total);
            u8::try_from(rounded.min(100)).unwrap_or(100)
        };

        Self {
            percentage,
            completed_count,
            total_count,
        }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.total_count > 0 && self.completed_count >= self.total_count
    }
}

/// Modules bucketed by derived status, each bucket in input order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ModulePartition<'a> {
    pub completed: Vec<&'a Module>,
    pub current: Vec<&'a Module>,
    pub available: Vec<&'a Module>,
    pub locked: Vec<&'a Module>,
}

impl<'a> ModulePartition<'a> {
    fn push(&mut self, status: ModuleStatus, module: &'a Module) {
        match status {
            ModuleStatus::Completed => self.completed.push(module),
            ModuleStatus::Current => self.current.push(module),
            ModuleStatus::Available => self.available.push(module),
            ModuleStatus::Locked => self.locked.push(module),
        }
    }

    #[must_use]
    pub fn bucket(&self, status: ModuleStatus) -> &[&'a Module] {
        match status {
            ModuleStatus::Completed => &self.completed,
            ModuleStatus::Current => &self.current,
            ModuleStatus::Available => &self.available,
            ModuleStatus::Locked => &self.locked,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.completed.len() + self.current.len() + self.available.len() + self.locked.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Progress of one enrolled course on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CourseProgressEntry {
    pub course_id: CourseId,
    pub progress: CourseProgress,
}

/// Dashboard-level progress across every enrolled course.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DashboardProgress {
    pub courses: Vec<CourseProgressEntry>,
    /// Completed vs. total modules summed over all enrolled courses.
    pub overall: CourseProgress,
}

//
// ─── INDICES ───────────────────────────────────────────────────────────────────
//

/// Module ids whose completion record is marked completed.
struct CompletionIndex {
    completed: HashSet<ModuleId>,
}

impl CompletionIndex {
    fn new(completions: &[ModuleCompletion]) -> Self {
        Self {
            completed: completions
                .iter()
                .filter(|c| c.is_completed)
                .map(|c| c.module_id)
                .collect(),
        }
    }

    fn is_completed(&self, module_id: ModuleId) -> bool {
        self.completed.contains(&module_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Unique(ModuleId),
    Ambiguous,
}

/// (course, ordinal) -> module occupying that ordinal.
struct OrdinalIndex {
    slots: HashMap<(CourseId, i32), Slot>,
}

impl OrdinalIndex {
    fn new<'a>(modules: impl IntoIterator<Item = &'a Module>) -> Self {
        let mut slots = HashMap::new();
        for module in modules {
            slots
                .entry((module.course_id, module.order))
                .and_modify(|slot| {
                    if *slot != Slot::Unique(module.id) {
                        *slot = Slot::Ambiguous;
                    }
                })
                .or_insert(Slot::Unique(module.id));
        }
        Self { slots }
    }

    fn slot(&self, course_id: CourseId, order: i32) -> Option<Slot> {
        self.slots.get(&(course_id, order)).copied()
    }
}

/// Why a module is or is not gated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gate {
    FirstModule,
    NotEnrolled,
    PredecessorCompleted,
    PredecessorMissing,
    AmbiguousOrdinal,
    Blocked,
}

impl Gate {
    fn is_locked(self) -> bool {
        matches!(self, Gate::Blocked)
    }
}

fn gate(
    module: &Module,
    ordinals: &OrdinalIndex,
    completions: &CompletionIndex,
    enrolled: bool,
) -> Gate {
    if module.is_first() {
        return Gate::FirstModule;
    }
    if !enrolled {
        return Gate::NotEnrolled;
    }
    match ordinals.slot(module.course_id, module.order) {
        Some(Slot::Ambiguous) => return Gate::AmbiguousOrdinal,
        Some(Slot::Unique(id)) if id != module.id => return Gate::AmbiguousOrdinal,
        _ => {}
    }
    let Some(previous) = module.predecessor_order() else {
        return Gate::PredecessorMissing;
    };
    match ordinals.slot(module.course_id, previous) {
        Some(Slot::Unique(id)) if completions.is_completed(id) => Gate::PredecessorCompleted,
        Some(Slot::Unique(_)) => Gate::Blocked,
        Some(Slot::Ambiguous) => Gate::AmbiguousOrdinal,
        None => Gate::PredecessorMissing,
    }
}

fn derive_status(
    module: &Module,
    ordinals: &OrdinalIndex,
    completions: &CompletionIndex,
    enrollment: Option<&CourseEnrollment>,
) -> ModuleStatus {
    if completions.is_completed(module.id) {
        return ModuleStatus::Completed;
    }

    let enrollment = enrollment.filter(|e| e.course_id == module.course_id);
    if enrollment.is_some_and(|e| e.is_current(module.id)) {
        return ModuleStatus::Current;
    }

    if gate(module, ordinals, completions, enrollment.is_some()).is_locked() {
        ModuleStatus::Locked
    } else {
        ModuleStatus::Available
    }
}

fn modules_of(course_modules: &[Module], course_id: CourseId) -> impl Iterator<Item = &Module> {
    course_modules.iter().filter(move |m| m.course_id == course_id)
}

//
// ─── OPERATIONS ────────────────────────────────────────────────────────────────
//

/// Derive the status of `module` for one learner.
///
/// `course_modules` is the module list of the module's course; entries from
/// other courses are ignored. `enrollment` is `None` when the learner is not
/// enrolled; an enrollment for a different course is treated the same way.
///
/// # Examples
///
/// ```
/// # use learn_core::model::{CourseEnrollment, CourseId, EnrollmentId, Module, ModuleId, ModuleStatus};
/// # use learn_core::progression::classify_module;
/// let course = CourseId::new(1);
/// let modules = vec![
///     Module::new(ModuleId::new(1), course, 1, 15),
///     Module::new(ModuleId::new(2), course, 2, 20),
/// ];
/// let enrollment = CourseEnrollment::new(EnrollmentId::new(1), course);
///
/// let status = classify_module(&modules[1], &modules, &[], Some(&enrollment));
/// assert_eq!(status, ModuleStatus::Locked);
/// ```
#[must_use]
pub fn classify_module(
    module: &Module,
    course_modules: &[Module],
    completions: &[ModuleCompletion],
    enrollment: Option<&CourseEnrollment>,
) -> ModuleStatus {
    let ordinals = OrdinalIndex::new(modules_of(course_modules, module.course_id));
    let completions = CompletionIndex::new(completions);
    derive_status(module, &ordinals, &completions, enrollment)
}

/// Completed vs. total modules for one course.
#[must_use]
pub fn aggregate_course_progress(
    course_modules: &[Module],
    completions: &[ModuleCompletion],
) -> CourseProgress {
    let index = CompletionIndex::new(completions);
    let total = course_modules.len();
    let completed = course_modules
        .iter()
        .filter(|m| index.is_completed(m.id))
        .count();

    CourseProgress::from_counts(
        u32::try_from(completed).unwrap_or(u32::MAX),
        u32::try_from(total).unwrap_or(u32::MAX),
    )
}

/// Classify every module, possibly spanning many courses, in one pass.
///
/// Each course's status is derived against the enrollment for that course.
/// If several enrollments name the same course the first one wins.
#[must_use]
pub fn partition_modules<'a>(
    all_modules: &'a [Module],
    completions: &[ModuleCompletion],
    enrollments: &[CourseEnrollment],
) -> ModulePartition<'a> {
    let ordinals = OrdinalIndex::new(all_modules);
    let completion_index = CompletionIndex::new(completions);
    let by_course = index_enrollments(enrollments);

    let mut partition = ModulePartition::default();
    for module in all_modules {
        let enrollment = by_course.get(&module.course_id).copied();
        let status = derive_status(module, &ordinals, &completion_index, enrollment);
        partition.push(status, module);
    }
    partition
}

/// Modules of `course_id`, sorted by ordinal. Equal ordinals keep input order.
#[must_use]
pub fn course_modules(all_modules: &[Module], course_id: CourseId) -> Vec<&Module> {
    let mut modules: Vec<&Module> = modules_of(all_modules, course_id).collect();
    modules.sort_by_key(|m| m.order);
    modules
}

/// The module a learner should land on when opening a course.
///
/// Keeps the enrollment pointer while it names an unfinished module of the
/// course; otherwise picks the first unfinished, unlocked module by ordinal.
/// Returns `None` once every module is completed.
#[must_use]
pub fn resolve_current_module(
    course_modules: &[Module],
    completions: &[ModuleCompletion],
    enrollment: Option<&CourseEnrollment>,
) -> Option<ModuleId> {
    let completion_index = CompletionIndex::new(completions);

    if let Some(pointer) = enrollment.and_then(|e| {
        let pointer = e.current_module?;
        course_modules
            .iter()
            .any(|m| m.id == pointer && m.course_id == e.course_id)
            .then_some(pointer)
    }) {
        if !completion_index.is_completed(pointer) {
            return Some(pointer);
        }
    }

    let course_id = match enrollment {
        Some(e) => e.course_id,
        None => course_modules.first()?.course_id,
    };
    let ordinals = OrdinalIndex::new(modules_of(course_modules, course_id));
    let mut ordered: Vec<&Module> = modules_of(course_modules, course_id).collect();
    ordered.sort_by_key(|m| m.order);

    ordered
        .into_iter()
        .find(|m| {
            derive_status(m, &ordinals, &completion_index, enrollment) == ModuleStatus::Available
        })
        .map(|m| m.id)
}

/// Recompute an enrollment's cached aggregates and current pointer.
///
/// Only modules of the enrollment's course are counted.
#[must_use]
pub fn refresh_enrollment(
    enrollment: &CourseEnrollment,
    course_modules: &[Module],
    completions: &[ModuleCompletion],
) -> CourseEnrollment {
    let own: Vec<Module> = modules_of(course_modules, enrollment.course_id)
        .cloned()
        .collect();
    let progress = aggregate_course_progress(&own, completions);

    CourseEnrollment {
        id: enrollment.id,
        course_id: enrollment.course_id,
        current_module: resolve_current_module(&own, completions, Some(enrollment)),
        progress_percentage: progress.percentage,
        completed_modules_count: progress.completed_count,
        total_modules_count: progress.total_count,
    }
}

/// True when pre-computed aggregates on `enrollment` match a recomputation.
#[must_use]
pub fn enrollment_is_consistent(
    enrollment: &CourseEnrollment,
    course_modules: &[Module],
    completions: &[ModuleCompletion],
) -> bool {
    let fresh = refresh_enrollment(enrollment, course_modules, completions);
    fresh.progress_percentage == enrollment.progress_percentage
        && fresh.completed_modules_count == enrollment.completed_modules_count
        && fresh.total_modules_count == enrollment.total_modules_count
}

/// Per-course and overall progress for every enrolled course.
///
/// Courses appear in enrollment order; repeated enrollments for the same
/// course are counted once.
#[must_use]
pub fn aggregate_dashboard_progress(
    all_modules: &[Module],
    completions: &[ModuleCompletion],
    enrollments: &[CourseEnrollment],
) -> DashboardProgress {
    let mut seen = HashSet::new();
    let mut courses = Vec::new();
    let mut completed = 0_u32;
    let mut total = 0_u32;

    for enrollment in enrollments {
        if !seen.insert(enrollment.course_id) {
            continue;
        }
        let own: Vec<Module> = modules_of(all_modules, enrollment.course_id)
            .cloned()
            .collect();
        let progress = aggregate_course_progress(&own, completions);
        completed = completed.saturating_add(progress.completed_count);
        total = total.saturating_add(progress.total_count);
        courses.push(CourseProgressEntry {
            course_id: enrollment.course_id,
            progress,
        });
    }

    DashboardProgress {
        courses,
        overall: CourseProgress::from_counts(completed, total),
    }
}

/// Strict validation of a course layout.
///
/// # Errors
///
/// Returns the first `OrdinalError` found: a non-positive ordinal, or two
/// modules of the same course sharing an ordinal.
pub fn check_ordinals(course_modules: &[Module]) -> Result<(), OrdinalError> {
    let mut seen: HashMap<(CourseId, i32), ModuleId> = HashMap::new();
    for module in course_modules {
        if module.order < 1 {
            return Err(OrdinalError::NonPositive {
                course_id: module.course_id,
                module_id: module.id,
                order: module.order,
            });
        }
        if let Some(first) = seen.insert((module.course_id, module.order), module.id) {
            return Err(OrdinalError::Duplicate {
                course_id: module.course_id,
                order: module.order,
                first,
                second: module.id,
            });
        }
    }
    Ok(())
}

fn index_enrollments(enrollments: &[CourseEnrollment]) -> HashMap<CourseId, &CourseEnrollment> {
    let mut by_course = HashMap::with_capacity(enrollments.len());
    for enrollment in enrollments {
        by_course.entry(enrollment.course_id).or_insert(enrollment);
    }
    by_course
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
