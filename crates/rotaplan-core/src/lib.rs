//! # rotaplan-core
//!
//! Core domain model for the rotaplan physician scheduling engine.
//!
//! This crate provides:
//! - Domain types: `Physician`, `TaskCategory`, `Task`, `LinkageManager`, `Calendar`
//! - Registries: `TaskRegistry`, `PhysicianRoster` (with the availability oracle)
//! - The `Schedule` result artifact and its reporting helpers
//! - Error types shared across the workspace
//!
//! ## Example
//!
//! ```rust
//! use rotaplan_core::{DaysParameter, Task, TaskCategory, TaskRegistry, TaskType};
//!
//! let mut registry = TaskRegistry::new();
//! registry
//!     .add_category(TaskCategory::new("CTU", DaysParameter::MultiWeek, 2, 2000.0, 4000.0))
//!     .unwrap();
//! registry.add_task(Task::new("CTU", TaskType::Main, "CTU_A").heaviness(4)).unwrap();
//! registry.add_task(Task::new("CTU", TaskType::Call, "CTU_A_CALL").optional()).unwrap();
//! registry.link_tasks("CTU_A", "CTU_A_CALL").unwrap();
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

pub mod calendar;
pub mod holidays;

pub use calendar::{Calendar, PeriodInterval, WeekPeriods};
pub use holidays::region_holidays;

// ============================================================================
// Type Aliases
// ============================================================================

/// Name of a task ("CTU_A", "ER_CALL", ...)
pub type TaskName = String;

/// Name of a task category ("CTU", "ER", ...)
pub type CategoryName = String;

/// Full physician name ("First Last")
pub type PhysicianName = String;

// ============================================================================
// Task Model
// ============================================================================

/// Whether a task covers working days or call days.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskType {
    Main,
    Call,
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskType::Main => write!(f, "Main"),
            TaskType::Call => write!(f, "Call"),
        }
    }
}

/// How the days of a category's tasks may be laid out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DaysParameter {
    Discontinuous,
    Continuous,
    #[serde(rename = "Multi-week")]
    MultiWeek,
}

/// A category of tasks with shared billing and layout properties.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskCategory {
    pub name: CategoryName,
    pub days_parameter: DaysParameter,
    /// Number of consecutive weeks a physician must hold a Main task of
    /// this category. Must be 1 unless `days_parameter` is `MultiWeek`.
    pub number_of_weeks: u32,
    pub weekday_revenue: f64,
    pub call_revenue: f64,
    /// Restricted categories are only open to explicitly cleared physicians.
    pub restricted: bool,
}

impl TaskCategory {
    pub fn new(
        name: impl Into<String>,
        days_parameter: DaysParameter,
        number_of_weeks: u32,
        weekday_revenue: f64,
        call_revenue: f64,
    ) -> Self {
        Self {
            name: name.into(),
            days_parameter,
            number_of_weeks,
            weekday_revenue,
            call_revenue,
            restricted: false,
        }
    }

    /// Mark the category as restricted
    pub fn restricted(mut self) -> Self {
        self.restricted = true;
        self
    }
}

/// An individual schedulable task, referring to its category by name.
///
/// The category is an arena key into [`TaskRegistry`], not an owned value,
/// so tasks serialize flat and never form reference cycles.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub category: CategoryName,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub name: TaskName,
    pub week_offset: i32,
    /// Difficulty on a 0-5 scale; 3 and above counts as heavy.
    pub heaviness: u8,
    pub mandatory: bool,
}

impl Task {
    pub fn new(category: impl Into<String>, task_type: TaskType, name: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            task_type,
            name: name.into(),
            week_offset: 0,
            heaviness: 0,
            mandatory: true,
        }
    }

    /// Set the week offset
    pub fn week_offset(mut self, offset: i32) -> Self {
        self.week_offset = offset;
        self
    }

    /// Set the heaviness (0-5)
    pub fn heaviness(mut self, heaviness: u8) -> Self {
        self.heaviness = heaviness;
        self
    }

    /// Mark the task as optional (non-mandatory)
    pub fn optional(mut self) -> Self {
        self.mandatory = false;
        self
    }

    /// Call tasks always span a single week; Main tasks span their
    /// category's `number_of_weeks`.
    pub fn number_of_weeks(&self, category: &TaskCategory) -> u32 {
        match self.task_type {
            TaskType::Call => 1,
            TaskType::Main => category.number_of_weeks,
        }
    }

    pub fn revenue(&self, category: &TaskCategory) -> f64 {
        match self.task_type {
            TaskType::Main => category.weekday_revenue,
            TaskType::Call => category.call_revenue,
        }
    }

    pub fn is_heavy(&self) -> bool {
        self.heaviness >= 3
    }

    pub fn is_call(&self) -> bool {
        self.task_type == TaskType::Call
    }

    pub fn is_discontinuous(&self, category: &TaskCategory) -> bool {
        category.days_parameter == DaysParameter::Discontinuous
    }
}

// ============================================================================
// Linkage
// ============================================================================

/// Main -> Call task association.
///
/// Each Main task links to at most one Call task; several Main tasks may
/// share a Call task. The insertion check makes Call -> Main or
/// Main -> Main edges unrepresentable, so the relation is acyclic.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkageManager {
    links: BTreeMap<TaskName, TaskName>,
}

impl LinkageManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn link(&mut self, main_task: &Task, call_task: &Task) -> Result<(), ConfigError> {
        if main_task.task_type != TaskType::Main || call_task.task_type != TaskType::Call {
            return Err(ConfigError::InvalidConfig(format!(
                "invalid linkage {} -> {}: Main tasks must link to Call tasks",
                main_task.name, call_task.name
            )));
        }
        self.links.insert(main_task.name.clone(), call_task.name.clone());
        Ok(())
    }

    pub fn unlink(&mut self, main_task_name: &str) {
        self.links.remove(main_task_name);
    }

    /// The linked Call task for a Main task, if any.
    pub fn linked_call(&self, main_task_name: &str) -> Option<&str> {
        self.links.get(main_task_name).map(String::as_str)
    }

    /// Drop every edge touching the given task, as key or value.
    pub fn remove_task(&mut self, task_name: &str) {
        self.links.remove(task_name);
        self.links.retain(|_, call| call != task_name);
    }

    /// True if any Main task links to this Call task.
    pub fn is_linked_call(&self, call_task_name: &str) -> bool {
        self.links.values().any(|c| c == call_task_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.links.iter().map(|(m, c)| (m.as_str(), c.as_str()))
    }
}

// ============================================================================
// Task Registry
// ============================================================================

/// Owns categories (arena keyed by name), tasks in insertion order, and the
/// linkage relation between them.
#[derive(Clone, Debug, Default)]
pub struct TaskRegistry {
    categories: BTreeMap<CategoryName, TaskCategory>,
    tasks: Vec<Task>,
    linkage: LinkageManager,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_category(&mut self, category: TaskCategory) -> Result<(), ConfigError> {
        if category.number_of_weeks == 0 {
            return Err(ConfigError::InvalidConfig(format!(
                "category {}: number_of_weeks must be at least 1",
                category.name
            )));
        }
        if category.number_of_weeks != 1 && category.days_parameter != DaysParameter::MultiWeek {
            return Err(ConfigError::InvalidConfig(format!(
                "category {}: number_of_weeks > 1 requires the Multi-week days parameter",
                category.name
            )));
        }
        self.categories.insert(category.name.clone(), category);
        Ok(())
    }

    pub fn add_task(&mut self, task: Task) -> Result<(), ConfigError> {
        if !self.categories.contains_key(&task.category) {
            return Err(ConfigError::InvalidConfig(format!(
                "task {}: unknown category {}",
                task.name, task.category
            )));
        }
        if task.heaviness > 5 {
            return Err(ConfigError::InvalidConfig(format!(
                "task {}: heaviness {} exceeds the 0-5 scale",
                task.name, task.heaviness
            )));
        }
        self.tasks.push(task);
        Ok(())
    }

    pub fn link_tasks(&mut self, main_task_name: &str, call_task_name: &str) -> Result<(), ConfigError> {
        let main_task = self
            .get_task(main_task_name)
            .ok_or_else(|| ConfigError::InvalidConfig(format!("unknown task {main_task_name}")))?
            .clone();
        let call_task = self
            .get_task(call_task_name)
            .ok_or_else(|| ConfigError::InvalidConfig(format!("unknown task {call_task_name}")))?
            .clone();
        self.linkage.link(&main_task, &call_task)
    }

    pub fn get_task(&self, name: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.name == name)
    }

    pub fn category(&self, name: &str) -> Option<&TaskCategory> {
        self.categories.get(name)
    }

    /// The category a task belongs to. Tasks are only accepted with a known
    /// category, so this resolves for every registered task.
    pub fn category_of(&self, task: &Task) -> &TaskCategory {
        &self.categories[&task.category]
    }

    /// Tasks in insertion order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn categories(&self) -> impl Iterator<Item = &TaskCategory> {
        self.categories.values()
    }

    pub fn category_names(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    pub fn linkage(&self) -> &LinkageManager {
        &self.linkage
    }

    pub fn linkage_mut(&mut self) -> &mut LinkageManager {
        &mut self.linkage
    }

    pub fn task_weeks(&self, task: &Task) -> u32 {
        task.number_of_weeks(self.category_of(task))
    }

    /// Longest task span in weeks, used to extend the scheduling horizon.
    pub fn max_task_weeks(&self) -> u32 {
        self.tasks.iter().map(|t| self.task_weeks(t)).max().unwrap_or(1)
    }
}

// ============================================================================
// Physician
// ============================================================================

/// Desired working-weeks fractions a physician may declare.
pub const ALLOWED_WORKING_WEEKS: [f64; 5] = [0.0, 0.25, 0.5, 0.75, 1.0];

/// A physician profile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Physician {
    pub first_name: String,
    pub last_name: String,
    /// "First Last", the identity used throughout the engine.
    pub name: PhysicianName,
    /// Assigned by the roster; unique across physicians.
    pub initials: String,
    /// At most three, kept in preference order.
    pub preferred_tasks: Vec<String>,
    pub discontinuity_preference: bool,
    /// Fraction of the year the physician wants to work, one of
    /// [`ALLOWED_WORKING_WEEKS`].
    pub desired_working_weeks: f64,
    pub restricted_tasks: Vec<String>,
    pub exclusion_tasks: Vec<String>,
}

impl Physician {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        preferred_tasks: Vec<String>,
        discontinuity_preference: bool,
        desired_working_weeks: f64,
        restricted_tasks: Vec<String>,
        exclusion_tasks: Vec<String>,
    ) -> Result<Self, ConfigError> {
        if !ALLOWED_WORKING_WEEKS.contains(&desired_working_weeks) {
            return Err(ConfigError::InvalidConfig(format!(
                "invalid desired working weeks {desired_working_weeks}: must be one of {ALLOWED_WORKING_WEEKS:?}"
            )));
        }
        let first_name = first_name.into();
        let last_name = last_name.into();
        let name = format!("{first_name} {last_name}");
        let mut preferred_tasks = preferred_tasks;
        preferred_tasks.truncate(3);
        Ok(Self {
            first_name,
            last_name,
            name,
            initials: String::new(),
            preferred_tasks,
            discontinuity_preference,
            desired_working_weeks,
            restricted_tasks,
            exclusion_tasks,
        })
    }
}

/// One entry in a physician's unavailability list: a single day or a
/// closed date range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Unavailability {
    Day(NaiveDate),
    Range(NaiveDate, NaiveDate),
}

impl Unavailability {
    pub fn contains(&self, day: NaiveDate) -> bool {
        match *self {
            Unavailability::Day(d) => day == d,
            Unavailability::Range(start, end) => start <= day && day <= end,
        }
    }
}

// ============================================================================
// Physician Roster
// ============================================================================

/// Insertion-ordered physician set with unique initials and the
/// unavailability oracle.
#[derive(Clone, Debug, Default)]
pub struct PhysicianRoster {
    physicians: Vec<Physician>,
    unavailability: HashMap<PhysicianName, Vec<Unavailability>>,
}

impl PhysicianRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a physician, validating task preferences against the
    /// category arena and deriving unique initials.
    pub fn add_physician(
        &mut self,
        mut physician: Physician,
        registry: &TaskRegistry,
    ) -> Result<(), ConfigError> {
        Self::validate_task_names(&physician.preferred_tasks, registry, "preferred")?;
        Self::validate_task_names(&physician.restricted_tasks, registry, "restricted")?;
        Self::validate_task_names(&physician.exclusion_tasks, registry, "exclusion")?;
        physician.initials = self.derive_initials(&physician);
        self.unavailability.entry(physician.name.clone()).or_default();
        self.physicians.push(physician);
        Ok(())
    }

    fn validate_task_names(
        names: &[String],
        registry: &TaskRegistry,
        kind: &str,
    ) -> Result<(), ConfigError> {
        let invalid: Vec<&String> = names
            .iter()
            .filter(|n| registry.category(n).is_none())
            .collect();
        if invalid.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::InvalidConfig(format!(
                "invalid {kind} tasks: {invalid:?}"
            )))
        }
    }

    // First letter of each name; on a clash, first two letters of the
    // given name plus the family initial.
    fn derive_initials(&self, physician: &Physician) -> String {
        let first: String = physician.first_name.chars().take(1).collect();
        let last: String = physician.last_name.chars().take(1).collect();
        let initials = format!("{first}{last}");
        if self.physicians.iter().any(|p| p.initials == initials) {
            let first_two: String = physician.first_name.chars().take(2).collect();
            format!("{first_two}{last}")
        } else {
            initials
        }
    }

    pub fn get(&self, name: &str) -> Option<&Physician> {
        self.physicians.iter().find(|p| p.name == name)
    }

    /// Physicians in insertion order.
    pub fn physicians(&self) -> &[Physician] {
        &self.physicians
    }

    /// Physician names in insertion order.
    pub fn names(&self) -> Vec<PhysicianName> {
        self.physicians.iter().map(|p| p.name.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.physicians.is_empty()
    }

    /// Replace the whole unavailability table. Every key must name a
    /// registered physician.
    pub fn set_unavailability(
        &mut self,
        table: HashMap<PhysicianName, Vec<Unavailability>>,
    ) -> Result<(), ConfigError> {
        for name in table.keys() {
            if self.get(name).is_none() {
                return Err(ConfigError::UnknownPhysician(name.clone()));
            }
        }
        self.unavailability = table;
        Ok(())
    }

    pub fn add_unavailability(
        &mut self,
        first_name: &str,
        last_name: &str,
        period: Unavailability,
    ) -> Result<(), ConfigError> {
        let name = format!("{first_name} {last_name}");
        if self.get(&name).is_none() {
            return Err(ConfigError::UnknownPhysician(name));
        }
        if let Unavailability::Range(start, end) = period {
            if start > end {
                return Err(ConfigError::InvalidPeriod(format!(
                    "{name}: range {start} .. {end} is reversed"
                )));
            }
        }
        self.unavailability.entry(name).or_default().push(period);
        Ok(())
    }

    /// The availability oracle: true iff any unavailability entry of the
    /// physician contains the day. Unknown names are never unavailable.
    pub fn is_unavailable(&self, name: &str, day: NaiveDate) -> bool {
        self.unavailability
            .get(name)
            .is_some_and(|periods| periods.iter().any(|p| p.contains(day)))
    }

    pub fn unavailability_of(&self, name: &str) -> &[Unavailability] {
        self.unavailability.get(name).map_or(&[], Vec::as_slice)
    }

    /// Physicians available on every one of the given days, in insertion
    /// order.
    pub fn available_physicians(&self, days: &[NaiveDate]) -> Vec<PhysicianName> {
        self.physicians
            .iter()
            .filter(|p| days.iter().all(|&d| !self.is_unavailable(&p.name, d)))
            .map(|p| p.name.clone())
            .collect()
    }
}

// ============================================================================
// Schedule (Result)
// ============================================================================

/// One solved (physician, task, interval) tuple.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub task: TaskName,
    pub days: Vec<NaiveDate>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub score: f64,
}

/// Per-physician workload summary derived from a schedule.
#[derive(Clone, Debug, PartialEq)]
pub struct PhysicianStatistics {
    pub task_counts: BTreeMap<TaskName, usize>,
    pub total_working_days: i64,
    pub working_weeks: f64,
    pub desired_weeks_met: bool,
}

/// The assignment map produced by a solve, keyed by physician name.
///
/// The engine owns exactly one schedule and replaces it atomically on a
/// successful solve; an infeasible solve leaves the prior schedule intact.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schedule {
    by_physician: BTreeMap<PhysicianName, Vec<Assignment>>,
}

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, physician: impl Into<String>, assignment: Assignment) {
        self.by_physician.entry(physician.into()).or_default().push(assignment);
    }

    pub fn assignments_of(&self, physician: &str) -> &[Assignment] {
        self.by_physician.get(physician).map_or(&[], Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PhysicianName, &Vec<Assignment>)> {
        self.by_physician.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.by_physician.values().all(Vec::is_empty)
    }

    /// Total number of assignments across all physicians.
    pub fn len(&self) -> usize {
        self.by_physician.values().map(Vec::len).sum()
    }

    /// Overlapping assignments held by one physician, as human-readable
    /// descriptions. A correct solve produces none.
    pub fn conflicts(&self) -> Vec<String> {
        let mut conflicts = Vec::new();
        for (physician, assignments) in &self.by_physician {
            let mut sorted: Vec<&Assignment> = assignments.iter().collect();
            sorted.sort_by_key(|a| a.start_date);
            for pair in sorted.windows(2) {
                if pair[0].end_date >= pair[1].start_date {
                    conflicts.push(format!(
                        "Conflict for {physician}: {} and {} overlap",
                        pair[0].task, pair[1].task
                    ));
                }
            }
        }
        conflicts
    }

    /// Workload summary per physician.
    pub fn statistics(&self, roster: &PhysicianRoster) -> BTreeMap<PhysicianName, PhysicianStatistics> {
        let mut stats = BTreeMap::new();
        for (physician, assignments) in &self.by_physician {
            let mut task_counts: BTreeMap<TaskName, usize> = BTreeMap::new();
            let mut total_days = 0i64;
            for assignment in assignments {
                *task_counts.entry(assignment.task.clone()).or_default() += 1;
                total_days += (assignment.end_date - assignment.start_date).num_days() + 1;
            }
            let working_weeks = total_days as f64 / 7.0;
            let desired_weeks_met = roster
                .get(physician)
                .is_some_and(|p| working_weeks >= p.desired_working_weeks * 52.0);
            stats.insert(
                physician.clone(),
                PhysicianStatistics {
                    task_counts,
                    total_working_days: total_days,
                    working_weeks,
                    desired_weeks_met,
                },
            );
        }
        stats
    }

    /// Registered tasks that appear nowhere in the schedule.
    pub fn unassigned_tasks(&self, registry: &TaskRegistry) -> Vec<TaskName> {
        registry
            .tasks()
            .iter()
            .map(|t| t.name.clone())
            .filter(|name| {
                !self
                    .by_physician
                    .values()
                    .flatten()
                    .any(|a| a.task == *name)
            })
            .collect()
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Configuration-time error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("physician not registered: {0}")]
    UnknownPhysician(String),

    #[error("invalid unavailability period: {0}")]
    InvalidPeriod(String),
}

/// Calendar construction error
#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("unsupported region: {0}")]
    UnsupportedRegion(String),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn registry() -> TaskRegistry {
        let mut registry = TaskRegistry::new();
        registry
            .add_category(TaskCategory::new("CTU", DaysParameter::MultiWeek, 2, 2000.0, 4000.0))
            .unwrap();
        registry
            .add_category(TaskCategory::new("ER", DaysParameter::Continuous, 1, 2500.0, 5000.0).restricted())
            .unwrap();
        registry.add_task(Task::new("CTU", TaskType::Main, "CTU_A").heaviness(4)).unwrap();
        registry
            .add_task(Task::new("CTU", TaskType::Call, "CTU_A_CALL").heaviness(5).optional())
            .unwrap();
        registry.add_task(Task::new("ER", TaskType::Main, "ER_1").heaviness(5)).unwrap();
        registry
    }

    #[test]
    fn category_weeks_requires_multi_week() {
        let mut r = TaskRegistry::new();
        let err = r.add_category(TaskCategory::new("X", DaysParameter::Continuous, 2, 0.0, 0.0));
        assert!(matches!(err, Err(ConfigError::InvalidConfig(_))));

        let err = r.add_category(TaskCategory::new("X", DaysParameter::MultiWeek, 0, 0.0, 0.0));
        assert!(matches!(err, Err(ConfigError::InvalidConfig(_))));
    }

    #[test]
    fn task_requires_known_category() {
        let mut r = TaskRegistry::new();
        let err = r.add_task(Task::new("Nope", TaskType::Main, "X"));
        assert!(matches!(err, Err(ConfigError::InvalidConfig(_))));
    }

    #[test]
    fn call_tasks_span_one_week() {
        let r = registry();
        let call = r.get_task("CTU_A_CALL").unwrap();
        let main = r.get_task("CTU_A").unwrap();
        assert_eq!(r.task_weeks(call), 1);
        assert_eq!(r.task_weeks(main), 2);
        assert_eq!(r.max_task_weeks(), 2);
    }

    #[test]
    fn task_revenue_follows_type() {
        let r = registry();
        let main = r.get_task("CTU_A").unwrap();
        let call = r.get_task("CTU_A_CALL").unwrap();
        assert_eq!(main.revenue(r.category_of(main)), 2000.0);
        assert_eq!(call.revenue(r.category_of(call)), 4000.0);
    }

    #[test]
    fn linkage_rejects_wrong_direction() {
        let mut r = registry();
        assert!(r.link_tasks("CTU_A", "CTU_A_CALL").is_ok());
        // Call -> Main is structurally invalid
        let err = r.link_tasks("CTU_A_CALL", "CTU_A");
        assert!(matches!(err, Err(ConfigError::InvalidConfig(_))));
        // Main -> Main likewise
        let err = r.link_tasks("CTU_A", "ER_1");
        assert!(matches!(err, Err(ConfigError::InvalidConfig(_))));
    }

    #[test]
    fn linkage_shared_call_and_removal() {
        let mut r = registry();
        r.add_task(Task::new("CTU", TaskType::Main, "CTU_B").week_offset(1)).unwrap();
        r.link_tasks("CTU_A", "CTU_A_CALL").unwrap();
        r.link_tasks("CTU_B", "CTU_A_CALL").unwrap();

        assert_eq!(r.linkage().linked_call("CTU_A"), Some("CTU_A_CALL"));
        assert_eq!(r.linkage().linked_call("CTU_B"), Some("CTU_A_CALL"));
        assert!(r.linkage().is_linked_call("CTU_A_CALL"));

        r.linkage_mut().remove_task("CTU_A_CALL");
        assert_eq!(r.linkage().linked_call("CTU_A"), None);
        assert_eq!(r.linkage().linked_call("CTU_B"), None);
    }

    #[test]
    fn physician_rejects_bad_working_weeks() {
        let err = Physician::new("John", "Doe", vec![], false, 0.6, vec![], vec![]);
        assert!(matches!(err, Err(ConfigError::InvalidConfig(_))));
    }

    #[test]
    fn physician_preferred_tasks_capped_at_three() {
        let p = Physician::new(
            "John",
            "Doe",
            vec!["A".into(), "B".into(), "C".into(), "D".into()],
            false,
            1.0,
            vec![],
            vec![],
        )
        .unwrap();
        assert_eq!(p.preferred_tasks, vec!["A", "B", "C"]);
    }

    #[test]
    fn roster_validates_task_names() {
        let r = registry();
        let mut roster = PhysicianRoster::new();
        let p = Physician::new("John", "Doe", vec!["Cardio".into()], false, 1.0, vec![], vec![]).unwrap();
        let err = roster.add_physician(p, &r);
        assert!(matches!(err, Err(ConfigError::InvalidConfig(_))));
    }

    #[test]
    fn roster_assigns_unique_initials() {
        let r = registry();
        let mut roster = PhysicianRoster::new();
        roster
            .add_physician(
                Physician::new("John", "Doe", vec!["CTU".into()], false, 1.0, vec![], vec![]).unwrap(),
                &r,
            )
            .unwrap();
        roster
            .add_physician(
                Physician::new("Jane", "Dorval", vec!["ER".into()], false, 0.75, vec![], vec![]).unwrap(),
                &r,
            )
            .unwrap();

        assert_eq!(roster.get("John Doe").unwrap().initials, "JD");
        assert_eq!(roster.get("Jane Dorval").unwrap().initials, "JaD");
    }

    #[test]
    fn unavailability_oracle() {
        let r = registry();
        let mut roster = PhysicianRoster::new();
        roster
            .add_physician(
                Physician::new("John", "Doe", vec![], false, 1.0, vec![], vec![]).unwrap(),
                &r,
            )
            .unwrap();

        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
        roster
            .add_unavailability("John", "Doe", Unavailability::Range(d(2023, 1, 9), d(2023, 1, 22)))
            .unwrap();
        roster.add_unavailability("John", "Doe", Unavailability::Day(d(2023, 2, 1))).unwrap();

        assert!(roster.is_unavailable("John Doe", d(2023, 1, 9)));
        assert!(roster.is_unavailable("John Doe", d(2023, 1, 15)));
        assert!(roster.is_unavailable("John Doe", d(2023, 1, 22)));
        assert!(!roster.is_unavailable("John Doe", d(2023, 1, 23)));
        assert!(roster.is_unavailable("John Doe", d(2023, 2, 1)));
        assert!(!roster.is_unavailable("Jane Smith", d(2023, 1, 15)));
    }

    #[test]
    fn unavailability_unknown_physician() {
        let mut roster = PhysicianRoster::new();
        let d = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let err = roster.add_unavailability("Ghost", "Writer", Unavailability::Day(d));
        assert!(matches!(err, Err(ConfigError::UnknownPhysician(_))));
    }

    #[test]
    fn unavailability_reversed_range() {
        let r = registry();
        let mut roster = PhysicianRoster::new();
        roster
            .add_physician(
                Physician::new("John", "Doe", vec![], false, 1.0, vec![], vec![]).unwrap(),
                &r,
            )
            .unwrap();
        let d = |day| NaiveDate::from_ymd_opt(2023, 1, day).unwrap();
        let err = roster.add_unavailability("John", "Doe", Unavailability::Range(d(9), d(2)));
        assert!(matches!(err, Err(ConfigError::InvalidPeriod(_))));
    }

    #[test]
    fn available_physicians_filters_by_all_days() {
        let r = registry();
        let mut roster = PhysicianRoster::new();
        for (first, last) in [("John", "Doe"), ("Jane", "Smith")] {
            roster
                .add_physician(
                    Physician::new(first, last, vec![], false, 1.0, vec![], vec![]).unwrap(),
                    &r,
                )
                .unwrap();
        }
        let d = |day| NaiveDate::from_ymd_opt(2023, 1, day).unwrap();
        roster.add_unavailability("John", "Doe", Unavailability::Day(d(4))).unwrap();

        assert_eq!(roster.available_physicians(&[d(2), d(3)]), vec!["John Doe", "Jane Smith"]);
        assert_eq!(roster.available_physicians(&[d(3), d(4)]), vec!["Jane Smith"]);
    }

    #[test]
    fn schedule_conflict_detection() {
        let d = |day| NaiveDate::from_ymd_opt(2023, 1, day).unwrap();
        let mut schedule = Schedule::new();
        schedule.add(
            "John Doe",
            Assignment {
                task: "CTU_A".into(),
                days: vec![d(2), d(3)],
                start_date: d(2),
                end_date: d(3),
                score: 0.0,
            },
        );
        schedule.add(
            "John Doe",
            Assignment {
                task: "ER_1".into(),
                days: vec![d(3), d(4)],
                start_date: d(3),
                end_date: d(4),
                score: 0.0,
            },
        );
        let conflicts = schedule.conflicts();
        assert_eq!(conflicts.len(), 1);
        assert!(conflicts[0].contains("CTU_A"));
        assert!(conflicts[0].contains("ER_1"));
    }

    #[test]
    fn schedule_statistics_and_unassigned() {
        let r = registry();
        let mut roster = PhysicianRoster::new();
        roster
            .add_physician(
                Physician::new("John", "Doe", vec![], false, 0.25, vec![], vec![]).unwrap(),
                &r,
            )
            .unwrap();

        let d = |day| NaiveDate::from_ymd_opt(2023, 1, day).unwrap();
        let mut schedule = Schedule::new();
        schedule.add(
            "John Doe",
            Assignment {
                task: "CTU_A".into(),
                days: (2..=6).map(d).collect(),
                start_date: d(2),
                end_date: d(6),
                score: 10.0,
            },
        );

        let stats = schedule.statistics(&roster);
        let s = &stats["John Doe"];
        assert_eq!(s.task_counts["CTU_A"], 1);
        assert_eq!(s.total_working_days, 5);
        assert!(!s.desired_weeks_met);

        let unassigned = schedule.unassigned_tasks(&r);
        assert_eq!(unassigned, vec!["CTU_A_CALL".to_string(), "ER_1".to_string()]);
    }
}
