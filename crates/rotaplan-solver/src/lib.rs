//! # rotaplan-solver
//!
//! CP-SAT scheduling engine: materializes calendar periods into decision
//! intervals, builds the boolean assignment model, and drives the
//! constraint solver.
//!
//! The control flow of one solve is linear: segment the calendar, filter
//! the relevant weeks, materialize [`MathTask`]s, build the constraint
//! model, solve, extract the assignment. An infeasible solve is a
//! non-fatal status; the previously held schedule stays in place.
//!
//! ## Example
//!
//! ```rust,no_run
//! use chrono::NaiveDate;
//! use rotaplan_core::{Calendar, PhysicianRoster, TaskRegistry};
//! use rotaplan_solver::{ScheduleEngine, SolveOptions};
//!
//! let registry = TaskRegistry::new();
//! let roster = PhysicianRoster::new();
//! let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
//! let end = NaiveDate::from_ymd_opt(2023, 1, 30).unwrap();
//! let calendar = Calendar::with_holidays(start, end, "Canada/QC", []);
//!
//! let mut engine = ScheduleEngine::new(registry, roster, calendar);
//! engine.set_scheduling_period(start, end);
//! let status = engine.generate_schedule(&SolveOptions::default()).unwrap();
//! println!("solved: {status:?}, {} assignments", engine.schedule().len());
//! ```

use chrono::{Days, NaiveDate};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use rotaplan_core::{Assignment, Calendar, PhysicianRoster, Schedule, TaskRegistry, WeekPeriods};

pub mod mathtask;
pub mod objective;

mod model;

pub use mathtask::{MathTask, MathTaskIndex};
pub use objective::{ScoreContext, HINT_STABILITY_BONUS, SCORE_QUANTIZATION};

use model::{CpOutcome, ModelInput, VarKey};
use objective::quantize;

/// Engine error
#[derive(Debug, Error)]
pub enum SolveError {
    #[error("task category {0} uses the Discontinuous days parameter, which the engine does not support")]
    UnsupportedCategory(String),

    #[error("scheduling period must be set before generating a schedule")]
    SchedulingPeriodUnset,

    #[error("the initial schedule does not correspond to the problem: {0}")]
    InconsistentLoadedSchedule(String),
}

/// Outcome of a solve. `Infeasible` is non-fatal: the engine keeps the
/// prior schedule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolveStatus {
    /// Proven optimal assignment.
    Optimal,
    /// Feasible assignment; optimality not proven within the time budget.
    Feasible,
    /// No assignment found (including solver timeouts with no solution).
    Infeasible,
}

/// Per-solve options.
#[derive(Clone, Debug)]
pub struct SolveOptions {
    /// Warm-start from the currently held schedule.
    pub use_initial_schedule: bool,
    /// Wall-clock budget handed to the CP backend.
    pub time_limit: Duration,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            use_initial_schedule: false,
            time_limit: Duration::from_secs(30),
        }
    }
}

/// The scheduling engine: owns the problem description and the current
/// schedule, and runs one CP solve per [`generate_schedule`] call.
///
/// [`generate_schedule`]: ScheduleEngine::generate_schedule
pub struct ScheduleEngine {
    registry: TaskRegistry,
    roster: PhysicianRoster,
    calendar: Calendar,
    scheduling_period: Option<(NaiveDate, NaiveDate)>,
    schedule: Schedule,
}

impl ScheduleEngine {
    pub fn new(registry: TaskRegistry, roster: PhysicianRoster, calendar: Calendar) -> Self {
        Self {
            registry,
            roster,
            calendar,
            scheduling_period: None,
            schedule: Schedule::new(),
        }
    }

    pub fn set_scheduling_period(&mut self, start_date: NaiveDate, end_date: NaiveDate) {
        self.scheduling_period = Some((start_date, end_date));
        debug!(%start_date, %end_date, "scheduling period set");
    }

    pub fn scheduling_period(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.scheduling_period
    }

    /// Install a previously produced schedule, e.g. one loaded from disk.
    /// It becomes the prior schedule for scoring and warm starts.
    pub fn set_schedule(&mut self, schedule: Schedule) {
        self.schedule = schedule;
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn roster(&self) -> &PhysicianRoster {
        &self.roster
    }

    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    /// Build and solve the assignment model.
    ///
    /// On `Optimal` or `Feasible` the extracted assignment replaces the
    /// held schedule atomically; on `Infeasible` the prior schedule is
    /// left untouched.
    pub fn generate_schedule(&mut self, options: &SolveOptions) -> Result<SolveStatus, SolveError> {
        let (_, end_date) = self.scheduling_period.ok_or(SolveError::SchedulingPeriodUnset)?;
        if options.use_initial_schedule && self.schedule.is_empty() {
            return Err(SolveError::InconsistentLoadedSchedule(
                "no initial schedule was provided to start the search".into(),
            ));
        }

        // Multi-week tasks may run past the requested end; extend the
        // horizon by the longest task span so their bundles stay whole.
        let extended_end = end_date + Days::new(7 * u64::from(self.registry.max_task_weeks()));
        debug!(%extended_end, "scheduling horizon extended");

        let periods: WeekPeriods = self
            .calendar
            .determine_periods()
            .into_iter()
            .filter(|(week_start, _)| *week_start <= extended_end)
            .collect();
        let index = MathTaskIndex::build(&periods, &self.registry, &self.roster)?;
        info!(weeks = periods.len(), intervals = index.len(), "materialized scheduling intervals");

        let context = ScoreContext::from_prior_schedule(&self.schedule, &self.registry);
        let mut scores: HashMap<VarKey, f64> = HashMap::new();
        let mut coefficients: HashMap<VarKey, i32> = HashMap::new();
        for task in self.registry.tasks() {
            for &week in index.weeks() {
                for interval in index.tasks_for_week(&task.name, week) {
                    for physician in self.roster.physicians() {
                        let score = context.score(interval, physician, &self.registry);
                        let key = (
                            task.name.clone(),
                            interval.start_date,
                            interval.end_date,
                            physician.name.clone(),
                        );
                        coefficients.insert(key.clone(), quantize(score));
                        scores.insert(key, score);
                    }
                }
            }
        }

        let hints = if options.use_initial_schedule {
            self.hint_keys(&index)?
        } else {
            HashSet::new()
        };

        let outcome = model::solve(&ModelInput {
            registry: &self.registry,
            roster: &self.roster,
            index: &index,
            coefficients: &coefficients,
            hints: &hints,
            time_limit: options.time_limit,
        });

        match outcome {
            CpOutcome::Optimal(chosen) => {
                self.install_assignment(&chosen, &index, &scores);
                info!(assignments = self.schedule.len(), "schedule solved to optimality");
                Ok(SolveStatus::Optimal)
            }
            CpOutcome::Feasible(chosen) => {
                self.install_assignment(&chosen, &index, &scores);
                info!(assignments = self.schedule.len(), "schedule solved (feasible)");
                Ok(SolveStatus::Feasible)
            }
            CpOutcome::Infeasible => {
                info!("schedule infeasible; prior schedule preserved");
                Ok(SolveStatus::Infeasible)
            }
        }
    }

    // Map the held schedule onto decision variables for a warm start.
    // Every assignment must name a registered physician and an interval
    // that exists in this problem.
    fn hint_keys(&self, index: &MathTaskIndex) -> Result<HashSet<VarKey>, SolveError> {
        let mut hints = HashSet::new();
        for (physician, assignments) in self.schedule.iter() {
            for (task_index, assignment) in assignments.iter().enumerate() {
                let known_physician = self.roster.get(physician).is_some();
                let known_interval =
                    index.contains_interval(&assignment.task, assignment.start_date, assignment.end_date);
                if !known_physician || !known_interval {
                    return Err(SolveError::InconsistentLoadedSchedule(format!(
                        "physician {physician} at task number {}",
                        task_index + 1
                    )));
                }
                hints.insert((
                    assignment.task.clone(),
                    assignment.start_date,
                    assignment.end_date,
                    physician.clone(),
                ));
            }
        }
        Ok(hints)
    }

    fn install_assignment(
        &mut self,
        chosen: &HashSet<VarKey>,
        index: &MathTaskIndex,
        scores: &HashMap<VarKey, f64>,
    ) {
        let mut schedule = Schedule::new();
        for &week in index.weeks() {
            for task in self.registry.tasks() {
                for interval in index.tasks_for_week(&task.name, week) {
                    for physician in &interval.candidate_physicians {
                        let key = (
                            task.name.clone(),
                            interval.start_date,
                            interval.end_date,
                            physician.clone(),
                        );
                        if chosen.contains(&key) {
                            schedule.add(
                                physician.clone(),
                                Assignment {
                                    task: task.name.clone(),
                                    days: interval.days.clone(),
                                    start_date: interval.start_date,
                                    end_date: interval.end_date,
                                    score: scores.get(&key).copied().unwrap_or(0.0),
                                },
                            );
                        }
                    }
                }
            }
        }
        self.schedule = schedule;
    }
}
