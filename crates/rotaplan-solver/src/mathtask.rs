//! Interval materialization.
//!
//! For every task and every relevant week, the materializer turns the
//! week's period intervals into [`MathTask`]s: one concrete decision unit
//! per (task, interval) pair, carrying the physicians available for every
//! day of the interval.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use rotaplan_core::{
    DaysParameter, PeriodInterval, PhysicianName, PhysicianRoster, TaskName, TaskRegistry,
    TaskType, WeekPeriods,
};

use crate::SolveError;

/// One contiguous time interval of one task: the basic unit of the
/// mathematical model.
///
/// `days` is non-empty and consecutive; `start_date`/`end_date` mirror its
/// endpoints. `candidate_physicians` are exactly the physicians available
/// on every day of the interval.
#[derive(Clone, Debug)]
pub struct MathTask {
    pub task_name: TaskName,
    pub task_type: TaskType,
    pub week_start: NaiveDate,
    /// Position among the week's intervals of this task.
    pub index: usize,
    pub days: Vec<NaiveDate>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub number_of_weeks: u32,
    pub candidate_physicians: Vec<PhysicianName>,
    pub heaviness: u8,
    pub mandatory: bool,
}

impl MathTask {
    pub fn is_candidate(&self, physician: &str) -> bool {
        self.candidate_physicians.iter().any(|p| p == physician)
    }
}

impl std::fmt::Display for MathTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}, {}]", self.task_name, self.start_date, self.end_date)
    }
}

/// All materialized intervals, addressable per (task, week) and as the
/// time-ordered sequence of one task.
#[derive(Debug, Default)]
pub struct MathTaskIndex {
    by_task: BTreeMap<TaskName, BTreeMap<NaiveDate, Vec<MathTask>>>,
    weeks: Vec<NaiveDate>,
}

impl MathTaskIndex {
    /// Materialize every task over the given weeks.
    ///
    /// Discontinuous categories are not expressible as period intervals
    /// and fail with [`SolveError::UnsupportedCategory`].
    pub fn build(
        periods: &WeekPeriods,
        registry: &TaskRegistry,
        roster: &PhysicianRoster,
    ) -> Result<Self, SolveError> {
        let mut by_task: BTreeMap<TaskName, BTreeMap<NaiveDate, Vec<MathTask>>> = BTreeMap::new();
        for task in registry.tasks() {
            by_task.insert(task.name.clone(), BTreeMap::new());
        }

        for (&week_start, week_periods) in periods {
            for task in registry.tasks() {
                let category = registry.category_of(task);
                if category.days_parameter == DaysParameter::Discontinuous {
                    return Err(SolveError::UnsupportedCategory(category.name.clone()));
                }

                let number_of_weeks = registry.task_weeks(task);
                let week_tasks: Vec<MathTask> = week_periods
                    .iter()
                    .filter(|period| match task.task_type {
                        TaskType::Main => period.is_main(),
                        TaskType::Call => period.is_call(),
                    })
                    .enumerate()
                    .map(|(index, period)| {
                        Self::materialize(task, period, week_start, index, number_of_weeks, roster)
                    })
                    .collect();
                by_task
                    .get_mut(&task.name)
                    .expect("every task was seeded above")
                    .insert(week_start, week_tasks);
            }
        }

        Ok(Self {
            by_task,
            weeks: periods.keys().copied().collect(),
        })
    }

    fn materialize(
        task: &rotaplan_core::Task,
        period: &PeriodInterval,
        week_start: NaiveDate,
        index: usize,
        number_of_weeks: u32,
        roster: &PhysicianRoster,
    ) -> MathTask {
        let days = period.days().to_vec();
        MathTask {
            task_name: task.name.clone(),
            task_type: task.task_type,
            week_start,
            index,
            start_date: days[0],
            end_date: *days.last().expect("period intervals are non-empty"),
            candidate_physicians: roster.available_physicians(&days),
            days,
            number_of_weeks,
            heaviness: task.heaviness,
            mandatory: task.mandatory,
        }
    }

    /// Week keys in ascending order.
    pub fn weeks(&self) -> &[NaiveDate] {
        &self.weeks
    }

    /// The intervals of one task within one week, possibly empty.
    pub fn tasks_for_week(&self, task_name: &str, week_start: NaiveDate) -> &[MathTask] {
        self.by_task
            .get(task_name)
            .and_then(|weeks| weeks.get(&week_start))
            .map_or(&[], Vec::as_slice)
    }

    /// All intervals of one task concatenated in week order: a strictly
    /// time-ordered, non-overlapping sequence.
    pub fn time_ordered(&self, task_name: &str) -> Vec<&MathTask> {
        self.by_task
            .get(task_name)
            .into_iter()
            .flat_map(|weeks| weeks.values().flatten())
            .collect()
    }

    /// True if a MathTask of `task_name` spans exactly `[start, end]`.
    pub fn contains_interval(&self, task_name: &str, start: NaiveDate, end: NaiveDate) -> bool {
        self.time_ordered(task_name)
            .iter()
            .any(|mt| mt.start_date == start && mt.end_date == end)
    }

    /// Total number of materialized intervals.
    pub fn len(&self) -> usize {
        self.by_task.values().flat_map(|w| w.values()).map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
