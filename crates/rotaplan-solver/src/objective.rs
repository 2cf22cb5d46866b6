//! Objective scoring.
//!
//! Each (interval, physician) pair gets a weighted score expressing soft
//! preferences: task preference, fairness, call spread, heavy-task spacing,
//! discontinuity fit, working-weeks deficit, revenue balance, and a penalty
//! for repeating a category back to back. The solver maximizes the summed
//! score over the selected pairs.
//!
//! Scores are rational (terms like `5 / (count + 1)`); they are scaled by
//! [`SCORE_QUANTIZATION`] and rounded so the CP backend only ever sees
//! integer coefficients.

use chrono::{Datelike, NaiveDate};
use std::collections::HashMap;

use rotaplan_core::{CategoryName, Physician, PhysicianName, Schedule, TaskName, TaskRegistry};

use crate::mathtask::MathTask;

/// Multiplier applied before rounding scores to solver coefficients.
pub const SCORE_QUANTIZATION: f64 = 100.0;

/// Stability bias added to pairs hinted from a prior schedule, pre-quantization.
pub const HINT_STABILITY_BONUS: f64 = 2.0;

pub fn quantize(score: f64) -> i32 {
    (score * SCORE_QUANTIZATION).round() as i32
}

/// Prior-schedule statistics feeding the objective terms.
///
/// Built once per solve from the engine's current schedule (empty on a
/// first solve, in which case only the static terms contribute).
#[derive(Debug, Default)]
pub struct ScoreContext {
    task_counts: HashMap<(PhysicianName, TaskName), usize>,
    monthly_calls: HashMap<(PhysicianName, u32), usize>,
    last_heavy_day: HashMap<PhysicianName, NaiveDate>,
    scheduled_days: HashMap<PhysicianName, i64>,
    revenue: HashMap<PhysicianName, f64>,
    last_category: HashMap<PhysicianName, CategoryName>,
}

impl ScoreContext {
    pub fn from_prior_schedule(schedule: &Schedule, registry: &TaskRegistry) -> Self {
        let mut context = Self::default();
        for (physician, assignments) in schedule.iter() {
            let mut latest_end: Option<NaiveDate> = None;
            for assignment in assignments {
                let Some(task) = registry.get_task(&assignment.task) else {
                    continue;
                };
                let category = registry.category_of(task);

                *context
                    .task_counts
                    .entry((physician.clone(), task.name.clone()))
                    .or_default() += 1;
                *context.scheduled_days.entry(physician.clone()).or_default() +=
                    assignment.days.len() as i64;
                *context.revenue.entry(physician.clone()).or_default() += task.revenue(category);

                if task.is_call() {
                    *context
                        .monthly_calls
                        .entry((physician.clone(), assignment.start_date.month()))
                        .or_default() += 1;
                }
                if task.is_heavy() {
                    let entry = context
                        .last_heavy_day
                        .entry(physician.clone())
                        .or_insert(assignment.end_date);
                    if assignment.end_date > *entry {
                        *entry = assignment.end_date;
                    }
                }
                if latest_end.map_or(true, |end| assignment.end_date > end) {
                    latest_end = Some(assignment.end_date);
                    context.last_category.insert(physician.clone(), category.name.clone());
                }
            }
        }
        context
    }

    /// The weighted preference score for assigning `physician` to `interval`.
    pub fn score(&self, interval: &MathTask, physician: &Physician, registry: &TaskRegistry) -> f64 {
        let task = registry
            .get_task(&interval.task_name)
            .expect("intervals are materialized from registered tasks");
        let category = registry.category_of(task);
        let name = &physician.name;
        let mut score = 0.0;

        // Task preference.
        if physician.preferred_tasks.iter().any(|t| *t == task.name) {
            score += 10.0;
        }

        // Fairness: decay with how often this physician already held the task.
        let prior = self
            .task_counts
            .get(&(name.clone(), task.name.clone()))
            .copied()
            .unwrap_or(0);
        score += 5.0 / (prior as f64 + 1.0);

        // Call spread within the month.
        if task.is_call() {
            let calls = self
                .monthly_calls
                .get(&(name.clone(), interval.start_date.month()))
                .copied()
                .unwrap_or(0);
            score += 5.0 / (calls as f64 + 1.0);
        }

        // Heavy-task spacing: reward when the last heavy block is over a
        // week in the past.
        if task.is_heavy() {
            match self.last_heavy_day.get(name) {
                None => score += 5.0,
                Some(last) if (interval.start_date - *last).num_days() > 7 => score += 5.0,
                Some(_) => {}
            }
        }

        // Discontinuity fit.
        if task.is_discontinuous(category) {
            score += if physician.discontinuity_preference { 10.0 } else { -5.0 };
        }

        // Working-weeks deficit against the declared yearly fraction.
        let days = self.scheduled_days.get(name).copied().unwrap_or(0);
        if (days as f64) / 7.0 < physician.desired_working_weeks * 52.0 {
            score += 5.0;
        }

        // Revenue balance against the mean of physicians with prior revenue.
        if !self.revenue.is_empty() {
            let mean = self.revenue.values().sum::<f64>() / self.revenue.len() as f64;
            if self.revenue.get(name).copied().unwrap_or(0.0) < mean {
                score += 5.0;
            }
        }

        // Back-to-back category repeat on short tasks.
        if let Some(last_category) = self.last_category.get(name) {
            if *last_category == task.category && task.number_of_weeks(category) <= 1 {
                score -= 10.0;
            }
        }

        score
    }
}
