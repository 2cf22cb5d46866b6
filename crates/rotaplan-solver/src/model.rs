//! CP-SAT model construction and solving.
//!
//! The assignment problem is formulated over 0/1 integer variables
//! `y[(task, start, end, physician)]`, one per (interval, physician) pair
//! across the whole physician universe. Availability is enforced as
//! explicit zero constraints rather than by shrinking the variable set, so
//! indexing stays uniform and the linkage constraints read the same for
//! every physician.
//!
//! # Constraint families
//!
//! - Availability zeroing: `y[M, p] = 0` for every non-candidate `p`
//! - Coverage: `sum_p y[M, p] <= 1` per interval, and `>= 1` over the
//!   candidates of mandatory intervals
//! - Multi-week bundling and Main/Call linkage
//! - Pairwise mutual exclusion of overlapping intervals
//!
//! The objective maximizes the summed quantized preference scores.

use pumpkin_solver::constraints as cp;
use pumpkin_solver::optimisation::linear_sat_unsat::LinearSatUnsat;
use pumpkin_solver::optimisation::OptimisationDirection;
use pumpkin_solver::results::{OptimisationResult, ProblemSolution};
use pumpkin_solver::termination::TimeBudget;
use pumpkin_solver::variables::{DomainId, TransformableVariable};
use pumpkin_solver::Solver;

use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::debug;

use rotaplan_core::{PhysicianName, PhysicianRoster, TaskName, TaskRegistry, TaskType};

use crate::mathtask::{MathTask, MathTaskIndex};
use crate::objective::{quantize, HINT_STABILITY_BONUS};

/// Index of one decision variable: (task, interval start, interval end,
/// physician).
pub type VarKey = (TaskName, NaiveDate, NaiveDate, PhysicianName);

/// Everything the model build needs, borrowed from the engine for the
/// duration of one solve.
pub(crate) struct ModelInput<'a> {
    pub registry: &'a TaskRegistry,
    pub roster: &'a PhysicianRoster,
    pub index: &'a MathTaskIndex,
    /// Quantized objective coefficient per variable.
    pub coefficients: &'a HashMap<VarKey, i32>,
    /// Variables biased toward 1 by a warm start.
    pub hints: &'a HashSet<VarKey>,
    pub time_limit: Duration,
}

/// Result of one CP solve: the set of variables assigned 1, or infeasible.
pub(crate) enum CpOutcome {
    Optimal(HashSet<VarKey>),
    Feasible(HashSet<VarKey>),
    Infeasible,
}

pub(crate) fn solve(input: &ModelInput<'_>) -> CpOutcome {
    let physicians = input.roster.names();
    let weeks = input.index.weeks().to_vec();

    let mut solver = Solver::default();
    let constraint_tag = solver.new_constraint_tag();

    // A mandatory interval nobody can cover makes the model infeasible
    // before the backend ever runs.
    let mut trivially_infeasible = false;

    // ------------------------------------------------------------------
    // Variables: one 0/1 integer per (interval, physician) pair, for the
    // full physician universe.
    // ------------------------------------------------------------------
    let mut y: HashMap<VarKey, DomainId> = HashMap::new();
    let mut variables: Vec<(VarKey, DomainId)> = Vec::new();
    for task in input.registry.tasks() {
        for &week in &weeks {
            for interval in input.index.tasks_for_week(&task.name, week) {
                for physician in &physicians {
                    let var = solver.new_bounded_integer(0, 1);
                    let key = (
                        task.name.clone(),
                        interval.start_date,
                        interval.end_date,
                        physician.clone(),
                    );
                    y.insert(key.clone(), var);
                    variables.push((key, var));
                }
            }
        }
    }
    debug!(variables = variables.len(), "assignment variables created");

    let var_of = |interval: &MathTask, physician: &str| -> DomainId {
        y[&(
            interval.task_name.clone(),
            interval.start_date,
            interval.end_date,
            physician.to_string(),
        )]
    };

    // ------------------------------------------------------------------
    // (a) Availability zeroing and (b) coverage.
    // ------------------------------------------------------------------
    for task in input.registry.tasks() {
        for &week in &weeks {
            for interval in input.index.tasks_for_week(&task.name, week) {
                for physician in &physicians {
                    if !interval.is_candidate(physician) {
                        let _ = solver
                            .add_constraint(cp::equals(
                                vec![var_of(interval, physician).scaled(1)],
                                0,
                                constraint_tag,
                            ))
                            .post();
                    }
                }

                // One physician per duty. Without this cap the maximizing
                // objective would happily double-book every interval.
                let cap_terms: Vec<_> = physicians
                    .iter()
                    .map(|p| var_of(interval, p).scaled(1))
                    .collect();
                let _ = solver
                    .add_constraint(cp::less_than_or_equals(cap_terms, 1, constraint_tag))
                    .post();

                if interval.mandatory {
                    if interval.candidate_physicians.is_empty() {
                        debug!(interval = %interval, "mandatory interval has no candidates");
                        trivially_infeasible = true;
                    } else {
                        let terms: Vec<_> = interval
                            .candidate_physicians
                            .iter()
                            .map(|p| var_of(interval, p).scaled(1))
                            .collect();
                        let _ = solver
                            .add_constraint(cp::greater_than_or_equals(terms, 1, constraint_tag))
                            .post();
                    }
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // (c) Multi-week bundling and Main/Call linkage.
    //
    // Walking each Main task's intervals in week order, every
    // `number_of_weeks` consecutive weeks form one bundle that a physician
    // takes atomically, together with exactly one linked call interval
    // that starts after the bundle's first main interval ends. The
    // trailing partial bundle at the horizon tail is flushed so its
    // constraints still bind.
    // ------------------------------------------------------------------
    let emit_bundle = |solver: &mut Solver,
                       main_bundle: &[&MathTask],
                       call_bundle: Option<&[&MathTask]>| {
        // Atomicity: a physician takes every interval of the bundle or none.
        for physician in &physicians {
            for pair in main_bundle.windows(2) {
                let _ = solver
                    .add_constraint(cp::equals(
                        vec![
                            var_of(pair[0], physician).scaled(1),
                            var_of(pair[1], physician).scaled(-1),
                        ],
                        0,
                        constraint_tag,
                    ))
                    .post();
            }
        }

        let Some(calls) = call_bundle else {
            return;
        };

        // Call quota: at most one linked call interval per physician.
        if !calls.is_empty() {
            for physician in &physicians {
                let terms: Vec<_> = calls.iter().map(|c| var_of(c, physician).scaled(1)).collect();
                let _ = solver
                    .add_constraint(cp::less_than_or_equals(terms, 1, constraint_tag))
                    .post();
            }
        }

        let Some(first_main) = main_bundle.first() else {
            return;
        };

        // Early-call veto: the call must begin strictly after the first
        // main interval ends. The call list is time-ordered, so stop at
        // the first interval past the boundary.
        let first_possible_call_date = first_main.end_date;
        for call in calls {
            if call.start_date > first_possible_call_date {
                break;
            }
            for physician in &physicians {
                let _ = solver
                    .add_constraint(cp::equals(
                        vec![var_of(call, physician).scaled(1)],
                        0,
                        constraint_tag,
                    ))
                    .post();
            }
        }

        // Main => Call: whoever works the bundle takes a linked call.
        if !calls.is_empty() {
            for physician in &physicians {
                for main in main_bundle {
                    let mut terms = vec![var_of(main, physician).scaled(1)];
                    terms.extend(calls.iter().map(|c| var_of(c, physician).scaled(-1)));
                    let _ = solver
                        .add_constraint(cp::less_than_or_equals(terms, 0, constraint_tag))
                        .post();
                }
            }
        }

        // Call => Main: the linked call only goes with the bundle.
        for physician in &physicians {
            for call in calls {
                let mut terms = vec![var_of(call, physician).scaled(1)];
                terms.extend(main_bundle.iter().map(|m| var_of(m, physician).scaled(-1)));
                let _ = solver
                    .add_constraint(cp::less_than_or_equals(terms, 0, constraint_tag))
                    .post();
            }
        }
    };

    for task in input.registry.tasks() {
        if task.task_type != TaskType::Main {
            continue;
        }
        let bundle_weeks = input.registry.task_weeks(task);
        let linked_call = input.registry.linkage().linked_call(&task.name);

        let mut main_bundle: Vec<&MathTask> = Vec::new();
        let mut call_bundle: Vec<&MathTask> = Vec::new();
        let mut weeks_left = bundle_weeks;
        for &week in &weeks {
            main_bundle.extend(input.index.tasks_for_week(&task.name, week));
            if let Some(call_name) = linked_call {
                call_bundle.extend(input.index.tasks_for_week(call_name, week));
            }
            weeks_left -= 1;
            if weeks_left == 0 {
                emit_bundle(&mut solver, &main_bundle, linked_call.map(|_| call_bundle.as_slice()));
                main_bundle.clear();
                call_bundle.clear();
                weeks_left = bundle_weeks;
            }
        }
        // Trailing partial bundle at the horizon tail.
        if !main_bundle.is_empty() || !call_bundle.is_empty() {
            emit_bundle(&mut solver, &main_bundle, linked_call.map(|_| call_bundle.as_slice()));
        }
    }

    // ------------------------------------------------------------------
    // (d) Pairwise mutual exclusion of overlapping intervals, via a
    // two-pointer sweep over the two time-ordered sequences.
    // ------------------------------------------------------------------
    let sequences: Vec<Vec<&MathTask>> = input
        .registry
        .tasks()
        .iter()
        .map(|t| input.index.time_ordered(&t.name))
        .collect();
    for i in 0..sequences.len() {
        for j in (i + 1)..sequences.len() {
            let (a, b) = (&sequences[i], &sequences[j]);
            let (mut ai, mut bj) = (0, 0);
            while ai < a.len() && bj < b.len() {
                let lo = a[ai].start_date.max(b[bj].start_date);
                let hi = a[ai].end_date.min(b[bj].end_date);
                if lo <= hi {
                    for physician in &physicians {
                        let _ = solver
                            .add_constraint(cp::less_than_or_equals(
                                vec![
                                    var_of(a[ai], physician).scaled(1),
                                    var_of(b[bj], physician).scaled(1),
                                ],
                                1,
                                constraint_tag,
                            ))
                            .post();
                    }
                }
                // Drop the interval with the earlier endpoint.
                if a[ai].end_date < b[bj].end_date {
                    ai += 1;
                } else {
                    bj += 1;
                }
            }
        }
    }

    if trivially_infeasible {
        return CpOutcome::Infeasible;
    }

    // ------------------------------------------------------------------
    // Objective: maximize the summed quantized scores of the selected
    // pairs, with a stability bonus on warm-start hints. The objective is
    // a fresh variable tied to the weighted sum by a linear equality.
    // ------------------------------------------------------------------
    let hint_bonus = quantize(HINT_STABILITY_BONUS);
    let mut objective_terms = Vec::new();
    let (mut lower, mut upper) = (0i32, 0i32);
    for (key, var) in &variables {
        let mut coefficient = input.coefficients.get(key).copied().unwrap_or(0);
        if input.hints.contains(key) {
            coefficient += hint_bonus;
        }
        if coefficient != 0 {
            objective_terms.push(var.scaled(coefficient));
            if coefficient > 0 {
                upper += coefficient;
            } else {
                lower += coefficient;
            }
        }
    }
    let objective = solver.new_bounded_integer(lower, upper);
    objective_terms.push(objective.scaled(-1));
    let _ = solver
        .add_constraint(cp::equals(objective_terms, 0, constraint_tag))
        .post();

    // ------------------------------------------------------------------
    // Solve.
    // ------------------------------------------------------------------
    let mut brancher = solver.default_brancher();
    let mut termination = TimeBudget::starting_now(input.time_limit);

    fn noop_callback<B>(_: &Solver, _: pumpkin_solver::results::SolutionReference, _: &B) {}
    let result = solver.optimise(
        &mut brancher,
        &mut termination,
        LinearSatUnsat::new(OptimisationDirection::Maximise, objective, noop_callback),
    );

    match result {
        OptimisationResult::Optimal(solution) => {
            let chosen = variables
                .iter()
                .filter(|(_, var)| solution.get_integer_value(*var) > 0)
                .map(|(key, _)| key.clone())
                .collect();
            CpOutcome::Optimal(chosen)
        }
        OptimisationResult::Satisfiable(solution) => {
            // A solution was found but optimality was not proven within
            // the time budget.
            let chosen = variables
                .iter()
                .filter(|(_, var)| solution.get_integer_value(*var) > 0)
                .map(|(key, _)| key.clone())
                .collect();
            CpOutcome::Feasible(chosen)
        }
        OptimisationResult::Unsatisfiable | OptimisationResult::Unknown => CpOutcome::Infeasible,
    }
}
