//! End-to-end scheduling scenarios.
//!
//! These tests drive the full pipeline (calendar segmentation, interval
//! materialization, CP model, extraction) and validate the scheduling
//! invariants that must hold for any correct solve:
//!
//! 1. No assignment covers a day its physician is unavailable on
//! 2. Mandatory intervals get exactly one assignee
//! 3. One physician never holds two overlapping assignments
//! 4. Multi-week bundles are atomic per physician
//! 5. An assigned bundle carries exactly one linked call in its span
//! 6. A linked call starts strictly after the bundle's first main interval

use chrono::NaiveDate;
use rotaplan_core::{
    Assignment, Calendar, DaysParameter, Physician, PhysicianRoster, Schedule, Task, TaskCategory,
    TaskRegistry, TaskType, Unavailability,
};
use rotaplan_solver::{ScheduleEngine, SolveOptions, SolveStatus};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn basis_registry() -> TaskRegistry {
    let mut registry = TaskRegistry::new();
    registry
        .add_category(TaskCategory::new("CTU", DaysParameter::MultiWeek, 2, 2000.0, 4000.0))
        .unwrap();
    registry
        .add_category(TaskCategory::new("ER", DaysParameter::Continuous, 1, 2500.0, 5000.0).restricted())
        .unwrap();

    registry.add_task(Task::new("CTU", TaskType::Main, "CTU_A").heaviness(4)).unwrap();
    registry
        .add_task(Task::new("CTU", TaskType::Main, "CTU_B").week_offset(1).heaviness(4))
        .unwrap();
    registry
        .add_task(Task::new("CTU", TaskType::Call, "CTU_A_CALL").heaviness(5).optional())
        .unwrap();
    registry
        .add_task(Task::new("CTU", TaskType::Call, "CTU_B_CALL").heaviness(5).optional())
        .unwrap();
    registry.add_task(Task::new("ER", TaskType::Main, "ER_1").heaviness(5)).unwrap();
    registry
        .add_task(Task::new("ER", TaskType::Call, "ER_CALL").heaviness(5).optional())
        .unwrap();

    registry.link_tasks("CTU_A", "CTU_A_CALL").unwrap();
    registry.link_tasks("CTU_B", "CTU_B_CALL").unwrap();
    registry.link_tasks("ER_1", "ER_CALL").unwrap();
    registry
}

fn basis_roster(registry: &TaskRegistry) -> PhysicianRoster {
    let mut roster = PhysicianRoster::new();
    let physicians = [
        ("John", "Doe", vec!["CTU".to_string(), "ER".to_string()], true, 0.75),
        ("Jane", "Smith", vec!["ER".to_string(), "CTU".to_string()], false, 1.0),
        ("Eric", "Yamga", vec!["ER".to_string(), "CTU".to_string()], false, 1.0),
        ("Justine", "Munger", vec!["ER".to_string(), "CTU".to_string()], false, 1.0),
    ];
    for (first, last, preferred, discontinuity, desired) in physicians {
        roster
            .add_physician(
                Physician::new(first, last, preferred, discontinuity, desired, vec![], vec![]).unwrap(),
                registry,
            )
            .unwrap();
    }
    roster
}

fn basis_engine(roster: PhysicianRoster) -> ScheduleEngine {
    let registry = basis_registry();
    let calendar = Calendar::with_holidays(d(2023, 1, 2), d(2023, 1, 30), "Canada/QC", [d(2023, 1, 2)]);
    let mut engine = ScheduleEngine::new(registry, roster, calendar);
    engine.set_scheduling_period(d(2023, 1, 1), d(2023, 1, 31));
    engine
}

/// Check the universal scheduling invariants on a solved engine.
fn assert_schedule_invariants(engine: &ScheduleEngine) {
    let schedule = engine.schedule();
    let roster = engine.roster();

    // Availability: no assigned day is an unavailable day.
    for (physician, assignments) in schedule.iter() {
        for assignment in assignments {
            for &day in &assignment.days {
                assert!(
                    !roster.is_unavailable(physician, day),
                    "{physician} assigned {} on unavailable day {day}",
                    assignment.task
                );
            }
        }
    }

    // No two assignments of one physician share a day.
    for (physician, assignments) in schedule.iter() {
        for (i, a) in assignments.iter().enumerate() {
            for b in assignments.iter().skip(i + 1) {
                assert!(
                    a.start_date > b.end_date || b.start_date > a.end_date,
                    "{physician} holds overlapping assignments {} and {}",
                    a.task,
                    b.task
                );
            }
        }
    }

    // Each interval is held by at most one physician.
    let mut interval_holders: std::collections::HashMap<(String, NaiveDate), usize> =
        std::collections::HashMap::new();
    for (_, assignments) in schedule.iter() {
        for assignment in assignments {
            *interval_holders
                .entry((assignment.task.clone(), assignment.start_date))
                .or_default() += 1;
        }
    }
    for ((task, start), holders) in interval_holders {
        assert_eq!(holders, 1, "interval of {task} starting {start} has {holders} holders");
    }
}

fn assignments_of_task(schedule: &Schedule, task: &str) -> Vec<(String, Assignment)> {
    let mut result = Vec::new();
    for (physician, assignments) in schedule.iter() {
        for assignment in assignments {
            if assignment.task == task {
                result.push((physician.clone(), assignment.clone()));
            }
        }
    }
    result.sort_by_key(|(_, a)| a.start_date);
    result
}

// ============================================================================
// Basis scenario: mandatory weekly coverage and two-week bundles
// ============================================================================

#[test]
fn basis_scenario_covers_mandatory_tasks() {
    let registry = basis_registry();
    let roster = basis_roster(&registry);
    let mut engine = basis_engine(roster);

    let status = engine.generate_schedule(&SolveOptions::default()).unwrap();
    assert_ne!(status, SolveStatus::Infeasible);
    assert_schedule_invariants(&engine);

    // Every week of the horizon has exactly one ER_1 assignee: weeks of
    // Jan 2 (Tue-Fri after the holiday), Jan 9, 16, 23, and the lone
    // Monday Jan 30.
    let er = assignments_of_task(engine.schedule(), "ER_1");
    let starts: Vec<NaiveDate> = er.iter().map(|(_, a)| a.start_date).collect();
    assert_eq!(
        starts,
        vec![d(2023, 1, 3), d(2023, 1, 9), d(2023, 1, 16), d(2023, 1, 23), d(2023, 1, 30)]
    );

    // CTU bundles are atomic: weeks 1-2 and 3-4 of each CTU task belong
    // to a single physician.
    for task in ["CTU_A", "CTU_B"] {
        let ctu = assignments_of_task(engine.schedule(), task);
        assert_eq!(ctu.len(), 5, "{task} must cover all five weeks");
        assert_eq!(ctu[0].0, ctu[1].0, "{task} weeks 1-2 split across physicians");
        assert_eq!(ctu[2].0, ctu[3].0, "{task} weeks 3-4 split across physicians");
    }
}

#[test]
fn basis_scenario_links_calls_to_bundles() {
    let registry = basis_registry();
    let roster = basis_roster(&registry);
    let mut engine = basis_engine(roster);

    let status = engine.generate_schedule(&SolveOptions::default()).unwrap();
    assert_ne!(status, SolveStatus::Infeasible);

    // Each full CTU bundle carries exactly one linked call, held by the
    // bundle's physician, inside the bundle's span.
    for (main_task, call_task) in [("CTU_A", "CTU_A_CALL"), ("CTU_B", "CTU_B_CALL")] {
        let mains = assignments_of_task(engine.schedule(), main_task);
        let calls = assignments_of_task(engine.schedule(), call_task);

        for bundle in [&mains[0..2], &mains[2..4]] {
            let physician = &bundle[0].0;
            let bundle_start = bundle[0].1.start_date;
            let bundle_end = bundle.last().unwrap().1.end_date;
            let linked: Vec<_> = calls
                .iter()
                .filter(|(p, a)| {
                    p == physician && a.start_date >= bundle_start && a.start_date <= bundle_end + chrono::Days::new(7)
                })
                .collect();
            assert_eq!(
                linked.len(),
                1,
                "{main_task} bundle starting {bundle_start} has {} linked calls",
                linked.len()
            );
            // The call begins strictly after the bundle's first main
            // interval ends.
            assert!(linked[0].1.start_date > bundle[0].1.end_date);
        }
    }
}

// ============================================================================
// Availability window
// ============================================================================

#[test]
fn unavailability_window_is_respected() {
    let registry = basis_registry();
    let mut roster = basis_roster(&registry);
    roster
        .add_unavailability("John", "Doe", Unavailability::Range(d(2023, 1, 9), d(2023, 1, 22)))
        .unwrap();
    let mut engine = basis_engine(roster);

    let status = engine.generate_schedule(&SolveOptions::default()).unwrap();
    assert_ne!(status, SolveStatus::Infeasible);
    assert_schedule_invariants(&engine);

    for assignment in engine.schedule().assignments_of("John Doe") {
        assert!(
            assignment.end_date < d(2023, 1, 9) || assignment.start_date > d(2023, 1, 22),
            "John Doe assigned {} overlapping the unavailable window",
            assignment.task
        );
    }
}

// ============================================================================
// Infeasibility preserves the prior schedule
// ============================================================================

#[test]
fn infeasible_solve_keeps_prior_schedule() {
    let registry = basis_registry();
    let mut roster = basis_roster(&registry);
    // Nobody can work the week of Jan 9, which contains a mandatory ER_1
    // interval.
    for (first, last) in [("John", "Doe"), ("Jane", "Smith"), ("Eric", "Yamga"), ("Justine", "Munger")] {
        roster
            .add_unavailability(first, last, Unavailability::Range(d(2023, 1, 9), d(2023, 1, 13)))
            .unwrap();
    }
    let mut engine = basis_engine(roster);

    let mut prior = Schedule::new();
    prior.add(
        "Jane Smith",
        Assignment {
            task: "ER_1".into(),
            days: vec![d(2023, 1, 3), d(2023, 1, 4), d(2023, 1, 5), d(2023, 1, 6)],
            start_date: d(2023, 1, 3),
            end_date: d(2023, 1, 6),
            score: 15.0,
        },
    );
    engine.set_schedule(prior.clone());

    let status = engine.generate_schedule(&SolveOptions::default()).unwrap();
    assert_eq!(status, SolveStatus::Infeasible);
    assert_eq!(engine.schedule(), &prior, "infeasible solve must not touch the schedule");
}

// ============================================================================
// Early-call veto
// ============================================================================

#[test]
fn early_calls_are_vetoed_late_calls_allowed() {
    let mut registry = TaskRegistry::new();
    registry
        .add_category(TaskCategory::new("CTU", DaysParameter::MultiWeek, 2, 2000.0, 4000.0))
        .unwrap();
    registry.add_task(Task::new("CTU", TaskType::Main, "CTU_A").heaviness(4)).unwrap();
    registry
        .add_task(Task::new("CTU", TaskType::Call, "CTU_A_CALL").heaviness(5).optional())
        .unwrap();
    registry.link_tasks("CTU_A", "CTU_A_CALL").unwrap();

    let mut roster = PhysicianRoster::new();
    for (first, last) in [("Jane", "Smith"), ("Eric", "Yamga")] {
        roster
            .add_physician(
                Physician::new(first, last, vec!["CTU".into()], false, 1.0, vec![], vec![]).unwrap(),
                &registry,
            )
            .unwrap();
    }

    // The horizon opens on the weekend preceding the first working week:
    // the Dec 31 - Jan 1 call interval sits before the bundle's first
    // main interval ends and must stay unassigned.
    let calendar = Calendar::with_holidays(d(2022, 12, 31), d(2023, 1, 13), "Canada/QC", []);
    let mut engine = ScheduleEngine::new(registry, roster, calendar);
    engine.set_scheduling_period(d(2022, 12, 31), d(2023, 1, 13));

    let status = engine.generate_schedule(&SolveOptions::default()).unwrap();
    assert_ne!(status, SolveStatus::Infeasible);
    assert_schedule_invariants(&engine);

    let calls = assignments_of_task(engine.schedule(), "CTU_A_CALL");
    assert_eq!(calls.len(), 1, "the bundle takes exactly one linked call");
    assert_eq!(calls[0].1.start_date, d(2023, 1, 7));

    let mains = assignments_of_task(engine.schedule(), "CTU_A");
    assert_eq!(calls[0].0, mains[0].0, "the linked call belongs to the bundle's physician");
    assert!(calls[0].1.start_date > mains[0].1.end_date);
}

// ============================================================================
// Warm start
// ============================================================================

#[test]
fn warm_start_resolves_with_prior_schedule() {
    let registry = basis_registry();
    let roster = basis_roster(&registry);
    let mut engine = basis_engine(roster);

    let status = engine.generate_schedule(&SolveOptions::default()).unwrap();
    assert_ne!(status, SolveStatus::Infeasible);
    let prior = engine.schedule().clone();
    assert!(!prior.is_empty());

    // Feed the first solution back in as a warm start.
    let registry = basis_registry();
    let roster = basis_roster(&registry);
    let mut engine = basis_engine(roster);
    engine.set_schedule(prior);

    let options = SolveOptions {
        use_initial_schedule: true,
        ..SolveOptions::default()
    };
    let status = engine.generate_schedule(&options).unwrap();
    assert_ne!(status, SolveStatus::Infeasible);
    assert_schedule_invariants(&engine);
}

// ============================================================================
// Reporting helpers on the solved schedule
// ============================================================================

#[test]
fn solved_schedule_reports_cleanly() {
    let registry = basis_registry();
    let roster = basis_roster(&registry);
    let mut engine = basis_engine(roster);

    let status = engine.generate_schedule(&SolveOptions::default()).unwrap();
    assert_ne!(status, SolveStatus::Infeasible);

    assert!(engine.schedule().conflicts().is_empty());

    let stats = engine.schedule().statistics(engine.roster());
    let total_days: i64 = stats.values().map(|s| s.total_working_days).sum();
    assert!(total_days > 0);

    // All mandatory tasks are assigned somewhere.
    let unassigned = engine.schedule().unassigned_tasks(engine.registry());
    for task in engine.registry().tasks() {
        if task.mandatory {
            assert!(!unassigned.contains(&task.name), "{} left unassigned", task.name);
        }
    }
}
