//! rotaplan CLI - Physician Duty Scheduling Engine
//!
//! Command-line interface for validating configurations, previewing
//! calendar periods, solving schedules, and exporting calendars.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use rotaplan_config::{
    load_calendar, load_physician_config, load_schedule, load_task_config, load_unavailability,
    save_schedule,
};
use rotaplan_core::{Calendar, PeriodInterval, PhysicianRoster, Schedule, TaskRegistry};
use rotaplan_render::IcsRenderer;
use rotaplan_solver::{ScheduleEngine, SolveOptions, SolveStatus};

#[derive(Parser)]
#[command(name = "rotaplan")]
#[command(author, version, about = "Physician duty scheduling engine", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate the configuration documents
    Check {
        /// Task configuration file
        #[arg(long, value_name = "FILE")]
        tasks: PathBuf,

        /// Physician configuration file
        #[arg(long, value_name = "FILE")]
        physicians: PathBuf,

        /// Calendar file
        #[arg(long, value_name = "FILE")]
        calendar: PathBuf,

        /// Unavailability file
        #[arg(long, value_name = "FILE")]
        unavailability: Option<PathBuf>,
    },

    /// Preview the week-by-week MAIN/CALL period segmentation
    Periods {
        /// Calendar file
        #[arg(long, value_name = "FILE")]
        calendar: PathBuf,
    },

    /// Solve the assignment problem and write the schedule
    Schedule {
        /// Task configuration file
        #[arg(long, value_name = "FILE")]
        tasks: PathBuf,

        /// Physician configuration file
        #[arg(long, value_name = "FILE")]
        physicians: PathBuf,

        /// Calendar file
        #[arg(long, value_name = "FILE")]
        calendar: PathBuf,

        /// Unavailability file
        #[arg(long, value_name = "FILE")]
        unavailability: Option<PathBuf>,

        /// Scheduling period start (YYYY-MM-DD; default: calendar start)
        #[arg(long, value_name = "DATE")]
        from: Option<NaiveDate>,

        /// Scheduling period end (YYYY-MM-DD; default: calendar end)
        #[arg(long, value_name = "DATE")]
        to: Option<NaiveDate>,

        /// Prior schedule to warm-start the search from
        #[arg(long, value_name = "FILE")]
        initial: Option<PathBuf>,

        /// Solver wall-clock budget in milliseconds
        #[arg(long, default_value = "30000")]
        time_limit_ms: u64,

        /// Output schedule file (stdout summary either way)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Export a schedule as an ICS calendar
    ExportIcs {
        /// Task configuration file
        #[arg(long, value_name = "FILE")]
        tasks: PathBuf,

        /// Physician configuration file
        #[arg(long, value_name = "FILE")]
        physicians: PathBuf,

        /// Schedule file
        #[arg(long, value_name = "FILE")]
        schedule: PathBuf,

        /// Output .ics file
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check {
            tasks,
            physicians,
            calendar,
            unavailability,
        } => cmd_check(&tasks, &physicians, &calendar, unavailability.as_deref()),
        Commands::Periods { calendar } => cmd_periods(&calendar),
        Commands::Schedule {
            tasks,
            physicians,
            calendar,
            unavailability,
            from,
            to,
            initial,
            time_limit_ms,
            output,
        } => cmd_schedule(
            &tasks,
            &physicians,
            &calendar,
            unavailability.as_deref(),
            from,
            to,
            initial.as_deref(),
            time_limit_ms,
            output.as_deref(),
        ),
        Commands::ExportIcs {
            tasks,
            physicians,
            schedule,
            output,
        } => cmd_export_ics(&tasks, &physicians, &schedule, &output),
    }
}

fn load_problem(
    tasks: &Path,
    physicians: &Path,
    calendar: &Path,
    unavailability: Option<&Path>,
) -> Result<(TaskRegistry, PhysicianRoster, Calendar)> {
    let registry = load_task_config(tasks)
        .with_context(|| format!("failed to load task configuration {}", tasks.display()))?;
    let mut roster = load_physician_config(physicians, &registry)
        .with_context(|| format!("failed to load physician configuration {}", physicians.display()))?;
    let calendar = load_calendar(calendar)
        .with_context(|| format!("failed to load calendar {}", calendar.display()))?;
    if let Some(path) = unavailability {
        let table = load_unavailability(path)
            .with_context(|| format!("failed to load unavailability {}", path.display()))?;
        roster.set_unavailability(table)?;
    }
    Ok((registry, roster, calendar))
}

fn cmd_check(
    tasks: &Path,
    physicians: &Path,
    calendar: &Path,
    unavailability: Option<&Path>,
) -> Result<()> {
    let (registry, roster, calendar) = load_problem(tasks, physicians, calendar, unavailability)?;

    println!(
        "OK: {} categories, {} tasks, {} linkages",
        registry.categories().count(),
        registry.tasks().len(),
        registry.linkage().iter().count()
    );
    println!("OK: {} physicians", roster.physicians().len());
    println!(
        "OK: calendar {} .. {} ({}), {} working days, {} call days",
        calendar.start_date,
        calendar.end_date,
        calendar.region,
        calendar.working_days().len(),
        calendar.call_days().len()
    );
    Ok(())
}

fn cmd_periods(calendar: &Path) -> Result<()> {
    let calendar = load_calendar(calendar)?;
    let periods = calendar.determine_periods();

    for (week_start, week_periods) in &periods {
        let week_end = *week_start + chrono::Days::new(6);
        println!("\nWeek: {} - {}:", week_start.format("%b %d"), week_end.format("%b %d"));
        for period in week_periods {
            let label = match period {
                PeriodInterval::Main(_) => "MAIN",
                PeriodInterval::Call(_) => "CALL",
            };
            println!(
                "  {label}: {} ({} days)",
                format_date_range(period),
                period.days().len()
            );
        }
    }
    Ok(())
}

fn format_date_range(period: &PeriodInterval) -> String {
    let days = period.days();
    if days.len() == 1 {
        days[0].format("%b %d").to_string()
    } else {
        format!("{} - {}", days[0].format("%b %d"), period.end().format("%b %d"))
    }
}

fn cmd_schedule(
    tasks: &Path,
    physicians: &Path,
    calendar: &Path,
    unavailability: Option<&Path>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    initial: Option<&Path>,
    time_limit_ms: u64,
    output: Option<&Path>,
) -> Result<()> {
    let (registry, roster, calendar) = load_problem(tasks, physicians, calendar, unavailability)?;

    let start = from.unwrap_or(calendar.start_date);
    let end = to.unwrap_or(calendar.end_date);

    let initial_schedule = initial
        .map(|path| load_schedule(path, &registry, &roster))
        .transpose()
        .context("failed to load the initial schedule")?;

    let mut engine = ScheduleEngine::new(registry, roster, calendar);
    engine.set_scheduling_period(start, end);
    let use_initial_schedule = initial_schedule.is_some();
    if let Some(prior) = initial_schedule {
        engine.set_schedule(prior);
    }

    let options = SolveOptions {
        use_initial_schedule,
        time_limit: Duration::from_millis(time_limit_ms),
    };
    let status = engine.generate_schedule(&options)?;

    match status {
        SolveStatus::Infeasible => {
            println!("Schedule infeasible; no assignment was written.");
            return Ok(());
        }
        SolveStatus::Optimal => println!("Schedule solved to optimality."),
        SolveStatus::Feasible => println!("Schedule solved (optimality not proven)."),
    }

    print_schedule(engine.schedule());

    let unassigned = engine.schedule().unassigned_tasks(engine.registry());
    if !unassigned.is_empty() {
        println!("\nUnassigned tasks: {}", unassigned.join(", "));
    }

    if let Some(path) = output {
        save_schedule(engine.schedule(), path)
            .with_context(|| format!("failed to write schedule {}", path.display()))?;
        println!("\nSchedule written to {}", path.display());
    }
    Ok(())
}

fn print_schedule(schedule: &Schedule) {
    for (physician, assignments) in schedule.iter() {
        println!("\n{physician}:");
        for assignment in assignments {
            println!(
                "  {}: {} - {} (Score: {:.2})",
                assignment.task, assignment.start_date, assignment.end_date, assignment.score
            );
        }
    }
}

fn cmd_export_ics(tasks: &Path, physicians: &Path, schedule: &Path, output: &Path) -> Result<()> {
    let registry = load_task_config(tasks)?;
    let roster = load_physician_config(physicians, &registry)?;
    let schedule = load_schedule(schedule, &registry, &roster)
        .with_context(|| "failed to load the schedule".to_string())?;

    IcsRenderer::new()
        .write(&schedule, output)
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!("Calendar written to {} ({} events)", output.display(), schedule.len());
    Ok(())
}
