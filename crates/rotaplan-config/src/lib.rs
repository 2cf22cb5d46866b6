//! # rotaplan-config
//!
//! Persisted JSON documents for the rotaplan scheduling engine and their
//! conversion to validated domain objects.
//!
//! Four configuration documents plus the schedule artifact are covered:
//! task configuration (categories, tasks, linkage), physician
//! configuration, calendar state, per-physician unavailability, and the
//! solved schedule. Loading always passes through the domain registries so
//! every document-level mistake surfaces as a typed error instead of a
//! half-built registry.
//!
//! ## Example
//!
//! ```rust
//! use rotaplan_config::task_registry_from_str;
//!
//! let json = r#"{
//!     "categories": [{"name": "ER", "days_parameter": "Continuous",
//!                     "number_of_weeks": 1, "weekday_revenue": 2500.0,
//!                     "call_revenue": 5000.0, "restricted": false}],
//!     "tasks": [{"category": "ER", "type": "Main", "name": "ER_1",
//!                "week_offset": 0, "heaviness": 5, "mandatory": true}],
//!     "linkage_manager": {}
//! }"#;
//! let registry = task_registry_from_str(json).unwrap();
//! assert_eq!(registry.tasks().len(), 1);
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use thiserror::Error;

use rotaplan_core::{
    Calendar, ConfigError, Physician, PhysicianName, PhysicianRoster, Schedule, Task, TaskCategory,
    TaskRegistry, Unavailability,
};

/// Document-level error
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A loaded schedule that does not describe this problem: unknown
    /// physicians or tasks, or days that are not one contiguous interval.
    #[error("inconsistent schedule: {0}")]
    InconsistentSchedule(String),
}

// ============================================================================
// Task configuration
// ============================================================================

/// On-disk shape of the task configuration.
#[derive(Debug, Serialize, Deserialize)]
struct TaskConfigDoc {
    categories: Vec<TaskCategory>,
    tasks: Vec<Task>,
    linkage_manager: BTreeMap<String, String>,
}

/// Parse a task configuration document into a validated [`TaskRegistry`].
pub fn task_registry_from_str(json: &str) -> Result<TaskRegistry, DocumentError> {
    let doc: TaskConfigDoc = serde_json::from_str(json)?;
    let mut registry = TaskRegistry::new();
    for category in doc.categories {
        registry.add_category(category)?;
    }
    for task in doc.tasks {
        registry.add_task(task)?;
    }
    for (main_name, call_name) in &doc.linkage_manager {
        registry.link_tasks(main_name, call_name)?;
    }
    Ok(registry)
}

pub fn task_registry_to_string(registry: &TaskRegistry) -> Result<String, DocumentError> {
    let doc = TaskConfigDoc {
        categories: registry.categories().cloned().collect(),
        tasks: registry.tasks().to_vec(),
        linkage_manager: registry
            .linkage()
            .iter()
            .map(|(m, c)| (m.to_string(), c.to_string()))
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

pub fn load_task_config(path: &Path) -> Result<TaskRegistry, DocumentError> {
    task_registry_from_str(&std::fs::read_to_string(path)?)
}

pub fn save_task_config(registry: &TaskRegistry, path: &Path) -> Result<(), DocumentError> {
    Ok(std::fs::write(path, task_registry_to_string(registry)?)?)
}

// ============================================================================
// Physician configuration
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct PhysicianConfigDoc {
    physicians: Vec<PhysicianDoc>,
}

// `name` and `initials` are written for readers of the file; the roster
// re-derives both on load.
#[derive(Debug, Serialize, Deserialize)]
struct PhysicianDoc {
    first_name: String,
    last_name: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    initials: String,
    preferred_tasks: Vec<String>,
    discontinuity_preference: bool,
    desired_working_weeks: f64,
    restricted_tasks: Vec<String>,
    exclusion_tasks: Vec<String>,
}

/// Parse a physician configuration document into a validated
/// [`PhysicianRoster`]. Task preferences are checked against `registry`.
pub fn physician_roster_from_str(
    json: &str,
    registry: &TaskRegistry,
) -> Result<PhysicianRoster, DocumentError> {
    let doc: PhysicianConfigDoc = serde_json::from_str(json)?;
    let mut roster = PhysicianRoster::new();
    for p in doc.physicians {
        let physician = Physician::new(
            p.first_name,
            p.last_name,
            p.preferred_tasks,
            p.discontinuity_preference,
            p.desired_working_weeks,
            p.restricted_tasks,
            p.exclusion_tasks,
        )?;
        roster.add_physician(physician, registry)?;
    }
    Ok(roster)
}

pub fn physician_roster_to_string(roster: &PhysicianRoster) -> Result<String, DocumentError> {
    let doc = PhysicianConfigDoc {
        physicians: roster
            .physicians()
            .iter()
            .map(|p| PhysicianDoc {
                first_name: p.first_name.clone(),
                last_name: p.last_name.clone(),
                name: p.name.clone(),
                initials: p.initials.clone(),
                preferred_tasks: p.preferred_tasks.clone(),
                discontinuity_preference: p.discontinuity_preference,
                desired_working_weeks: p.desired_working_weeks,
                restricted_tasks: p.restricted_tasks.clone(),
                exclusion_tasks: p.exclusion_tasks.clone(),
            })
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

pub fn load_physician_config(
    path: &Path,
    registry: &TaskRegistry,
) -> Result<PhysicianRoster, DocumentError> {
    physician_roster_from_str(&std::fs::read_to_string(path)?, registry)
}

pub fn save_physician_config(roster: &PhysicianRoster, path: &Path) -> Result<(), DocumentError> {
    Ok(std::fs::write(path, physician_roster_to_string(roster)?)?)
}

// ============================================================================
// Calendar
// ============================================================================

// The derived day partitions are persisted for human inspection; loading
// recomputes them from (start, end, holidays).
#[derive(Debug, Serialize, Deserialize)]
struct CalendarDoc {
    start_date: NaiveDate,
    end_date: NaiveDate,
    region: String,
    holidays: Vec<NaiveDate>,
    #[serde(default)]
    working_days: Vec<NaiveDate>,
    #[serde(default)]
    weekend_days: Vec<NaiveDate>,
    #[serde(default)]
    call_days: Vec<NaiveDate>,
}

pub fn calendar_from_str(json: &str) -> Result<Calendar, DocumentError> {
    let doc: CalendarDoc = serde_json::from_str(json)?;
    Ok(Calendar::with_holidays(doc.start_date, doc.end_date, doc.region, doc.holidays))
}

pub fn calendar_to_string(calendar: &Calendar) -> Result<String, DocumentError> {
    let doc = CalendarDoc {
        start_date: calendar.start_date,
        end_date: calendar.end_date,
        region: calendar.region.clone(),
        holidays: calendar.holidays().iter().copied().collect(),
        working_days: calendar.working_days().iter().copied().collect(),
        weekend_days: calendar.weekend_days().iter().copied().collect(),
        call_days: calendar.call_days().iter().copied().collect(),
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

pub fn load_calendar(path: &Path) -> Result<Calendar, DocumentError> {
    calendar_from_str(&std::fs::read_to_string(path)?)
}

pub fn save_calendar(calendar: &Calendar, path: &Path) -> Result<(), DocumentError> {
    Ok(std::fs::write(path, calendar_to_string(calendar)?)?)
}

// ============================================================================
// Unavailability
// ============================================================================

/// Parse an unavailability document: a map from physician name to entries
/// that are either a single ISO date string or a `[start, end]` pair.
///
/// Entries of any other shape fail with
/// [`ConfigError::InvalidPeriod`].
pub fn unavailability_from_str(
    json: &str,
) -> Result<HashMap<PhysicianName, Vec<Unavailability>>, DocumentError> {
    let raw: BTreeMap<String, Vec<serde_json::Value>> = serde_json::from_str(json)?;
    let mut table = HashMap::new();
    for (name, entries) in raw {
        let mut periods = Vec::with_capacity(entries.len());
        for entry in entries {
            periods.push(parse_period(&name, &entry)?);
        }
        table.insert(name, periods);
    }
    Ok(table)
}

fn parse_period(name: &str, entry: &serde_json::Value) -> Result<Unavailability, DocumentError> {
    match entry {
        serde_json::Value::String(s) => {
            let day = parse_iso_date(name, s)?;
            Ok(Unavailability::Day(day))
        }
        serde_json::Value::Array(range) if range.len() == 2 => {
            let start = range[0]
                .as_str()
                .ok_or_else(|| invalid_period(name, entry))
                .and_then(|s| parse_iso_date(name, s))?;
            let end = range[1]
                .as_str()
                .ok_or_else(|| invalid_period(name, entry))
                .and_then(|s| parse_iso_date(name, s))?;
            Ok(Unavailability::Range(start, end))
        }
        _ => Err(invalid_period(name, entry)),
    }
}

fn parse_iso_date(name: &str, s: &str) -> Result<NaiveDate, DocumentError> {
    s.parse::<NaiveDate>()
        .map_err(|_| ConfigError::InvalidPeriod(format!("{name}: {s} is not an ISO date")).into())
}

fn invalid_period(name: &str, entry: &serde_json::Value) -> DocumentError {
    ConfigError::InvalidPeriod(format!("{name}: {entry}")).into()
}

pub fn unavailability_to_string(
    table: &HashMap<PhysicianName, Vec<Unavailability>>,
) -> Result<String, DocumentError> {
    let doc: BTreeMap<&str, Vec<serde_json::Value>> = table
        .iter()
        .map(|(name, periods)| {
            let entries = periods
                .iter()
                .map(|p| match p {
                    Unavailability::Day(d) => serde_json::Value::String(d.to_string()),
                    Unavailability::Range(start, end) => serde_json::json!([start, end]),
                })
                .collect();
            (name.as_str(), entries)
        })
        .collect();
    Ok(serde_json::to_string_pretty(&doc)?)
}

pub fn load_unavailability(
    path: &Path,
) -> Result<HashMap<PhysicianName, Vec<Unavailability>>, DocumentError> {
    unavailability_from_str(&std::fs::read_to_string(path)?)
}

pub fn save_unavailability(
    table: &HashMap<PhysicianName, Vec<Unavailability>>,
    path: &Path,
) -> Result<(), DocumentError> {
    Ok(std::fs::write(path, unavailability_to_string(table)?)?)
}

// ============================================================================
// Schedule
// ============================================================================

/// Parse a schedule document and test it against the current problem.
///
/// Unknown physicians or tasks and non-contiguous day lists fail loudly
/// with [`DocumentError::InconsistentSchedule`].
pub fn schedule_from_str(
    json: &str,
    registry: &TaskRegistry,
    roster: &PhysicianRoster,
) -> Result<Schedule, DocumentError> {
    let schedule: Schedule = serde_json::from_str(json)?;
    validate_schedule(&schedule, registry, roster)?;
    Ok(schedule)
}

fn validate_schedule(
    schedule: &Schedule,
    registry: &TaskRegistry,
    roster: &PhysicianRoster,
) -> Result<(), DocumentError> {
    for (physician, assignments) in schedule.iter() {
        if roster.get(physician).is_none() {
            return Err(DocumentError::InconsistentSchedule(format!(
                "physician {physician} is not recognized"
            )));
        }
        for (index, assignment) in assignments.iter().enumerate() {
            let at = format!("task number {} of physician {physician}", index + 1);
            if registry.get_task(&assignment.task).is_none() {
                return Err(DocumentError::InconsistentSchedule(format!(
                    "{at}: task {} is not recognized",
                    assignment.task
                )));
            }
            if assignment.start_date > assignment.end_date {
                return Err(DocumentError::InconsistentSchedule(format!(
                    "{at}: start {} and end {} are not coherent",
                    assignment.start_date, assignment.end_date
                )));
            }
            let days = &assignment.days;
            if days.first() != Some(&assignment.start_date) {
                return Err(DocumentError::InconsistentSchedule(format!(
                    "{at}: first day does not match the start date"
                )));
            }
            if days.last() != Some(&assignment.end_date) {
                return Err(DocumentError::InconsistentSchedule(format!(
                    "{at}: last day does not match the end date"
                )));
            }
            for pair in days.windows(2) {
                if pair[1] != pair[0] + chrono::Days::new(1) {
                    return Err(DocumentError::InconsistentSchedule(format!(
                        "{at}: days are not continuous"
                    )));
                }
            }
        }
    }
    Ok(())
}

pub fn schedule_to_string(schedule: &Schedule) -> Result<String, DocumentError> {
    Ok(serde_json::to_string_pretty(schedule)?)
}

pub fn load_schedule(
    path: &Path,
    registry: &TaskRegistry,
    roster: &PhysicianRoster,
) -> Result<Schedule, DocumentError> {
    schedule_from_str(&std::fs::read_to_string(path)?, registry, roster)
}

pub fn save_schedule(schedule: &Schedule, path: &Path) -> Result<(), DocumentError> {
    Ok(std::fs::write(path, schedule_to_string(schedule)?)?)
}
