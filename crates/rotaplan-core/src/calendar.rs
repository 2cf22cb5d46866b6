//! Scheduling calendar and period segmentation.
//!
//! A [`Calendar`] partitions its horizon into working days (weekdays minus
//! holidays), weekend days, and call days (weekends plus holidays), then
//! segments each calendar week into [`PeriodInterval`]s:
//!
//! - MAIN periods: maximal runs of consecutive working days within a
//!   Mon-Sun week.
//! - CALL periods: maximal runs of consecutive call days, carried across
//!   week boundaries (Sat-Sun-holiday-Monday stays one run) and halved
//!   when four or more days long.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::{holidays, CalendarError};

/// Week-start Monday -> ordered period intervals of that week.
pub type WeekPeriods = BTreeMap<NaiveDate, Vec<PeriodInterval>>;

/// A contiguous block of dates, tagged by duty kind.
///
/// The days are strictly consecutive and non-empty; MAIN days are working
/// days, CALL days are call days.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PeriodInterval {
    Main(Vec<NaiveDate>),
    Call(Vec<NaiveDate>),
}

impl PeriodInterval {
    pub fn days(&self) -> &[NaiveDate] {
        match self {
            PeriodInterval::Main(days) | PeriodInterval::Call(days) => days,
        }
    }

    pub fn is_main(&self) -> bool {
        matches!(self, PeriodInterval::Main(_))
    }

    pub fn is_call(&self) -> bool {
        matches!(self, PeriodInterval::Call(_))
    }

    pub fn start(&self) -> NaiveDate {
        self.days()[0]
    }

    pub fn end(&self) -> NaiveDate {
        *self.days().last().expect("period intervals are non-empty")
    }
}

/// Monday of the week containing the given date.
pub fn week_start_of(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.weekday().num_days_from_monday()))
}

/// A scheduling calendar over an inclusive date range.
#[derive(Clone, Debug, PartialEq)]
pub struct Calendar {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub region: String,
    holidays: BTreeSet<NaiveDate>,
    working_days: BTreeSet<NaiveDate>,
    weekend_days: BTreeSet<NaiveDate>,
    call_days: BTreeSet<NaiveDate>,
}

impl Calendar {
    /// Build a calendar with an explicit holiday list. Holidays outside the
    /// horizon are kept in the holiday set but do not affect the day
    /// partition.
    pub fn with_holidays(
        start_date: NaiveDate,
        end_date: NaiveDate,
        region: impl Into<String>,
        holidays: impl IntoIterator<Item = NaiveDate>,
    ) -> Self {
        let mut calendar = Self {
            start_date,
            end_date,
            region: region.into(),
            holidays: holidays.into_iter().collect(),
            working_days: BTreeSet::new(),
            weekend_days: BTreeSet::new(),
            call_days: BTreeSet::new(),
        };
        calendar.rebuild_day_sets();
        calendar
    }

    /// Build a calendar whose holidays come from the region provider.
    pub fn from_region(
        start_date: NaiveDate,
        end_date: NaiveDate,
        region: impl Into<String>,
    ) -> Result<Self, CalendarError> {
        let region = region.into();
        let holidays = holidays::region_holidays(&region, start_date, end_date)?;
        Ok(Self::with_holidays(start_date, end_date, region, holidays))
    }

    fn rebuild_day_sets(&mut self) {
        self.working_days.clear();
        self.weekend_days.clear();
        self.call_days.clear();
        let mut day = self.start_date;
        while day <= self.end_date {
            let weekend = matches!(day.weekday(), Weekday::Sat | Weekday::Sun);
            let holiday = self.holidays.contains(&day);
            if weekend {
                self.weekend_days.insert(day);
            } else if !holiday {
                self.working_days.insert(day);
            }
            if weekend || holiday {
                self.call_days.insert(day);
            }
            day = day + Days::new(1);
        }
    }

    pub fn add_holiday(&mut self, holiday: NaiveDate) {
        if self.holidays.insert(holiday) {
            self.rebuild_day_sets();
        }
    }

    pub fn remove_holiday(&mut self, holiday: NaiveDate) {
        if self.holidays.remove(&holiday) {
            self.rebuild_day_sets();
        }
    }

    pub fn holidays(&self) -> &BTreeSet<NaiveDate> {
        &self.holidays
    }

    pub fn working_days(&self) -> &BTreeSet<NaiveDate> {
        &self.working_days
    }

    pub fn weekend_days(&self) -> &BTreeSet<NaiveDate> {
        &self.weekend_days
    }

    pub fn call_days(&self) -> &BTreeSet<NaiveDate> {
        &self.call_days
    }

    pub fn is_working_day(&self, day: NaiveDate) -> bool {
        self.working_days.contains(&day)
    }

    pub fn is_call_day(&self, day: NaiveDate) -> bool {
        self.call_days.contains(&day)
    }

    /// Holidays that fall on a weekday (and therefore remove a working day).
    pub fn non_weekend_holidays(&self) -> Vec<NaiveDate> {
        self.holidays
            .iter()
            .copied()
            .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
            .collect()
    }

    /// Segment the horizon into per-week MAIN and CALL periods.
    ///
    /// Pure in the calendar state: a second call returns an identical map.
    pub fn determine_periods(&self) -> WeekPeriods {
        let mut periods: WeekPeriods = BTreeMap::new();
        // First day of each already-added call run, for duplicate drops.
        let mut seen_call_starts: HashSet<NaiveDate> = HashSet::new();
        // A call run that reached the end of the previous week and may
        // continue into the current one.
        let mut carried_call: Vec<NaiveDate> = Vec::new();

        let mut current = self.start_date;
        while current <= self.end_date {
            let week_start = week_start_of(current);
            let week_days: Vec<NaiveDate> = (0..7)
                .map(|i| week_start + Days::new(i))
                .filter(|d| *d <= self.end_date)
                .collect();

            // MAIN runs never cross a week boundary.
            let mut main_run: Vec<NaiveDate> = Vec::new();
            for &day in &week_days {
                if self.working_days.contains(&day) {
                    main_run.push(day);
                } else if !main_run.is_empty() {
                    periods
                        .entry(week_start)
                        .or_default()
                        .push(PeriodInterval::Main(std::mem::take(&mut main_run)));
                }
            }
            if !main_run.is_empty() {
                periods.entry(week_start).or_default().push(PeriodInterval::Main(main_run));
            }

            // CALL runs resume from the carry and close on the first
            // non-call day.
            let mut call_run = std::mem::take(&mut carried_call);
            for &day in &week_days {
                if self.call_days.contains(&day) {
                    call_run.push(day);
                } else if !call_run.is_empty() {
                    self.push_call_run(&mut periods, std::mem::take(&mut call_run), &mut seen_call_starts);
                }
            }
            carried_call = call_run;

            current = week_start + Days::new(7);
        }
        if !carried_call.is_empty() {
            self.push_call_run(&mut periods, carried_call, &mut seen_call_starts);
        }

        periods
    }

    // A completed call run is keyed to the week of its first day and halved
    // when four or more days long.
    fn push_call_run(
        &self,
        periods: &mut WeekPeriods,
        run: Vec<NaiveDate>,
        seen_call_starts: &mut HashSet<NaiveDate>,
    ) {
        let week_start = week_start_of(run[0]);
        if run.len() >= 4 {
            let mid = run.len() / 2;
            let (head, tail) = run.split_at(mid);
            Self::push_single_call(periods, week_start, head.to_vec(), seen_call_starts);
            Self::push_single_call(periods, week_start, tail.to_vec(), seen_call_starts);
        } else {
            Self::push_single_call(periods, week_start, run, seen_call_starts);
        }
    }

    fn push_single_call(
        periods: &mut WeekPeriods,
        week_start: NaiveDate,
        run: Vec<NaiveDate>,
        seen_call_starts: &mut HashSet<NaiveDate>,
    ) {
        if seen_call_starts.insert(run[0]) {
            periods.entry(week_start).or_default().push(PeriodInterval::Call(run));
        }
    }
}
