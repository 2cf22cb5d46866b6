//! Regional holiday provider.
//!
//! Pure lookup from `(region, year range)` to a set of holiday dates for
//! the regions the scheduler ships with: `Canada/QC`, `Canada/ON`,
//! `USA/CA`, `USA/NY`. Statutory holidays that land on a weekend also
//! contribute their observed weekday, since the observed day is the one
//! that removes a working day from the calendar.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use std::collections::BTreeSet;

use crate::CalendarError;

/// Holidays of `region` intersected with the inclusive `[start, end]` range.
///
/// Unknown regions fail with [`CalendarError::UnsupportedRegion`].
pub fn region_holidays(
    region: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<BTreeSet<NaiveDate>, CalendarError> {
    let mut holidays = BTreeSet::new();
    for year in start.year()..=end.year() {
        let year_holidays = match region {
            "Canada/QC" => quebec_holidays(year),
            "Canada/ON" => ontario_holidays(year),
            "USA/CA" => california_holidays(year),
            "USA/NY" => new_york_holidays(year),
            other => return Err(CalendarError::UnsupportedRegion(other.to_string())),
        };
        holidays.extend(year_holidays);
    }
    holidays.retain(|d| *d >= start && *d <= end);
    Ok(holidays)
}

/// True if the region identifier is one the provider knows.
pub fn is_supported_region(region: &str) -> bool {
    matches!(region, "Canada/QC" | "Canada/ON" | "USA/CA" | "USA/NY")
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid hard-coded calendar date")
}

/// Nth given weekday of a month (n starting at 1).
fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u8) -> NaiveDate {
    NaiveDate::from_weekday_of_month_opt(year, month, weekday, n)
        .expect("requested weekday occurrence exists")
}

/// Last given weekday of a month.
fn last_weekday(year: i32, month: u32, weekday: Weekday) -> NaiveDate {
    let mut day = match NaiveDate::from_ymd_opt(year, month + 1, 1) {
        Some(next_month_first) => next_month_first - Days::new(1),
        None => ymd(year, 12, 31),
    };
    while day.weekday() != weekday {
        day = day - Days::new(1);
    }
    day
}

/// Easter Sunday by the anonymous Gregorian computus.
fn easter_sunday(year: i32) -> NaiveDate {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    ymd(year, month as u32, day as u32)
}

/// Monday on or before May 24 (Victoria Day / National Patriots' Day).
fn monday_before_may_25(year: i32) -> NaiveDate {
    let mut day = ymd(year, 5, 24);
    while day.weekday() != Weekday::Mon {
        day = day - Days::new(1);
    }
    day
}

// Canadian observance: weekend holidays shift to the following Monday
// (Saturday Boxing-Day style carry lands on Monday as well).
fn push_with_canadian_observed(set: &mut BTreeSet<NaiveDate>, date: NaiveDate) {
    set.insert(date);
    match date.weekday() {
        Weekday::Sat => {
            set.insert(date + Days::new(2));
        }
        Weekday::Sun => {
            set.insert(date + Days::new(1));
        }
        _ => {}
    }
}

// US observance: Saturday holidays shift to Friday, Sunday holidays to
// Monday.
fn push_with_us_observed(set: &mut BTreeSet<NaiveDate>, date: NaiveDate) {
    set.insert(date);
    match date.weekday() {
        Weekday::Sat => {
            set.insert(date - Days::new(1));
        }
        Weekday::Sun => {
            set.insert(date + Days::new(1));
        }
        _ => {}
    }
}

fn canada_common(year: i32) -> BTreeSet<NaiveDate> {
    let mut set = BTreeSet::new();
    push_with_canadian_observed(&mut set, ymd(year, 1, 1));
    set.insert(easter_sunday(year) - Days::new(2)); // Good Friday
    push_with_canadian_observed(&mut set, ymd(year, 7, 1)); // Canada Day
    set.insert(nth_weekday(year, 9, Weekday::Mon, 1)); // Labour Day
    set.insert(nth_weekday(year, 10, Weekday::Mon, 2)); // Thanksgiving
    push_with_canadian_observed(&mut set, ymd(year, 12, 25));
    set
}

fn quebec_holidays(year: i32) -> BTreeSet<NaiveDate> {
    let mut set = canada_common(year);
    set.insert(easter_sunday(year) + Days::new(1)); // Easter Monday
    set.insert(monday_before_may_25(year)); // National Patriots' Day
    push_with_canadian_observed(&mut set, ymd(year, 6, 24)); // St-Jean-Baptiste
    set
}

fn ontario_holidays(year: i32) -> BTreeSet<NaiveDate> {
    let mut set = canada_common(year);
    set.insert(nth_weekday(year, 2, Weekday::Mon, 3)); // Family Day
    set.insert(monday_before_may_25(year)); // Victoria Day
    push_with_canadian_observed(&mut set, ymd(year, 12, 26)); // Boxing Day
    set
}

fn us_common(year: i32) -> BTreeSet<NaiveDate> {
    let mut set = BTreeSet::new();
    push_with_us_observed(&mut set, ymd(year, 1, 1));
    set.insert(nth_weekday(year, 1, Weekday::Mon, 3)); // Martin Luther King Jr. Day
    set.insert(nth_weekday(year, 2, Weekday::Mon, 3)); // Washington's Birthday
    set.insert(last_weekday(year, 5, Weekday::Mon)); // Memorial Day
    if year >= 2021 {
        push_with_us_observed(&mut set, ymd(year, 6, 19)); // Juneteenth
    }
    push_with_us_observed(&mut set, ymd(year, 7, 4)); // Independence Day
    set.insert(nth_weekday(year, 9, Weekday::Mon, 1)); // Labor Day
    push_with_us_observed(&mut set, ymd(year, 11, 11)); // Veterans Day
    set.insert(nth_weekday(year, 11, Weekday::Thu, 4)); // Thanksgiving
    push_with_us_observed(&mut set, ymd(year, 12, 25));
    set
}

fn california_holidays(year: i32) -> BTreeSet<NaiveDate> {
    let mut set = us_common(year);
    push_with_us_observed(&mut set, ymd(year, 3, 31)); // Cesar Chavez Day
    set.insert(nth_weekday(year, 11, Weekday::Thu, 4) + Days::new(1)); // Day after Thanksgiving
    set
}

fn new_york_holidays(year: i32) -> BTreeSet<NaiveDate> {
    let mut set = us_common(year);
    push_with_us_observed(&mut set, ymd(year, 2, 12)); // Lincoln's Birthday
    set.insert(nth_weekday(year, 10, Weekday::Mon, 2)); // Columbus Day
    set.insert(nth_weekday(year, 11, Weekday::Mon, 1) + Days::new(1)); // Election Day
    set
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn unknown_region_is_rejected() {
        let err = region_holidays("Atlantis/XX", d(2023, 1, 1), d(2023, 12, 31));
        assert!(matches!(err, Err(CalendarError::UnsupportedRegion(_))));
        assert!(!is_supported_region("Atlantis/XX"));
        assert!(is_supported_region("Canada/QC"));
    }

    #[test]
    fn easter_computus_known_years() {
        assert_eq!(easter_sunday(2023), d(2023, 4, 9));
        assert_eq!(easter_sunday(2024), d(2024, 3, 31));
        assert_eq!(easter_sunday(2025), d(2025, 4, 20));
    }

    #[test]
    fn quebec_2023_well_known_dates() {
        let holidays = region_holidays("Canada/QC", d(2023, 1, 1), d(2023, 12, 31)).unwrap();
        assert!(holidays.contains(&d(2023, 1, 1)));
        // New Year 2023 fell on a Sunday; Monday Jan 2 is observed.
        assert!(holidays.contains(&d(2023, 1, 2)));
        assert!(holidays.contains(&d(2023, 4, 7))); // Good Friday
        assert!(holidays.contains(&d(2023, 4, 10))); // Easter Monday
        assert!(holidays.contains(&d(2023, 5, 22))); // National Patriots' Day
        assert!(holidays.contains(&d(2023, 6, 24))); // St-Jean-Baptiste
        assert!(holidays.contains(&d(2023, 7, 1)));
        assert!(holidays.contains(&d(2023, 9, 4))); // Labour Day
        assert!(holidays.contains(&d(2023, 10, 9))); // Thanksgiving
        assert!(holidays.contains(&d(2023, 12, 25)));
    }

    #[test]
    fn ontario_has_family_and_boxing_day() {
        let holidays = region_holidays("Canada/ON", d(2023, 1, 1), d(2023, 12, 31)).unwrap();
        assert!(holidays.contains(&d(2023, 2, 20))); // Family Day
        assert!(holidays.contains(&d(2023, 5, 22))); // Victoria Day
        assert!(holidays.contains(&d(2023, 12, 26))); // Boxing Day
        assert!(!holidays.contains(&d(2023, 6, 24))); // St-Jean is QC only
    }

    #[test]
    fn us_2023_well_known_dates() {
        let holidays = region_holidays("USA/NY", d(2023, 1, 1), d(2023, 12, 31)).unwrap();
        assert!(holidays.contains(&d(2023, 1, 2))); // New Year observed
        assert!(holidays.contains(&d(2023, 1, 16))); // MLK Day
        assert!(holidays.contains(&d(2023, 5, 29))); // Memorial Day
        assert!(holidays.contains(&d(2023, 6, 19))); // Juneteenth
        assert!(holidays.contains(&d(2023, 7, 4)));
        assert!(holidays.contains(&d(2023, 9, 4))); // Labor Day
        assert!(holidays.contains(&d(2023, 11, 23))); // Thanksgiving
        assert!(holidays.contains(&d(2023, 12, 25)));
    }

    #[test]
    fn california_skips_columbus_day() {
        let ca = region_holidays("USA/CA", d(2023, 1, 1), d(2023, 12, 31)).unwrap();
        let ny = region_holidays("USA/NY", d(2023, 1, 1), d(2023, 12, 31)).unwrap();
        assert!(!ca.contains(&d(2023, 10, 9)));
        assert!(ny.contains(&d(2023, 10, 9)));
        assert!(ca.contains(&d(2023, 3, 31))); // Cesar Chavez Day
        assert!(ca.contains(&d(2023, 11, 24))); // Day after Thanksgiving
    }

    #[test]
    fn range_filter_applies() {
        let holidays = region_holidays("Canada/QC", d(2023, 6, 1), d(2023, 7, 31)).unwrap();
        assert!(holidays.contains(&d(2023, 6, 24)));
        assert!(holidays.contains(&d(2023, 7, 1)));
        assert!(!holidays.contains(&d(2023, 1, 1)));
        assert!(!holidays.contains(&d(2023, 12, 25)));
    }
}
