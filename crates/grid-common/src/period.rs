//! Weekly publication periods.
//!
//! The lice-pressure service publishes one dataset file per calendar week.
//! A period is derived from a reference date as
//! `week = floor(days_since_year_start / 7)`, so the first seven days of a
//! year compute to week 0. Week 0 does not exist upstream and is remapped
//! through [`WeekPolicy`] (by default to week 52 of the previous year).

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the raw week number 0 is remapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekPolicy {
    /// Week number that replaces a computed week 0.
    #[serde(default = "default_zero_week")]
    pub zero_week_maps_to: u32,

    /// Whether the remapped week belongs to the previous year.
    #[serde(default = "default_previous_year")]
    pub zero_week_uses_previous_year: bool,
}

fn default_zero_week() -> u32 {
    52
}

fn default_previous_year() -> bool {
    true
}

impl Default for WeekPolicy {
    fn default() -> Self {
        Self {
            zero_week_maps_to: default_zero_week(),
            zero_week_uses_previous_year: default_previous_year(),
        }
    }
}

/// A (year, week) pair identifying one period file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Period {
    pub year: i32,
    pub week: u32,
}

impl Period {
    pub fn new(year: i32, week: u32) -> Self {
        Self { year, week }
    }

    /// Period containing `date`.
    pub fn from_date(date: NaiveDate, policy: &WeekPolicy) -> Self {
        let raw_week = date.ordinal0() / 7;
        if raw_week == 0 {
            let year = if policy.zero_week_uses_previous_year {
                date.year() - 1
            } else {
                date.year()
            };
            return Self::new(year, policy.zero_week_maps_to);
        }
        Self::new(date.year(), raw_week)
    }

    /// Period containing the UTC date of `time`.
    pub fn from_datetime(time: DateTime<Utc>, policy: &WeekPolicy) -> Self {
        Self::from_date(time.date_naive(), policy)
    }

    /// The period published just before this one.
    pub fn previous(&self, policy: &WeekPolicy) -> Self {
        if self.week > 1 {
            Self::new(self.year, self.week - 1)
        } else {
            Self::new(self.year - 1, policy.zero_week_maps_to)
        }
    }

    /// This period followed by up to `count - 1` earlier ones, most recent first.
    pub fn history(&self, count: usize, policy: &WeekPolicy) -> Vec<Period> {
        let mut periods = Vec::with_capacity(count);
        let mut current = *self;
        for _ in 0..count {
            periods.push(current);
            current = current.previous(policy);
        }
        periods
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_first_days_of_year_map_to_week_52_of_previous_year() {
        let policy = WeekPolicy::default();
        assert_eq!(Period::from_date(date(2024, 1, 1), &policy), Period::new(2023, 52));
        assert_eq!(Period::from_date(date(2024, 1, 7), &policy), Period::new(2023, 52));
    }

    #[test]
    fn test_week_one_starts_on_day_eight() {
        let policy = WeekPolicy::default();
        assert_eq!(Period::from_date(date(2024, 1, 8), &policy), Period::new(2024, 1));
    }

    #[test]
    fn test_mid_year_week() {
        let policy = WeekPolicy::default();
        // 2024 is a leap year: March 11 is day 70 (0-based)
        assert_eq!(Period::from_date(date(2024, 3, 11), &policy), Period::new(2024, 10));
    }

    #[test]
    fn test_last_day_of_year() {
        let policy = WeekPolicy::default();
        assert_eq!(Period::from_date(date(2023, 12, 31), &policy), Period::new(2023, 52));
    }

    #[test]
    fn test_zero_week_can_stay_in_current_year() {
        let policy = WeekPolicy {
            zero_week_maps_to: 52,
            zero_week_uses_previous_year: false,
        };
        assert_eq!(Period::from_date(date(2024, 1, 3), &policy), Period::new(2024, 52));
    }

    #[test]
    fn test_history_crosses_year_boundary() {
        let policy = WeekPolicy::default();
        let history = Period::new(2024, 2).history(4, &policy);
        assert_eq!(
            history,
            vec![
                Period::new(2024, 2),
                Period::new(2024, 1),
                Period::new(2023, 52),
                Period::new(2023, 51),
            ]
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Period::new(2024, 3).to_string(), "2024-W03");
    }
}
