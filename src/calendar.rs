use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A configured non-working day.
///
/// When `recurring` is set the holiday matches its month and day in every
/// year, not just the stored one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holiday {
    pub id: i64,
    pub date: NaiveDate,
    pub name: String,
    pub recurring: bool,
}

/// Payload for adding a holiday.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewHoliday {
    pub date: NaiveDate,
    pub name: String,
    #[serde(default)]
    pub recurring: bool,
}

/// Answers "is this date workable" for the scheduler.
///
/// Built fresh from the holiday relation at the start of each operation;
/// never cached across calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkCalendar {
    holidays: HashSet<NaiveDate>,
    recurring: HashSet<(u32, u32)>,
    non_working_days: HashSet<Weekday>,
}

impl Default for WorkCalendar {
    fn default() -> Self {
        Self {
            holidays: HashSet::new(),
            recurring: HashSet::new(),
            non_working_days: HashSet::from([Weekday::Sat, Weekday::Sun]),
        }
    }
}

impl WorkCalendar {
    pub fn from_holidays(holidays: &[Holiday]) -> Self {
        let mut calendar = Self::default();
        for holiday in holidays {
            calendar.add_holiday(holiday);
        }
        calendar
    }

    pub fn add_holiday(&mut self, holiday: &Holiday) {
        if holiday.recurring {
            self.recurring
                .insert((holiday.date.month(), holiday.date.day()));
        } else {
            self.holidays.insert(holiday.date);
        }
    }

    /// Holiday test alone, without the weekend rule. Relocation passes use
    /// this to decide whether an existing placement now sits on a holiday.
    pub fn matches_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date) || self.recurring.contains(&(date.month(), date.day()))
    }

    /// Check if a date is available for scheduling.
    pub fn is_workable(&self, date: NaiveDate) -> bool {
        !self.non_working_days.contains(&date.weekday()) && !self.matches_holiday(date)
    }

    /// Find the next workable date strictly after a given date.
    pub fn next_workable(&self, from: NaiveDate) -> NaiveDate {
        let mut current = from + Duration::days(1);
        while !self.is_workable(current) {
            current = current + Duration::days(1);
        }
        current
    }

    /// Get all workable days in a date range (inclusive).
    pub fn workable_days_in_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        let mut days = Vec::new();
        let mut current = start;

        while current <= end {
            if self.is_workable(current) {
                days.push(current);
            }
            current = current + Duration::days(1);
        }
        days
    }
}
