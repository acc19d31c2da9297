use chrono::{NaiveDate, Weekday};
use chrono::Datelike;
use task_calendar::calendar::{Holiday, WorkCalendar};
use task_calendar::settings::PlannerSettings;
use task_calendar::slot::Interval;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn holiday(id: i64, date: NaiveDate, recurring: bool) -> Holiday {
    Holiday {
        id,
        date,
        name: format!("holiday {id}"),
        recurring,
    }
}

#[test]
fn weekends_are_not_workable() {
    let cal = WorkCalendar::default();
    // 2025-09-06 is a Saturday, 2025-09-07 a Sunday
    assert!(!cal.is_workable(d(2025, 9, 6)));
    assert!(!cal.is_workable(d(2025, 9, 7)));
    assert!(cal.is_workable(d(2025, 9, 8)));
}

#[test]
fn exact_holiday_blocks_only_its_date() {
    let cal = WorkCalendar::from_holidays(&[holiday(1, d(2025, 9, 10), false)]);
    assert!(!cal.is_workable(d(2025, 9, 10)));
    assert!(cal.is_workable(d(2026, 9, 10)));
}

#[test]
fn recurring_holiday_matches_every_year() {
    let cal = WorkCalendar::from_holidays(&[holiday(1, d(2025, 12, 24), true)]);
    assert!(!cal.is_workable(d(2025, 12, 24)));
    assert!(!cal.is_workable(d(2026, 12, 24)));
    assert!(!cal.is_workable(d(2031, 12, 24)));
    assert!(cal.is_workable(d(2025, 12, 23)));
}

#[test]
fn matches_holiday_ignores_weekends() {
    let cal = WorkCalendar::default();
    // A Saturday is non-workable but not a holiday.
    assert!(!cal.is_workable(d(2025, 9, 6)));
    assert!(!cal.matches_holiday(d(2025, 9, 6)));
}

#[test]
fn next_workable_skips_weekend_and_holiday() {
    let cal = WorkCalendar::from_holidays(&[holiday(1, d(2025, 9, 8), false)]);
    // From Friday 2025-09-05: Sat/Sun skipped, Monday is a holiday,
    // Tuesday 2025-09-09 is the next workable day.
    let next = cal.next_workable(d(2025, 9, 5));
    assert_eq!(next, d(2025, 9, 9));
    assert_eq!(next.weekday(), Weekday::Tue);
}

#[test]
fn workable_days_in_range_excludes_weekend() {
    let cal = WorkCalendar::default();
    // Mon 2025-09-01 through Sun 2025-09-07: five workable days.
    let days = cal.workable_days_in_range(d(2025, 9, 1), d(2025, 9, 7));
    assert_eq!(days.len(), 5);
    assert_eq!(days.first().copied().unwrap(), d(2025, 9, 1));
    assert_eq!(days.last().copied().unwrap(), d(2025, 9, 5));
}

#[test]
fn working_window_converts_hours_to_minutes() {
    let settings = PlannerSettings::default();
    assert_eq!(settings.working_window(), Interval::new(540, 1080));

    let custom = PlannerSettings {
        work_start_hour: 8,
        work_end_hour: 16,
        ..PlannerSettings::default()
    };
    assert_eq!(custom.working_window(), Interval::new(480, 960));
}
