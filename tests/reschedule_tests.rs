use chrono::NaiveDate;
use task_calendar::{NewHoliday, NewTask, Planner, PlannerSettings, Priority};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn planner() -> Planner {
    // Monday
    Planner::in_memory().unwrap().with_today(d(2025, 9, 1))
}

fn new_task(name: &str, priority: Priority, deadline: NaiveDate, minutes: i64) -> NewTask {
    NewTask {
        name: name.into(),
        priority,
        deadline,
        estimated_duration: minutes,
    }
}

#[test]
fn high_priority_wins_over_nearer_deadline() {
    let planner = planner();
    // The low-priority task has the nearer deadline but was created first;
    // after a rebuild the high-priority task must hold the earlier slot.
    let low = planner
        .create_task(new_task("Low soon", Priority::Low, d(2025, 9, 3), 60))
        .unwrap();
    let high = planner
        .create_task(new_task("High later", Priority::High, d(2025, 9, 10), 60))
        .unwrap();

    let summary = planner.reschedule_all().unwrap();
    assert_eq!(summary.placed, 2);
    assert_eq!(summary.unplaced, 0);

    let p_high = planner.placement_for_task(high.id).unwrap().unwrap();
    let p_low = planner.placement_for_task(low.id).unwrap().unwrap();
    assert_eq!(p_high.start_minute, 540);
    assert_eq!(p_low.start_minute, p_high.end_minute);
}

#[test]
fn same_priority_orders_by_deadline() {
    let planner = planner();
    let later = planner
        .create_task(new_task("Later", Priority::Medium, d(2025, 9, 20), 60))
        .unwrap();
    let sooner = planner
        .create_task(new_task("Sooner", Priority::Medium, d(2025, 9, 10), 60))
        .unwrap();

    planner.reschedule_all().unwrap();

    let p_sooner = planner.placement_for_task(sooner.id).unwrap().unwrap();
    let p_later = planner.placement_for_task(later.id).unwrap().unwrap();
    assert!(
        (p_sooner.date, p_sooner.start_minute) < (p_later.date, p_later.start_minute),
        "sooner deadline must be placed first"
    );
}

#[test]
fn completed_tasks_are_not_replaced() {
    let planner = planner();
    let done = planner
        .create_task(new_task("Done", Priority::High, d(2025, 9, 10), 60))
        .unwrap();
    planner.complete_task(done.id, 60).unwrap();

    let summary = planner.reschedule_all().unwrap();
    assert_eq!(summary.placed, 0);
    assert!(planner.placement_for_task(done.id).unwrap().is_none());
}

#[test]
fn rebuild_seeds_commitments_over_the_horizon() {
    let planner = planner();
    planner
        .put_settings(PlannerSettings {
            daily_work_minutes: 60,
            ..PlannerSettings::default()
        })
        .unwrap();

    planner.reschedule_all().unwrap();

    let entries = planner.list_schedule().unwrap();
    let commitments: Vec<_> = entries
        .iter()
        .filter(|entry| entry.task_id.is_none())
        .collect();
    // [2025-09-01, 2025-10-01] holds 23 weekdays.
    assert_eq!(commitments.len(), 23);
    for entry in &commitments {
        assert_eq!(entry.start_time, "09:00");
        assert_eq!(entry.end_time, "10:00");
    }
    let mut dates: Vec<_> = commitments.iter().map(|entry| entry.date).collect();
    let before = dates.len();
    dates.sort();
    dates.dedup();
    assert_eq!(dates.len(), before, "one commitment per day");
}

#[test]
fn adding_a_holiday_moves_work_off_that_day() {
    let planner = planner();
    let task = planner
        .create_task(new_task("Movable", Priority::High, d(2025, 9, 20), 60))
        .unwrap();
    let before = planner.placement_for_task(task.id).unwrap().unwrap();
    assert_eq!(before.date, d(2025, 9, 1));

    planner
        .add_holiday(NewHoliday {
            date: d(2025, 9, 1),
            name: "Surprise closure".into(),
            recurring: false,
        })
        .unwrap();

    let after = planner.placement_for_task(task.id).unwrap().unwrap();
    assert_eq!(after.date, d(2025, 9, 2));
    assert_eq!(after.duration_minutes, before.duration_minutes);
}

#[test]
fn recurring_holiday_moves_matching_dates_in_any_year() {
    let planner = planner();
    let task = planner
        .create_task(new_task("Movable", Priority::High, d(2025, 9, 20), 60))
        .unwrap();

    // Recurring Sep 1 stored with a different year still matches today.
    planner
        .add_holiday(NewHoliday {
            date: d(2020, 9, 1),
            name: "Founding day".into(),
            recurring: true,
        })
        .unwrap();

    let after = planner.placement_for_task(task.id).unwrap().unwrap();
    assert_eq!(after.date, d(2025, 9, 2));
}

#[test]
fn rebuild_relocates_placements_landing_on_holidays() {
    let planner = planner();
    let task = planner
        .create_task(new_task("Movable", Priority::High, d(2025, 9, 20), 60))
        .unwrap();
    planner
        .add_holiday(NewHoliday {
            date: d(2025, 9, 2),
            name: "Mid-week holiday".into(),
            recurring: false,
        })
        .unwrap();

    planner.reschedule_all().unwrap();

    let placement = planner.placement_for_task(task.id).unwrap().unwrap();
    assert_ne!(placement.date, d(2025, 9, 2));
}

#[test]
fn deleting_a_task_removes_its_placement() {
    let planner = planner();
    let task = planner
        .create_task(new_task("Short lived", Priority::Medium, d(2025, 9, 20), 60))
        .unwrap();
    assert!(planner.placement_for_task(task.id).unwrap().is_some());

    planner.delete_task(task.id).unwrap();

    assert!(planner.get_task(task.id).unwrap().is_none());
    assert!(planner.placement_for_task(task.id).unwrap().is_none());
    assert!(planner.list_schedule().unwrap().is_empty());
}
