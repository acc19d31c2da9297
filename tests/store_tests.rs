use chrono::NaiveDate;
use task_calendar::{
    NewHoliday, NewTask, Planner, PlannerError, PlannerSettings, Priority, TaskStatus,
};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn planner() -> Planner {
    Planner::in_memory().unwrap().with_today(d(2025, 9, 1))
}

fn new_task(name: &str, minutes: i64) -> NewTask {
    NewTask {
        name: name.into(),
        priority: Priority::Medium,
        deadline: d(2025, 9, 20),
        estimated_duration: minutes,
    }
}

#[test]
fn settings_round_trip() {
    let planner = planner();
    assert_eq!(planner.settings().unwrap(), PlannerSettings::default());

    let custom = PlannerSettings {
        buffer_minutes: 10,
        daily_work_minutes: 90,
        work_start_hour: 8,
        work_end_hour: 17,
    };
    planner.put_settings(custom).unwrap();
    assert_eq!(planner.settings().unwrap(), custom);
}

#[test]
fn invalid_settings_are_rejected() {
    let planner = planner();
    let result = planner.put_settings(PlannerSettings {
        work_start_hour: 18,
        work_end_hour: 9,
        ..PlannerSettings::default()
    });
    assert!(matches!(result, Err(PlannerError::Validation(_))));

    // Commitment longer than the working day.
    let result = planner.put_settings(PlannerSettings {
        daily_work_minutes: 600,
        ..PlannerSettings::default()
    });
    assert!(matches!(result, Err(PlannerError::Validation(_))));

    // Rejected settings must not overwrite the stored ones.
    assert_eq!(planner.settings().unwrap(), PlannerSettings::default());
}

#[test]
fn empty_task_name_is_rejected() {
    let planner = planner();
    let result = planner.create_task(new_task("   ", 60));
    assert!(matches!(result, Err(PlannerError::Validation(_))));
    assert!(planner.list_tasks().unwrap().is_empty());
}

#[test]
fn non_positive_duration_is_rejected() {
    let planner = planner();
    let result = planner.create_task(new_task("Zero", 0));
    assert!(matches!(result, Err(PlannerError::Validation(_))));
}

#[test]
fn missing_task_yields_not_found() {
    let planner = planner();
    assert!(matches!(
        planner.start_task(99),
        Err(PlannerError::NotFound(_))
    ));
    assert!(matches!(
        planner.complete_task(99, 60),
        Err(PlannerError::NotFound(_))
    ));
    assert!(matches!(
        planner.delete_task(99),
        Err(PlannerError::NotFound(_))
    ));
    assert!(planner.get_task(99).unwrap().is_none());
}

#[test]
fn status_transitions_are_persisted() {
    let planner = planner();
    let task = planner.create_task(new_task("Lifecycle", 60)).unwrap();
    assert_eq!(task.status, TaskStatus::Pending);

    planner.start_task(task.id).unwrap();
    assert_eq!(
        planner.get_task(task.id).unwrap().unwrap().status,
        TaskStatus::InProgress
    );

    planner.cancel_task(task.id).unwrap();
    let cancelled = planner.get_task(task.id).unwrap().unwrap();
    assert_eq!(cancelled.status, TaskStatus::Pending);
    assert_eq!(cancelled.actual_duration, 0);

    planner.complete_task(task.id, 55).unwrap();
    let completed = planner.get_task(task.id).unwrap().unwrap();
    assert_eq!(completed.status, TaskStatus::Completed);
    assert_eq!(completed.actual_duration, 55);
}

#[test]
fn tasks_list_orders_by_priority_then_deadline() {
    let planner = planner();
    planner
        .create_task(NewTask {
            name: "Low".into(),
            priority: Priority::Low,
            deadline: d(2025, 9, 5),
            estimated_duration: 30,
        })
        .unwrap();
    planner
        .create_task(NewTask {
            name: "High far".into(),
            priority: Priority::High,
            deadline: d(2025, 9, 25),
            estimated_duration: 30,
        })
        .unwrap();
    planner
        .create_task(NewTask {
            name: "High near".into(),
            priority: Priority::High,
            deadline: d(2025, 9, 10),
            estimated_duration: 30,
        })
        .unwrap();

    let names: Vec<String> = planner
        .list_tasks()
        .unwrap()
        .into_iter()
        .map(|task| task.name)
        .collect();
    assert_eq!(names, vec!["High near", "High far", "Low"]);
}

#[test]
fn holidays_crud() {
    let planner = planner();
    let holiday = planner
        .add_holiday(NewHoliday {
            date: d(2025, 12, 25),
            name: "Christmas".into(),
            recurring: true,
        })
        .unwrap();

    let listed = planner.list_holidays().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "Christmas");
    assert!(listed[0].recurring);

    planner.delete_holiday(holiday.id).unwrap();
    assert!(planner.list_holidays().unwrap().is_empty());
    assert!(matches!(
        planner.delete_holiday(holiday.id),
        Err(PlannerError::NotFound(_))
    ));
}

#[test]
fn blank_holiday_name_is_rejected() {
    let planner = planner();
    let result = planner.add_holiday(NewHoliday {
        date: d(2025, 12, 25),
        name: "".into(),
        recurring: false,
    });
    assert!(matches!(result, Err(PlannerError::Validation(_))));
}

#[test]
fn data_survives_reopening_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("planner.db");

    let task_id;
    {
        let planner = Planner::open(&path).unwrap().with_today(d(2025, 9, 1));
        let task = planner.create_task(new_task("Durable", 60)).unwrap();
        task_id = task.id;
        planner
            .put_settings(PlannerSettings {
                buffer_minutes: 5,
                ..PlannerSettings::default()
            })
            .unwrap();
    }

    let reopened = Planner::open(&path).unwrap().with_today(d(2025, 9, 1));
    let task = reopened.get_task(task_id).unwrap().unwrap();
    assert_eq!(task.name, "Durable");
    assert_eq!(reopened.settings().unwrap().buffer_minutes, 5);
    let placement = reopened.placement_for_task(task_id).unwrap().unwrap();
    assert_eq!(placement.date, d(2025, 9, 1));
}
