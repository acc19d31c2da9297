use chrono::NaiveDate;
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use std::io::{self, Write};
use std::str::FromStr;
use task_calendar::{
    NewHoliday, NewTask, Planner, PlannerSettings, Priority, ScheduleEntry, Task,
    load_schedule_from_csv, load_schedule_from_json, save_schedule_to_csv, save_schedule_to_json,
};

fn render_text_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (ci, cell) in row.iter().enumerate() {
            if cell.len() > widths[ci] {
                widths[ci] = cell.len();
            }
        }
    }

    let mut sep = String::new();
    sep.push('+');
    for w in &widths {
        sep.push_str(&"-".repeat(*w + 2));
        sep.push('+');
    }

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    out.push('|');
    for (i, name) in headers.iter().enumerate() {
        out.push(' ');
        out.push_str(name);
        let pad = widths[i] - name.len();
        if pad > 0 {
            out.push_str(&" ".repeat(pad));
        }
        out.push(' ');
        out.push('|');
    }
    out.push('\n');
    out.push_str(&sep);
    out.push('\n');

    for row in rows {
        out.push('|');
        for (ci, cell) in row.iter().enumerate() {
            out.push(' ');
            out.push_str(cell);
            let pad = widths[ci].saturating_sub(cell.len());
            if pad > 0 {
                out.push_str(&" ".repeat(pad));
            }
            out.push(' ');
            out.push('|');
        }
        out.push('\n');
    }
    out.push_str(&sep);
    out.push('\n');
    out
}

fn render_tasks(tasks: &[Task]) -> String {
    let rows: Vec<Vec<String>> = tasks
        .iter()
        .map(|task| {
            vec![
                task.id.to_string(),
                task.name.clone(),
                task.priority.to_string(),
                task.deadline.to_string(),
                task.estimated_duration.to_string(),
                task.actual_duration.to_string(),
                task.status.to_string(),
            ]
        })
        .collect();
    render_text_table(
        &[
            "id",
            "name",
            "priority",
            "deadline",
            "estimated",
            "actual",
            "status",
        ],
        &rows,
    )
}

fn render_schedule(entries: &[ScheduleEntry]) -> String {
    let rows: Vec<Vec<String>> = entries
        .iter()
        .map(|entry| {
            vec![
                entry.id.to_string(),
                entry.date.to_string(),
                entry.start_time.clone(),
                entry.end_time.clone(),
                entry.duration_minutes.to_string(),
                entry.task_name.clone(),
                entry
                    .priority
                    .map(|p| p.to_string())
                    .unwrap_or_default(),
                entry.status.map(|s| s.to_string()).unwrap_or_default(),
            ]
        })
        .collect();
    render_text_table(
        &[
            "id", "date", "start", "end", "minutes", "task", "priority", "status",
        ],
        &rows,
    )
}

fn print_help() {
    println!(
        "Commands:\n  help                                       Show this help\n  tasks                                      List tasks (priority order)\n  add <priority> <deadline> <minutes> <name...>\n                                             Create a task and auto-place it\n  start <id>                                 Mark a task in progress\n  cancel <id>                                Return an in-progress task to pending\n  complete <id> <actual_minutes>             Complete a task (shifts overruns)\n  delete <id>                                Delete a task and its placements\n  schedule [YYYY-MM-DD]                      Show placements (optionally one day)\n  settings show                              Show scheduler settings\n  settings set <buffer> <daily> <start_hour> <end_hour>\n                                             Update scheduler settings\n  holidays                                   List holidays\n  holiday add <YYYY-MM-DD> <name...>         Add a holiday\n  holiday addrec <YYYY-MM-DD> <name...>      Add a yearly-recurring holiday\n  holiday delete <id>                        Remove a holiday\n  reschedule                                 Rebuild the whole schedule\n  save <json|csv> <path>                     Export schedule view to disk\n  load <json|csv> <path>                     Print a schedule export from disk\n  quit|exit                                  Exit"
    );
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

fn show_schedule(planner: &Planner, date: Option<NaiveDate>) {
    let entries = match date {
        Some(date) => planner.list_schedule_for_date(date),
        None => planner.list_schedule(),
    };
    match entries {
        Ok(entries) => println!("{}", render_schedule(&entries)),
        Err(e) => println!("Error: {}", e),
    }
}

fn main() {
    let _ = TermLogger::init(
        LevelFilter::Warn,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    );

    let db_path =
        std::env::var("TASK_CALENDAR_DB").unwrap_or_else(|_| "task-calendar.db".to_string());
    let planner = match Planner::open(&db_path) {
        Ok(planner) => planner,
        Err(e) => {
            eprintln!("Failed to open store at {db_path}: {e}");
            std::process::exit(1);
        }
    };

    println!("Task Calendar (CLI) - type 'help' for commands\n");

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        if stdin.read_line(&mut line).is_err() {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let mut parts = input.split_whitespace();
        let cmd = parts.next().unwrap_or("");

        match cmd {
            "help" => print_help(),
            "quit" | "exit" => break,
            "tasks" => match planner.list_tasks() {
                Ok(tasks) => println!("{}", render_tasks(&tasks)),
                Err(e) => println!("Error: {}", e),
            },
            "add" => {
                let priority_s = parts.next();
                let deadline_s = parts.next();
                let minutes_s = parts.next();
                let name = parts.collect::<Vec<_>>().join(" ");
                match (priority_s, deadline_s, minutes_s) {
                    (Some(priority_s), Some(deadline_s), Some(minutes_s)) if !name.is_empty() => {
                        let Ok(priority) = Priority::from_str(priority_s) else {
                            println!("Invalid priority (high|medium|low)");
                            continue;
                        };
                        let Some(deadline) = parse_date(deadline_s) else {
                            println!("Invalid deadline");
                            continue;
                        };
                        let Ok(estimated_duration) = minutes_s.parse::<i64>() else {
                            println!("Invalid minutes");
                            continue;
                        };
                        match planner.create_task(NewTask {
                            name,
                            priority,
                            deadline,
                            estimated_duration,
                        }) {
                            Ok(task) => match planner.placement_for_task(task.id) {
                                Ok(Some(placement)) => println!(
                                    "Task {} created, placed on {}.",
                                    task.id, placement.date
                                ),
                                Ok(None) => {
                                    println!("Task {} created, no slot available.", task.id)
                                }
                                Err(e) => println!("Error: {}", e),
                            },
                            Err(e) => println!("Error: {}", e),
                        }
                    }
                    _ => println!("Usage: add <priority> <deadline> <minutes> <name...>"),
                }
            }
            "start" | "cancel" | "delete" => {
                let Some(id) = parts.next().and_then(|s| s.parse::<i64>().ok()) else {
                    println!("Usage: {} <id>", cmd);
                    continue;
                };
                let result = match cmd {
                    "start" => planner.start_task(id),
                    "cancel" => planner.cancel_task(id),
                    _ => planner.delete_task(id),
                };
                match result {
                    Ok(()) => println!("ok"),
                    Err(e) => println!("Error: {}", e),
                }
            }
            "complete" => {
                let id_s = parts.next();
                let minutes_s = parts.next();
                match (
                    id_s.and_then(|s| s.parse::<i64>().ok()),
                    minutes_s.and_then(|s| s.parse::<i64>().ok()),
                ) {
                    (Some(id), Some(actual)) => match planner.complete_task(id, actual) {
                        Ok(outcome) => {
                            if outcome.time_overrun {
                                println!(
                                    "Completed with overrun; later placements were adjusted."
                                );
                            } else {
                                println!("Completed.");
                            }
                        }
                        Err(e) => println!("Error: {}", e),
                    },
                    _ => println!("Usage: complete <id> <actual_minutes>"),
                }
            }
            "schedule" => match parts.next() {
                Some(date_s) => match parse_date(date_s) {
                    Some(date) => show_schedule(&planner, Some(date)),
                    None => println!("Invalid date"),
                },
                None => show_schedule(&planner, None),
            },
            "settings" => match parts.next() {
                Some("show") | None => match planner.settings() {
                    Ok(settings) => {
                        println!("buffer_minutes     : {}", settings.buffer_minutes);
                        println!("daily_work_minutes : {}", settings.daily_work_minutes);
                        println!("work_start_hour    : {}", settings.work_start_hour);
                        println!("work_end_hour      : {}", settings.work_end_hour);
                    }
                    Err(e) => println!("Error: {}", e),
                },
                Some("set") => {
                    let values: Vec<i64> = parts.filter_map(|s| s.parse().ok()).collect();
                    if values.len() != 4 {
                        println!("Usage: settings set <buffer> <daily> <start_hour> <end_hour>");
                        continue;
                    }
                    let settings = PlannerSettings {
                        buffer_minutes: values[0],
                        daily_work_minutes: values[1],
                        work_start_hour: values[2],
                        work_end_hour: values[3],
                    };
                    match planner.put_settings(settings) {
                        Ok(()) => println!("Settings saved. Run 'reschedule' to apply."),
                        Err(e) => println!("Error: {}", e),
                    }
                }
                _ => println!("Usage: settings show | settings set ..."),
            },
            "holidays" => match planner.list_holidays() {
                Ok(holidays) => {
                    for holiday in holidays {
                        let marker = if holiday.recurring { " (yearly)" } else { "" };
                        println!("{:>4}  {}  {}{}", holiday.id, holiday.date, holiday.name, marker);
                    }
                }
                Err(e) => println!("Error: {}", e),
            },
            "holiday" => match parts.next() {
                Some(sub @ ("add" | "addrec")) => {
                    let date_s = parts.next();
                    let name = parts.collect::<Vec<_>>().join(" ");
                    match date_s.and_then(parse_date) {
                        Some(date) if !name.is_empty() => {
                            let new_holiday = NewHoliday {
                                date,
                                name,
                                recurring: sub == "addrec",
                            };
                            match planner.add_holiday(new_holiday) {
                                Ok(holiday) => println!("Holiday {} added.", holiday.id),
                                Err(e) => println!("Error: {}", e),
                            }
                        }
                        _ => println!("Usage: holiday {} <YYYY-MM-DD> <name...>", sub),
                    }
                }
                Some("delete") => {
                    match parts.next().and_then(|s| s.parse::<i64>().ok()) {
                        Some(id) => match planner.delete_holiday(id) {
                            Ok(()) => println!("ok"),
                            Err(e) => println!("Error: {}", e),
                        },
                        None => println!("Usage: holiday delete <id>"),
                    }
                }
                _ => println!("Usage: holiday add|addrec|delete ..."),
            },
            "reschedule" => match planner.reschedule_all() {
                Ok(summary) => println!("Rescheduled ({})", summary.to_cli_summary()),
                Err(e) => println!("Error: {}", e),
            },
            "save" => {
                let format = parts.next();
                let path = parts.next();
                match (format, path) {
                    (Some(format @ ("json" | "csv")), Some(path)) => {
                        let entries = match planner.list_schedule() {
                            Ok(entries) => entries,
                            Err(e) => {
                                println!("Error: {}", e);
                                continue;
                            }
                        };
                        let result = if format == "json" {
                            save_schedule_to_json(&entries, path)
                        } else {
                            save_schedule_to_csv(&entries, path)
                        };
                        match result {
                            Ok(()) => println!("Saved {} entries to {}", entries.len(), path),
                            Err(e) => println!("Error: {}", e),
                        }
                    }
                    _ => println!("Usage: save <json|csv> <path>"),
                }
            }
            "load" => {
                let format = parts.next();
                let path = parts.next();
                match (format, path) {
                    (Some(format @ ("json" | "csv")), Some(path)) => {
                        let loaded = if format == "json" {
                            load_schedule_from_json(path)
                        } else {
                            load_schedule_from_csv(path)
                        };
                        match loaded {
                            Ok(entries) => println!("{}", render_schedule(&entries)),
                            Err(e) => println!("Error: {}", e),
                        }
                    }
                    _ => println!("Usage: load <json|csv> <path>"),
                }
            }
            other => println!("Unknown command '{}'. Type 'help'.", other),
        }
    }
}
