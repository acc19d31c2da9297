use super::{PersistenceError, PersistenceResult};
use crate::calendar::{Holiday, NewHoliday};
use crate::placement::{Placement, PlacementKind, ScheduleEntry};
use crate::settings::PlannerSettings;
use crate::slot::{Interval, minutes_to_hhmm};
use crate::task::{NewTask, Priority, Task, TaskStatus};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row, Transaction, TransactionBehavior, params};
use std::str::FromStr;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

/// Retry budget for transactions that hit SQLITE_BUSY from another process
/// sharing the database file.
const BUSY_RETRIES: u32 = 3;

/// SQLite-backed store for the four scheduler relations: tasks, placements,
/// settings and holidays.
///
/// The connection sits behind a mutex, so every transaction — and with it
/// every read-decide-write scheduling sequence — is serialized against all
/// others on this store.
pub struct SqliteStore {
    connection: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<std::path::Path>>(path: P) -> PersistenceResult<Self> {
        let connection = Connection::open(path)?;
        Self::initialize(connection)
    }

    pub fn in_memory() -> PersistenceResult<Self> {
        let connection = Connection::open_in_memory()?;
        Self::initialize(connection)
    }

    fn initialize(connection: Connection) -> PersistenceResult<Self> {
        connection.busy_timeout(Duration::from_millis(250))?;
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn initialize_schema(connection: &Connection) -> PersistenceResult<()> {
        let ddl = r#"
            PRAGMA foreign_keys = ON;
            CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                priority TEXT NOT NULL,
                deadline TEXT NOT NULL,
                estimated_duration INTEGER NOT NULL,
                actual_duration INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL DEFAULT 'pending'
            );
            CREATE TABLE IF NOT EXISTS placements (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                task_id INTEGER REFERENCES tasks(id) ON DELETE CASCADE,
                kind TEXT NOT NULL,
                scheduled_date TEXT NOT NULL,
                start_minute INTEGER NOT NULL,
                end_minute INTEGER NOT NULL,
                duration_minutes INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_placements_date
                ON placements (scheduled_date, start_minute);
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS holidays (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                name TEXT NOT NULL,
                recurring INTEGER NOT NULL DEFAULT 0
            );
        "#;
        connection.execute_batch(ddl)?;
        Ok(())
    }

    /// Run `op` inside an immediate transaction, retrying a bounded number
    /// of times when the database is locked by another process.
    pub fn with_txn<T, F>(&self, mut op: F) -> PersistenceResult<T>
    where
        F: FnMut(&Transaction) -> PersistenceResult<T>,
    {
        let mut conn = self.connection.lock().expect("sqlite mutex poisoned");
        let mut attempts = 0;
        loop {
            let result = Self::run_txn(&mut conn, &mut op);
            match result {
                Err(PersistenceError::Sqlite(err)) if is_busy(&err) => {
                    if attempts >= BUSY_RETRIES {
                        return Err(PersistenceError::Busy);
                    }
                    attempts += 1;
                    thread::sleep(Duration::from_millis(25 * u64::from(attempts)));
                }
                other => return other,
            }
        }
    }

    fn run_txn<T, F>(conn: &mut Connection, op: &mut F) -> PersistenceResult<T>
    where
        F: FnMut(&Transaction) -> PersistenceResult<T>,
    {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = op(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

fn is_busy(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == rusqlite::ErrorCode::DatabaseBusy
                || failure.code == rusqlite::ErrorCode::DatabaseLocked
    )
}

fn parse_date(value: &str) -> PersistenceResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| PersistenceError::InvalidData(format!("malformed date '{value}'")))
}

fn parse_priority(value: &str) -> PersistenceResult<Priority> {
    Priority::from_str(value)
        .map_err(|_| PersistenceError::InvalidData(format!("unknown priority '{value}'")))
}

fn parse_status(value: &str) -> PersistenceResult<TaskStatus> {
    TaskStatus::from_str(value)
        .map_err(|_| PersistenceError::InvalidData(format!("unknown status '{value}'")))
}

// Raw row shapes read inside rusqlite closures; converted to domain types
// once the statement borrow ends.
struct TaskRow {
    id: i64,
    name: String,
    priority: String,
    deadline: String,
    estimated_duration: i64,
    actual_duration: i64,
    status: String,
}

impl TaskRow {
    fn read(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            priority: row.get("priority")?,
            deadline: row.get("deadline")?,
            estimated_duration: row.get("estimated_duration")?,
            actual_duration: row.get("actual_duration")?,
            status: row.get("status")?,
        })
    }

    fn into_task(self) -> PersistenceResult<Task> {
        Ok(Task {
            id: self.id,
            name: self.name,
            priority: parse_priority(&self.priority)?,
            deadline: parse_date(&self.deadline)?,
            estimated_duration: self.estimated_duration,
            actual_duration: self.actual_duration,
            status: parse_status(&self.status)?,
        })
    }
}

struct PlacementRow {
    id: i64,
    task_id: Option<i64>,
    kind: String,
    scheduled_date: String,
    start_minute: i64,
    end_minute: i64,
    duration_minutes: i64,
}

impl PlacementRow {
    fn read(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            task_id: row.get("task_id")?,
            kind: row.get("kind")?,
            scheduled_date: row.get("scheduled_date")?,
            start_minute: row.get("start_minute")?,
            end_minute: row.get("end_minute")?,
            duration_minutes: row.get("duration_minutes")?,
        })
    }

    fn into_placement(self) -> PersistenceResult<Placement> {
        let kind = match (self.kind.as_str(), self.task_id) {
            ("task", Some(task_id)) => PlacementKind::Task(task_id),
            ("commitment", None) => PlacementKind::Commitment,
            (kind, task_id) => {
                return Err(PersistenceError::InvalidData(format!(
                    "placement {} has inconsistent kind '{kind}' / task_id {task_id:?}",
                    self.id
                )));
            }
        };
        Ok(Placement {
            id: self.id,
            kind,
            date: parse_date(&self.scheduled_date)?,
            start_minute: self.start_minute,
            end_minute: self.end_minute,
            duration_minutes: self.duration_minutes,
        })
    }
}

// ---- task relation ----

pub(crate) fn insert_task(conn: &Connection, task: &NewTask) -> PersistenceResult<Task> {
    conn.execute(
        "INSERT INTO tasks (name, priority, deadline, estimated_duration)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            task.name,
            task.priority.as_str(),
            task.deadline.to_string(),
            task.estimated_duration,
        ],
    )?;
    let id = conn.last_insert_rowid();
    Ok(Task {
        id,
        name: task.name.clone(),
        priority: task.priority,
        deadline: task.deadline,
        estimated_duration: task.estimated_duration,
        actual_duration: 0,
        status: TaskStatus::Pending,
    })
}

pub(crate) fn get_task(conn: &Connection, id: i64) -> PersistenceResult<Option<Task>> {
    let row = conn
        .query_row(
            "SELECT id, name, priority, deadline, estimated_duration, actual_duration, status
             FROM tasks WHERE id = ?1",
            params![id],
            TaskRow::read,
        )
        .optional()?;
    row.map(TaskRow::into_task).transpose()
}

pub(crate) fn update_task(conn: &Connection, task: &Task) -> PersistenceResult<bool> {
    let changed = conn.execute(
        "UPDATE tasks
         SET name = ?1, priority = ?2, deadline = ?3, estimated_duration = ?4,
             actual_duration = ?5, status = ?6
         WHERE id = ?7",
        params![
            task.name,
            task.priority.as_str(),
            task.deadline.to_string(),
            task.estimated_duration,
            task.actual_duration,
            task.status.as_str(),
            task.id,
        ],
    )?;
    Ok(changed > 0)
}

pub(crate) fn set_task_status(
    conn: &Connection,
    id: i64,
    status: TaskStatus,
) -> PersistenceResult<bool> {
    let changed = conn.execute(
        "UPDATE tasks SET status = ?1 WHERE id = ?2",
        params![status.as_str(), id],
    )?;
    Ok(changed > 0)
}

pub(crate) fn record_completion(
    conn: &Connection,
    id: i64,
    actual_duration: i64,
) -> PersistenceResult<bool> {
    let changed = conn.execute(
        "UPDATE tasks SET status = 'completed', actual_duration = ?1 WHERE id = ?2",
        params![actual_duration, id],
    )?;
    Ok(changed > 0)
}

pub(crate) fn delete_task(conn: &Connection, id: i64) -> PersistenceResult<bool> {
    let changed = conn.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
    Ok(changed > 0)
}

const TASK_ORDER: &str = "ORDER BY
    CASE priority WHEN 'high' THEN 1 WHEN 'medium' THEN 2 WHEN 'low' THEN 3 END,
    deadline";

fn collect_tasks(conn: &Connection, sql: &str) -> PersistenceResult<Vec<Task>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], TaskRow::read)?;
    let mut tasks = Vec::new();
    for row in rows {
        tasks.push(row?.into_task()?);
    }
    Ok(tasks)
}

/// All tasks, highest scheduling priority first, then nearest deadline.
pub(crate) fn list_tasks(conn: &Connection) -> PersistenceResult<Vec<Task>> {
    collect_tasks(
        conn,
        &format!(
            "SELECT id, name, priority, deadline, estimated_duration, actual_duration, status
             FROM tasks {TASK_ORDER}"
        ),
    )
}

/// Tasks still needing placement during a bulk reschedule.
pub(crate) fn incomplete_tasks(conn: &Connection) -> PersistenceResult<Vec<Task>> {
    collect_tasks(
        conn,
        &format!(
            "SELECT id, name, priority, deadline, estimated_duration, actual_duration, status
             FROM tasks WHERE status != 'completed' {TASK_ORDER}"
        ),
    )
}

// ---- placement relation ----

pub(crate) fn insert_placement(
    conn: &Connection,
    kind: PlacementKind,
    date: NaiveDate,
    interval: Interval,
) -> PersistenceResult<Placement> {
    let kind_str = if kind.is_commitment() {
        "commitment"
    } else {
        "task"
    };
    conn.execute(
        "INSERT INTO placements (task_id, kind, scheduled_date, start_minute, end_minute, duration_minutes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            kind.task_id(),
            kind_str,
            date.to_string(),
            interval.start,
            interval.end,
            interval.duration(),
        ],
    )?;
    Ok(Placement {
        id: conn.last_insert_rowid(),
        kind,
        date,
        start_minute: interval.start,
        end_minute: interval.end,
        duration_minutes: interval.duration(),
    })
}

const PLACEMENT_COLUMNS: &str =
    "id, task_id, kind, scheduled_date, start_minute, end_minute, duration_minutes";

fn collect_placements(
    conn: &Connection,
    sql: &str,
    args: &[&dyn rusqlite::ToSql],
) -> PersistenceResult<Vec<Placement>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(args, PlacementRow::read)?;
    let mut placements = Vec::new();
    for row in rows {
        placements.push(row?.into_placement()?);
    }
    Ok(placements)
}

/// A day's placements ordered by start time; the busy-interval input for
/// the slot finder.
pub(crate) fn placements_for_date(
    conn: &Connection,
    date: NaiveDate,
) -> PersistenceResult<Vec<Placement>> {
    collect_placements(
        conn,
        &format!(
            "SELECT {PLACEMENT_COLUMNS} FROM placements
             WHERE scheduled_date = ?1 ORDER BY start_minute"
        ),
        &[&date.to_string()],
    )
}

pub(crate) fn all_placements(conn: &Connection) -> PersistenceResult<Vec<Placement>> {
    collect_placements(
        conn,
        &format!(
            "SELECT {PLACEMENT_COLUMNS} FROM placements ORDER BY scheduled_date, start_minute"
        ),
        &[],
    )
}

pub(crate) fn placement_for_task(
    conn: &Connection,
    task_id: i64,
) -> PersistenceResult<Option<Placement>> {
    let row = conn
        .query_row(
            &format!("SELECT {PLACEMENT_COLUMNS} FROM placements WHERE task_id = ?1 LIMIT 1"),
            params![task_id],
            PlacementRow::read,
        )
        .optional()?;
    row.map(PlacementRow::into_placement).transpose()
}

/// Same-day placements starting at or after `after_minute`, earliest
/// first. The overrun pass shifts these; earliest-fit packs entries
/// back-to-back, so the boundary is inclusive.
pub(crate) fn placements_after(
    conn: &Connection,
    date: NaiveDate,
    after_minute: i64,
) -> PersistenceResult<Vec<Placement>> {
    collect_placements(
        conn,
        &format!(
            "SELECT {PLACEMENT_COLUMNS} FROM placements
             WHERE scheduled_date = ?1 AND start_minute >= ?2 ORDER BY start_minute"
        ),
        &[&date.to_string(), &after_minute],
    )
}

pub(crate) fn has_commitment(conn: &Connection, date: NaiveDate) -> PersistenceResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM placements WHERE scheduled_date = ?1 AND kind = 'commitment'",
        params![date.to_string()],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub(crate) fn update_placement_interval(
    conn: &Connection,
    id: i64,
    interval: Interval,
) -> PersistenceResult<()> {
    conn.execute(
        "UPDATE placements SET start_minute = ?1, end_minute = ?2 WHERE id = ?3",
        params![interval.start, interval.end, id],
    )?;
    Ok(())
}

pub(crate) fn delete_placement(conn: &Connection, id: i64) -> PersistenceResult<()> {
    conn.execute("DELETE FROM placements WHERE id = ?1", params![id])?;
    Ok(())
}

pub(crate) fn delete_placements_for_task(conn: &Connection, task_id: i64) -> PersistenceResult<()> {
    conn.execute(
        "DELETE FROM placements WHERE task_id = ?1",
        params![task_id],
    )?;
    Ok(())
}

pub(crate) fn clear_placements(conn: &Connection) -> PersistenceResult<()> {
    conn.execute("DELETE FROM placements", [])?;
    Ok(())
}

// ---- schedule view (placements joined with tasks) ----

struct EntryRow {
    placement: PlacementRow,
    task_name: Option<String>,
    priority: Option<String>,
    status: Option<String>,
}

impl EntryRow {
    fn read(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            placement: PlacementRow::read(row)?,
            task_name: row.get("task_name")?,
            priority: row.get("task_priority")?,
            status: row.get("task_status")?,
        })
    }

    fn into_entry(self) -> PersistenceResult<ScheduleEntry> {
        let placement = self.placement.into_placement()?;
        if placement.kind.is_commitment() {
            return Ok(ScheduleEntry::commitment(&placement));
        }
        let task_name = self.task_name.ok_or_else(|| {
            PersistenceError::InvalidData(format!(
                "placement {} references a missing task",
                placement.id
            ))
        })?;
        Ok(ScheduleEntry {
            id: placement.id,
            date: placement.date,
            start_time: minutes_to_hhmm(placement.start_minute),
            end_time: minutes_to_hhmm(placement.end_minute),
            duration_minutes: placement.duration_minutes,
            task_id: placement.kind.task_id(),
            task_name,
            priority: self.priority.as_deref().map(parse_priority).transpose()?,
            status: self.status.as_deref().map(parse_status).transpose()?,
        })
    }
}

const ENTRY_SELECT: &str = "SELECT
    p.id, p.task_id, p.kind, p.scheduled_date, p.start_minute, p.end_minute,
    p.duration_minutes, t.name AS task_name, t.priority AS task_priority,
    t.status AS task_status
    FROM placements p LEFT JOIN tasks t ON p.task_id = t.id";

fn collect_entries(
    conn: &Connection,
    sql: &str,
    args: &[&dyn rusqlite::ToSql],
) -> PersistenceResult<Vec<ScheduleEntry>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(args, EntryRow::read)?;
    let mut entries = Vec::new();
    for row in rows {
        entries.push(row?.into_entry()?);
    }
    Ok(entries)
}

pub(crate) fn schedule_entries(conn: &Connection) -> PersistenceResult<Vec<ScheduleEntry>> {
    collect_entries(
        conn,
        &format!("{ENTRY_SELECT} ORDER BY p.scheduled_date, p.start_minute"),
        &[],
    )
}

pub(crate) fn schedule_entries_for_date(
    conn: &Connection,
    date: NaiveDate,
) -> PersistenceResult<Vec<ScheduleEntry>> {
    collect_entries(
        conn,
        &format!("{ENTRY_SELECT} WHERE p.scheduled_date = ?1 ORDER BY p.start_minute"),
        &[&date.to_string()],
    )
}

// ---- settings relation (key/value) ----

pub(crate) fn load_settings(conn: &Connection) -> PersistenceResult<PlannerSettings> {
    let mut settings = PlannerSettings::default();
    let mut stmt = conn.prepare("SELECT key, value FROM settings")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;
    for row in rows {
        let (key, value) = row?;
        let parsed: i64 = value.parse().map_err(|_| {
            PersistenceError::InvalidData(format!("setting '{key}' has non-numeric value '{value}'"))
        })?;
        match key.as_str() {
            "buffer_minutes" => settings.buffer_minutes = parsed,
            "daily_work_minutes" => settings.daily_work_minutes = parsed,
            "work_start_hour" => settings.work_start_hour = parsed,
            "work_end_hour" => settings.work_end_hour = parsed,
            _ => {}
        }
    }
    Ok(settings)
}

pub(crate) fn save_settings(conn: &Connection, settings: &PlannerSettings) -> PersistenceResult<()> {
    let pairs = [
        ("buffer_minutes", settings.buffer_minutes),
        ("daily_work_minutes", settings.daily_work_minutes),
        ("work_start_hour", settings.work_start_hour),
        ("work_end_hour", settings.work_end_hour),
    ];
    let mut stmt =
        conn.prepare("INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)")?;
    for (key, value) in pairs {
        stmt.execute(params![key, value.to_string()])?;
    }
    Ok(())
}

// ---- holiday relation ----

pub(crate) fn list_holidays(conn: &Connection) -> PersistenceResult<Vec<Holiday>> {
    let mut stmt =
        conn.prepare("SELECT id, date, name, recurring FROM holidays ORDER BY date, id")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, bool>(3)?,
        ))
    })?;
    let mut holidays = Vec::new();
    for row in rows {
        let (id, date, name, recurring) = row?;
        holidays.push(Holiday {
            id,
            date: parse_date(&date)?,
            name,
            recurring,
        });
    }
    Ok(holidays)
}

pub(crate) fn insert_holiday(conn: &Connection, holiday: &NewHoliday) -> PersistenceResult<Holiday> {
    conn.execute(
        "INSERT INTO holidays (date, name, recurring) VALUES (?1, ?2, ?3)",
        params![holiday.date.to_string(), holiday.name, holiday.recurring],
    )?;
    Ok(Holiday {
        id: conn.last_insert_rowid(),
        date: holiday.date,
        name: holiday.name.clone(),
        recurring: holiday.recurring,
    })
}

pub(crate) fn delete_holiday(conn: &Connection, id: i64) -> PersistenceResult<bool> {
    let changed = conn.execute("DELETE FROM holidays WHERE id = ?1", params![id])?;
    Ok(changed > 0)
}
