use crate::calendar::{Holiday, NewHoliday, WorkCalendar};
use crate::persistence::{PersistenceError, PersistenceResult, SqliteStore, sqlite};
use crate::placement::{Placement, PlacementKind, ScheduleEntry};
use crate::settings::PlannerSettings;
use crate::slot::{Interval, find_slot};
use crate::task::{CompletionOutcome, NewTask, Task, TaskStatus, TaskUpdate};
use crate::validation::{self, ValidationError};
use chrono::{Duration, Local, NaiveDate};
use log::{debug, info, warn};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Fixed padding added to every task placement on top of the configured
/// global buffer.
const TASK_BUFFER_MINUTES: i64 = 30;
/// Placement searches stop this many days before the deadline when the
/// deadline allows it.
const DEADLINE_MARGIN_DAYS: i64 = 3;
/// Forward search span for relocations and commitment pre-seeding.
const SEARCH_HORIZON_DAYS: i64 = 30;

#[derive(Debug)]
pub enum PlannerError {
    /// Malformed input, rejected before any store mutation.
    Validation(String),
    /// The operation targeted a task or holiday that does not exist.
    NotFound(String),
    /// The store transaction could not be serialized within the retry
    /// budget; the operation may be retried by the caller.
    Conflict(String),
    /// Generic internal store failure.
    Store(PersistenceError),
}

impl PlannerError {
    fn not_found(message: impl Into<String>) -> Self {
        PlannerError::NotFound(message.into())
    }
}

impl fmt::Display for PlannerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlannerError::Validation(message) => write!(f, "validation error: {message}"),
            PlannerError::NotFound(message) => write!(f, "not found: {message}"),
            PlannerError::Conflict(message) => write!(f, "conflict: {message}"),
            PlannerError::Store(err) => write!(f, "store error: {err}"),
        }
    }
}

impl std::error::Error for PlannerError {}

impl From<PersistenceError> for PlannerError {
    fn from(value: PersistenceError) -> Self {
        match value {
            PersistenceError::Busy => {
                PlannerError::Conflict("placement transaction retries exhausted".to_string())
            }
            other => PlannerError::Store(other),
        }
    }
}

impl From<ValidationError> for PlannerError {
    fn from(value: ValidationError) -> Self {
        PlannerError::Validation(value.to_string())
    }
}

pub type PlannerResult<T> = Result<T, PlannerError>;

/// Outcome counts of a bulk reschedule.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RescheduleSummary {
    pub placed: usize,
    pub unplaced: usize,
    pub relocated: usize,
}

impl RescheduleSummary {
    pub fn to_cli_summary(&self) -> String {
        let mut parts = Vec::new();
        parts.push(format!("placed={}", self.placed));
        if self.unplaced > 0 {
            parts.push(format!("unplaced={}", self.unplaced));
        }
        if self.relocated > 0 {
            parts.push(format!("relocated={}", self.relocated));
        }
        parts.join(", ")
    }
}

/// Settings and calendar loaded once at the start of an operation, inside
/// its transaction. Never cached across operations.
struct SchedulingContext {
    settings: PlannerSettings,
    calendar: WorkCalendar,
    window: Interval,
}

impl SchedulingContext {
    fn load(conn: &Connection) -> PersistenceResult<Self> {
        let settings = sqlite::load_settings(conn)?;
        let holidays = sqlite::list_holidays(conn)?;
        Ok(Self::new(settings, WorkCalendar::from_holidays(&holidays)))
    }

    fn new(settings: PlannerSettings, calendar: WorkCalendar) -> Self {
        let window = settings.working_window();
        Self {
            settings,
            calendar,
            window,
        }
    }
}

/// The scheduling facade: owns the store and exposes every externally
/// triggered operation. Each operation runs as a single serialized
/// transaction against the placement relation.
pub struct Planner {
    store: SqliteStore,
    fixed_today: Option<NaiveDate>,
}

impl Planner {
    pub fn open<P: AsRef<Path>>(path: P) -> PlannerResult<Self> {
        Ok(Self {
            store: SqliteStore::new(path)?,
            fixed_today: None,
        })
    }

    pub fn in_memory() -> PlannerResult<Self> {
        Ok(Self {
            store: SqliteStore::in_memory()?,
            fixed_today: None,
        })
    }

    /// Pin "today" to a fixed date. Horizon computations otherwise follow
    /// the wall clock, which makes scheduling outcomes untestable.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.fixed_today = Some(today);
        self
    }

    fn today(&self) -> NaiveDate {
        self.fixed_today
            .unwrap_or_else(|| Local::now().date_naive())
    }

    // ---- task operations ----

    pub fn create_task(&self, new_task: NewTask) -> PlannerResult<Task> {
        validation::validate_new_task(&new_task)?;
        let today = self.today();
        let task = self.store.with_txn(|tx| {
            let task = sqlite::insert_task(tx, &new_task)?;
            let ctx = SchedulingContext::load(tx)?;
            place_task(tx, &task, &ctx, today)?;
            Ok(task)
        })?;
        Ok(task)
    }

    pub fn update_task(&self, id: i64, update: TaskUpdate) -> PlannerResult<Task> {
        validation::validate_task_update(&update)?;
        let today = self.today();
        let updated = self.store.with_txn(|tx| {
            let Some(existing) = sqlite::get_task(tx, id)? else {
                return Ok(None);
            };
            let task = Task {
                id,
                name: update.name.clone(),
                priority: update.priority,
                deadline: update.deadline,
                estimated_duration: update.estimated_duration,
                actual_duration: update.actual_duration.unwrap_or(existing.actual_duration),
                status: update.status.unwrap_or(existing.status),
            };
            sqlite::update_task(tx, &task)?;
            if task.actual_duration > task.estimated_duration {
                let ctx = SchedulingContext::load(tx)?;
                handle_overrun(
                    tx,
                    id,
                    task.actual_duration,
                    task.estimated_duration,
                    &ctx,
                    today,
                )?;
            }
            Ok(Some(task))
        })?;
        updated.ok_or_else(|| PlannerError::not_found(format!("task {id} not found")))
    }

    pub fn start_task(&self, id: i64) -> PlannerResult<()> {
        let changed = self
            .store
            .with_txn(|tx| sqlite::set_task_status(tx, id, TaskStatus::InProgress))?;
        if !changed {
            return Err(PlannerError::not_found(format!("task {id} not found")));
        }
        Ok(())
    }

    /// Cancel in-progress work; the task returns to Pending and no
    /// duration is recorded.
    pub fn cancel_task(&self, id: i64) -> PlannerResult<()> {
        let changed = self
            .store
            .with_txn(|tx| sqlite::set_task_status(tx, id, TaskStatus::Pending))?;
        if !changed {
            return Err(PlannerError::not_found(format!("task {id} not found")));
        }
        Ok(())
    }

    pub fn complete_task(&self, id: i64, actual_duration: i64) -> PlannerResult<CompletionOutcome> {
        validation::validate_actual_duration(actual_duration)?;
        let today = self.today();
        let outcome = self.store.with_txn(|tx| {
            let Some(task) = sqlite::get_task(tx, id)? else {
                return Ok(None);
            };
            sqlite::record_completion(tx, id, actual_duration)?;
            let time_overrun = actual_duration > task.estimated_duration;
            if time_overrun {
                let ctx = SchedulingContext::load(tx)?;
                handle_overrun(
                    tx,
                    id,
                    actual_duration,
                    task.estimated_duration,
                    &ctx,
                    today,
                )?;
            }
            Ok(Some(CompletionOutcome {
                actual_duration,
                time_overrun,
            }))
        })?;
        outcome.ok_or_else(|| PlannerError::not_found(format!("task {id} not found")))
    }

    /// Delete a task and its placements in one transaction.
    pub fn delete_task(&self, id: i64) -> PlannerResult<()> {
        let removed = self.store.with_txn(|tx| {
            sqlite::delete_placements_for_task(tx, id)?;
            sqlite::delete_task(tx, id)
        })?;
        if !removed {
            return Err(PlannerError::not_found(format!("task {id} not found")));
        }
        Ok(())
    }

    pub fn get_task(&self, id: i64) -> PlannerResult<Option<Task>> {
        Ok(self.store.with_txn(|tx| sqlite::get_task(tx, id))?)
    }

    /// All tasks, highest priority first, then nearest deadline.
    pub fn list_tasks(&self) -> PlannerResult<Vec<Task>> {
        Ok(self.store.with_txn(|tx| sqlite::list_tasks(tx))?)
    }

    // ---- schedule queries ----

    pub fn list_schedule(&self) -> PlannerResult<Vec<ScheduleEntry>> {
        Ok(self.store.with_txn(|tx| sqlite::schedule_entries(tx))?)
    }

    pub fn list_schedule_for_date(&self, date: NaiveDate) -> PlannerResult<Vec<ScheduleEntry>> {
        Ok(self
            .store
            .with_txn(|tx| sqlite::schedule_entries_for_date(tx, date))?)
    }

    /// The task's current placement, if any. Placement is best-effort, so
    /// this is how callers discover whether a task actually got a slot.
    pub fn placement_for_task(&self, task_id: i64) -> PlannerResult<Option<Placement>> {
        Ok(self
            .store
            .with_txn(|tx| sqlite::placement_for_task(tx, task_id))?)
    }

    // ---- settings ----

    pub fn settings(&self) -> PlannerResult<PlannerSettings> {
        Ok(self.store.with_txn(|tx| sqlite::load_settings(tx))?)
    }

    pub fn put_settings(&self, settings: PlannerSettings) -> PlannerResult<()> {
        validation::validate_settings(&settings)?;
        Ok(self
            .store
            .with_txn(|tx| sqlite::save_settings(tx, &settings))?)
    }

    // ---- holidays ----

    pub fn list_holidays(&self) -> PlannerResult<Vec<Holiday>> {
        Ok(self.store.with_txn(|tx| sqlite::list_holidays(tx))?)
    }

    /// Add a holiday and relocate every placement that lands on it, so the
    /// calendar never shows work on a non-working day.
    pub fn add_holiday(&self, new_holiday: NewHoliday) -> PlannerResult<Holiday> {
        validation::validate_new_holiday(&new_holiday)?;
        let holiday = self.store.with_txn(|tx| {
            let holiday = sqlite::insert_holiday(tx, &new_holiday)?;
            let ctx = SchedulingContext::load(tx)?;

            // Only dates matching the new holiday need to move.
            let mut added = WorkCalendar::default();
            added.add_holiday(&holiday);

            for placement in sqlite::all_placements(tx)? {
                if !added.matches_holiday(placement.date) {
                    continue;
                }
                let restart = placement.date + Duration::days(1);
                relocate(tx, &placement, restart, &ctx)?;
            }
            Ok(holiday)
        })?;
        info!(
            "added holiday '{}' on {} (recurring: {})",
            holiday.name, holiday.date, holiday.recurring
        );
        Ok(holiday)
    }

    pub fn delete_holiday(&self, id: i64) -> PlannerResult<()> {
        let removed = self.store.with_txn(|tx| sqlite::delete_holiday(tx, id))?;
        if !removed {
            return Err(PlannerError::not_found(format!("holiday {id} not found")));
        }
        Ok(())
    }

    // ---- bulk reschedule ----

    /// Rebuild the entire schedule: clear all placements, pre-seed the
    /// commitment blocks, re-place every incomplete task in priority
    /// order, then move anything now sitting on a holiday.
    pub fn reschedule_all(&self) -> PlannerResult<RescheduleSummary> {
        let today = self.today();
        let summary = self.store.with_txn(|tx| {
            let ctx = SchedulingContext::load(tx)?;
            sqlite::clear_placements(tx)?;

            if ctx.settings.daily_work_minutes > 0 {
                let horizon_end = today + Duration::days(SEARCH_HORIZON_DAYS);
                for day in ctx.calendar.workable_days_in_range(today, horizon_end) {
                    ensure_commitment(tx, day, &ctx)?;
                }
            }

            let mut summary = RescheduleSummary::default();
            for task in sqlite::incomplete_tasks(tx)? {
                match place_task(tx, &task, &ctx, today)? {
                    Some(_) => summary.placed += 1,
                    None => summary.unplaced += 1,
                }
            }

            // Re-derive the holiday set: it may have changed since the
            // placements above were seeded from an earlier configuration.
            let holidays = sqlite::list_holidays(tx)?;
            let ctx = SchedulingContext::new(ctx.settings, WorkCalendar::from_holidays(&holidays));
            for placement in sqlite::all_placements(tx)? {
                if placement.kind.is_commitment() {
                    continue;
                }
                if ctx.calendar.matches_holiday(placement.date) {
                    let restart = placement.date + Duration::days(1);
                    relocate(tx, &placement, restart, &ctx)?;
                    summary.relocated += 1;
                }
            }
            Ok(summary)
        })?;
        info!("bulk reschedule: {}", summary.to_cli_summary());
        Ok(summary)
    }
}

// ---- placement engine ----

/// Place one task inside `[today, deadline - margin]`, best-effort. The
/// task stays unplaced when no day in the horizon has a wide-enough gap.
fn place_task(
    conn: &Connection,
    task: &Task,
    ctx: &SchedulingContext,
    today: NaiveDate,
) -> PersistenceResult<Option<Placement>> {
    let mut horizon_end = task.deadline - Duration::days(DEADLINE_MARGIN_DAYS);
    if horizon_end < today {
        // Deadline too close for the margin; search right up to it.
        horizon_end = task.deadline;
    }
    let duration = task.estimated_duration + TASK_BUFFER_MINUTES + ctx.settings.buffer_minutes;

    let placed = search_horizon(
        conn,
        PlacementKind::Task(task.id),
        duration,
        today,
        horizon_end,
        ctx,
    )?;
    match &placed {
        Some(placement) => debug!(
            "placed task {} on {} at {}..{}",
            task.id, placement.date, placement.start_minute, placement.end_minute
        ),
        None => warn!(
            "no slot for task {} ({duration} min) before {horizon_end}",
            task.id
        ),
    }
    Ok(placed)
}

/// Scan days from `from` through `to`, skipping non-workable ones, and
/// insert a placement in the earliest gap found. Seeds the day's
/// commitment block before measuring the day's free time.
fn search_horizon(
    conn: &Connection,
    kind: PlacementKind,
    duration: i64,
    from: NaiveDate,
    to: NaiveDate,
    ctx: &SchedulingContext,
) -> PersistenceResult<Option<Placement>> {
    let mut day = from;
    while day <= to {
        if !ctx.calendar.is_workable(day) {
            day = day + Duration::days(1);
            continue;
        }
        ensure_commitment(conn, day, ctx)?;

        let busy: Vec<Interval> = sqlite::placements_for_date(conn, day)?
            .iter()
            .map(Placement::interval)
            .collect();
        if let Some(slot) = find_slot(&busy, ctx.window, duration) {
            let placement = sqlite::insert_placement(conn, kind, day, slot)?;
            return Ok(Some(placement));
        }
        day = day + Duration::days(1);
    }
    Ok(None)
}

/// Insert the recurring commitment block at the start of the working
/// window unless the day already has one or the commitment is disabled.
fn ensure_commitment(
    conn: &Connection,
    date: NaiveDate,
    ctx: &SchedulingContext,
) -> PersistenceResult<()> {
    if ctx.settings.daily_work_minutes <= 0 {
        return Ok(());
    }
    if sqlite::has_commitment(conn, date)? {
        return Ok(());
    }
    let interval = Interval::new(
        ctx.window.start,
        ctx.window.start + ctx.settings.daily_work_minutes,
    );
    sqlite::insert_placement(conn, PlacementKind::Commitment, date, interval)?;
    Ok(())
}

/// Shift the completed task's same-day successors forward by the overrun.
/// An entry that would spill past the window end is relocated to a later
/// day instead.
///
/// Single pass: a shifted entry is not re-checked against the entries
/// after it, so a shift can leave a transitive collision behind. Known
/// limitation, kept as-is.
fn handle_overrun(
    conn: &Connection,
    task_id: i64,
    actual_duration: i64,
    estimated_duration: i64,
    ctx: &SchedulingContext,
    today: NaiveDate,
) -> PersistenceResult<()> {
    let overrun = actual_duration - estimated_duration;
    let Some(placement) = sqlite::placement_for_task(conn, task_id)? else {
        return Ok(());
    };

    let later = sqlite::placements_after(conn, placement.date, placement.end_minute)?;
    for entry in later {
        let shifted = Interval::new(entry.start_minute + overrun, entry.end_minute + overrun);
        if shifted.end > ctx.window.end {
            debug!(
                "placement {} would spill past the window; relocating",
                entry.id
            );
            relocate(conn, &entry, today + Duration::days(1), ctx)?;
        } else {
            sqlite::update_placement_interval(conn, entry.id, shifted)?;
        }
    }
    Ok(())
}

/// Delete a placement and search the next `SEARCH_HORIZON_DAYS` days for a
/// new slot of the same duration. Commitment placements are only deleted:
/// every eligible day already carries its own block, so re-inserting one
/// elsewhere would duplicate it.
fn relocate(
    conn: &Connection,
    placement: &Placement,
    from: NaiveDate,
    ctx: &SchedulingContext,
) -> PersistenceResult<Option<Placement>> {
    sqlite::delete_placement(conn, placement.id)?;
    if placement.kind.is_commitment() {
        return Ok(None);
    }
    let to = from + Duration::days(SEARCH_HORIZON_DAYS);
    let moved = search_horizon(
        conn,
        placement.kind,
        placement.duration_minutes,
        from,
        to,
        ctx,
    )?;
    if moved.is_none() {
        warn!(
            "placement {} for task {:?} could not be relocated; leaving unplaced",
            placement.id,
            placement.kind.task_id()
        );
    }
    Ok(moved)
}
