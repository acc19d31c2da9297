use super::{PersistenceError, PersistenceResult};
use crate::placement::ScheduleEntry;
use crate::task::{Priority, TaskStatus};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use std::str::FromStr;

#[derive(Serialize, Deserialize)]
struct ScheduleSnapshot {
    entries: Vec<ScheduleEntry>,
}

/// Export the joined schedule view for external tooling.
pub fn save_schedule_to_json<P: AsRef<Path>>(
    entries: &[ScheduleEntry],
    path: P,
) -> PersistenceResult<()> {
    let snapshot = ScheduleSnapshot {
        entries: entries.to_vec(),
    };
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, &snapshot)?;
    Ok(())
}

pub fn load_schedule_from_json<P: AsRef<Path>>(path: P) -> PersistenceResult<Vec<ScheduleEntry>> {
    let file = File::open(path)?;
    let snapshot: ScheduleSnapshot = serde_json::from_reader(file)?;
    Ok(snapshot.entries)
}

#[derive(Default, Serialize, Deserialize)]
struct EntryCsvRecord {
    id: i64,
    date: String,
    start_time: String,
    end_time: String,
    duration_minutes: i64,
    task_id: String,
    task_name: String,
    priority: String,
    status: String,
}

impl From<&ScheduleEntry> for EntryCsvRecord {
    fn from(entry: &ScheduleEntry) -> Self {
        Self {
            id: entry.id,
            date: entry.date.to_string(),
            start_time: entry.start_time.clone(),
            end_time: entry.end_time.clone(),
            duration_minutes: entry.duration_minutes,
            task_id: entry
                .task_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
            task_name: entry.task_name.clone(),
            priority: entry
                .priority
                .map(|p| p.as_str().to_string())
                .unwrap_or_default(),
            status: entry
                .status
                .map(|s| s.as_str().to_string())
                .unwrap_or_default(),
        }
    }
}

impl EntryCsvRecord {
    fn into_entry(self) -> PersistenceResult<ScheduleEntry> {
        let date = NaiveDate::parse_from_str(&self.date, "%Y-%m-%d")
            .map_err(|_| PersistenceError::InvalidData(format!("malformed date '{}'", self.date)))?;
        let task_id = parse_optional(&self.task_id, |value| value.parse::<i64>().ok())?;
        let priority = parse_optional(&self.priority, |value| Priority::from_str(value).ok())?;
        let status = parse_optional(&self.status, |value| TaskStatus::from_str(value).ok())?;
        Ok(ScheduleEntry {
            id: self.id,
            date,
            start_time: self.start_time,
            end_time: self.end_time,
            duration_minutes: self.duration_minutes,
            task_id,
            task_name: self.task_name,
            priority,
            status,
        })
    }
}

fn parse_optional<T>(
    value: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> PersistenceResult<Option<T>> {
    if value.is_empty() {
        return Ok(None);
    }
    parse(value)
        .map(Some)
        .ok_or_else(|| PersistenceError::InvalidData(format!("malformed field '{value}'")))
}

pub fn save_schedule_to_csv<P: AsRef<Path>>(
    entries: &[ScheduleEntry],
    path: P,
) -> PersistenceResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for entry in entries {
        writer.serialize(EntryCsvRecord::from(entry))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn load_schedule_from_csv<P: AsRef<Path>>(path: P) -> PersistenceResult<Vec<ScheduleEntry>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut entries = Vec::new();
    for record in reader.deserialize::<EntryCsvRecord>() {
        entries.push(record?.into_entry()?);
    }
    Ok(entries)
}
