use crate::slot::{Interval, minutes_to_hhmm};
use crate::task::{Priority, TaskStatus};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// What a placement reserves time for: a real task, or the recurring
/// daily commitment block (which belongs to no task).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "task_id", rename_all = "snake_case")]
pub enum PlacementKind {
    Task(i64),
    Commitment,
}

impl PlacementKind {
    pub fn task_id(&self) -> Option<i64> {
        match self {
            PlacementKind::Task(id) => Some(*id),
            PlacementKind::Commitment => None,
        }
    }

    pub fn is_commitment(&self) -> bool {
        matches!(self, PlacementKind::Commitment)
    }
}

/// A concrete date + time interval reserved on the calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub id: i64,
    pub kind: PlacementKind,
    pub date: NaiveDate,
    pub start_minute: i64,
    pub end_minute: i64,
    pub duration_minutes: i64,
}

impl Placement {
    pub fn interval(&self) -> Interval {
        Interval::new(self.start_minute, self.end_minute)
    }
}

/// A placement joined with its task for display, times rendered as HH:MM.
/// Commitment placements surface as a synthetic "Daily commitment" row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub id: i64,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub duration_minutes: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<i64>,
    pub task_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
}

pub(crate) const COMMITMENT_LABEL: &str = "Daily commitment";

impl ScheduleEntry {
    pub(crate) fn commitment(placement: &Placement) -> Self {
        Self {
            id: placement.id,
            date: placement.date,
            start_time: minutes_to_hhmm(placement.start_minute),
            end_time: minutes_to_hhmm(placement.end_minute),
            duration_minutes: placement.duration_minutes,
            task_id: None,
            task_name: COMMITMENT_LABEL.to_string(),
            priority: None,
            status: None,
        }
    }
}
