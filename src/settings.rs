use crate::slot::Interval;
use serde::{Deserialize, Serialize};

/// Singleton scheduler configuration, stored in the settings relation and
/// loaded once per operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerSettings {
    /// Global padding in minutes added to every placement.
    pub buffer_minutes: i64,
    /// Length of the recurring daily commitment block; 0 disables it.
    pub daily_work_minutes: i64,
    pub work_start_hour: i64,
    pub work_end_hour: i64,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            buffer_minutes: 0,
            daily_work_minutes: 0,
            work_start_hour: 9,
            work_end_hour: 18,
        }
    }
}

impl PlannerSettings {
    /// The per-day time-of-day range placements may occupy, in minutes
    /// from midnight (hour 9 -> 540).
    pub fn working_window(&self) -> Interval {
        Interval::new(self.work_start_hour * 60, self.work_end_hour * 60)
    }
}
