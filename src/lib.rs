pub mod calendar;
#[cfg(feature = "http_api")]
pub mod http_api;
pub mod persistence;
pub mod placement;
pub mod planner;
pub mod settings;
pub mod slot;
pub mod task;
pub(crate) mod validation;

pub use calendar::{Holiday, NewHoliday, WorkCalendar};
pub use persistence::{
    PersistenceError, SqliteStore, load_schedule_from_csv, load_schedule_from_json,
    save_schedule_to_csv, save_schedule_to_json,
};
pub use placement::{Placement, PlacementKind, ScheduleEntry};
pub use planner::{Planner, PlannerError, PlannerResult, RescheduleSummary};
pub use settings::PlannerSettings;
pub use slot::{Interval, find_slot, hhmm_to_minutes, minutes_to_hhmm};
pub use task::{CompletionOutcome, NewTask, Priority, Task, TaskStatus, TaskUpdate};
