use crate::calendar::NewHoliday;
use crate::settings::PlannerSettings;
use crate::task::{NewTask, TaskUpdate};
use std::fmt;

#[derive(Debug, Clone)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ValidationError {}

fn validate_task_fields(name: &str, estimated_duration: i64) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::new("task name must not be empty"));
    }
    if estimated_duration <= 0 {
        return Err(ValidationError::new(format!(
            "estimated_duration must be positive (got {estimated_duration})"
        )));
    }
    Ok(())
}

pub fn validate_new_task(task: &NewTask) -> Result<(), ValidationError> {
    validate_task_fields(&task.name, task.estimated_duration)
}

pub fn validate_task_update(update: &TaskUpdate) -> Result<(), ValidationError> {
    validate_task_fields(&update.name, update.estimated_duration)?;
    if let Some(actual) = update.actual_duration {
        if actual < 0 {
            return Err(ValidationError::new(format!(
                "actual_duration must not be negative (got {actual})"
            )));
        }
    }
    Ok(())
}

pub fn validate_actual_duration(actual_duration: i64) -> Result<(), ValidationError> {
    if actual_duration < 0 {
        return Err(ValidationError::new(format!(
            "actual_duration must not be negative (got {actual_duration})"
        )));
    }
    Ok(())
}

pub fn validate_new_holiday(holiday: &NewHoliday) -> Result<(), ValidationError> {
    if holiday.name.trim().is_empty() {
        return Err(ValidationError::new("holiday name must not be empty"));
    }
    Ok(())
}

pub fn validate_settings(settings: &PlannerSettings) -> Result<(), ValidationError> {
    if settings.buffer_minutes < 0 {
        return Err(ValidationError::new("buffer_minutes must not be negative"));
    }
    if settings.daily_work_minutes < 0 {
        return Err(ValidationError::new(
            "daily_work_minutes must not be negative",
        ));
    }
    if !(0..=23).contains(&settings.work_start_hour) {
        return Err(ValidationError::new(format!(
            "work_start_hour must be between 0 and 23 (got {})",
            settings.work_start_hour
        )));
    }
    if !(1..=24).contains(&settings.work_end_hour) {
        return Err(ValidationError::new(format!(
            "work_end_hour must be between 1 and 24 (got {})",
            settings.work_end_hour
        )));
    }
    if settings.work_start_hour >= settings.work_end_hour {
        return Err(ValidationError::new(format!(
            "work_start_hour {} must be before work_end_hour {}",
            settings.work_start_hour, settings.work_end_hour
        )));
    }
    let window = settings.working_window();
    if settings.daily_work_minutes > window.duration() {
        return Err(ValidationError::new(format!(
            "daily_work_minutes {} does not fit the working window of {} minutes",
            settings.daily_work_minutes,
            window.duration()
        )));
    }
    Ok(())
}
