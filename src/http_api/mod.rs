use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use chrono::NaiveDate;
use log::error;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::calendar::{Holiday, NewHoliday};
use crate::placement::ScheduleEntry;
use crate::planner::{Planner, PlannerError, RescheduleSummary};
use crate::settings::PlannerSettings;
use crate::task::{CompletionOutcome, NewTask, Task, TaskUpdate};

#[derive(Clone)]
pub struct AppState {
    planner: Arc<Planner>,
}

impl AppState {
    pub fn new(planner: Planner) -> Self {
        Self {
            planner: Arc::new(planner),
        }
    }

    pub fn with_shared(planner: Arc<Planner>) -> Self {
        Self { planner }
    }

    fn planner(&self) -> &Planner {
        &self.planner
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    Conflict(String),
    Invalid(String),
    Internal,
}

impl ApiError {
    fn invalid(message: impl Into<String>) -> Self {
        ApiError::Invalid(message.into())
    }
}

impl From<PlannerError> for ApiError {
    fn from(value: PlannerError) -> Self {
        match value {
            PlannerError::Validation(message) => ApiError::Invalid(message),
            PlannerError::NotFound(message) => ApiError::NotFound(message),
            PlannerError::Conflict(message) => ApiError::Conflict(message),
            PlannerError::Store(err) => {
                // Store details stay in the log; clients get a generic error.
                error!("store failure: {err}");
                ApiError::Internal
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(message) => {
                let body = Json(ErrorBody {
                    error: "not_found",
                    message,
                });
                (StatusCode::NOT_FOUND, body).into_response()
            }
            ApiError::Conflict(message) => {
                let body = Json(ErrorBody {
                    error: "conflict",
                    message,
                });
                (StatusCode::CONFLICT, body).into_response()
            }
            ApiError::Invalid(message) => {
                let body = Json(ErrorBody {
                    error: "invalid_request",
                    message,
                });
                (StatusCode::BAD_REQUEST, body).into_response()
            }
            ApiError::Internal => {
                let body = Json(ErrorBody {
                    error: "internal_error",
                    message: "internal failure".to_string(),
                });
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct CompleteTaskPayload {
    actual_duration: i64,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/:id", put(update_task).delete(delete_task))
        .route("/tasks/:id/start", post(start_task))
        .route("/tasks/:id/cancel", post(cancel_task))
        .route("/tasks/:id/complete", post(complete_task))
        .route("/schedule", get(list_schedule))
        .route("/schedule/:date", get(list_schedule_for_date))
        .route("/settings", get(get_settings).put(put_settings))
        .route("/holidays", get(list_holidays).post(add_holiday))
        .route("/holidays/:id", delete(delete_holiday))
        .route("/reschedule", post(reschedule_all))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, planner: Planner) -> std::io::Result<()> {
    let state = AppState::new(planner);
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn list_tasks(State(state): State<AppState>) -> Result<Json<Vec<Task>>, ApiError> {
    let tasks = state.planner().list_tasks()?;
    Ok(Json(tasks))
}

async fn create_task(
    State(state): State<AppState>,
    Json(payload): Json<NewTask>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let task = state.planner().create_task(payload)?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn update_task(
    Path(task_id): Path<i64>,
    State(state): State<AppState>,
    Json(payload): Json<TaskUpdate>,
) -> Result<Json<Task>, ApiError> {
    let task = state.planner().update_task(task_id, payload)?;
    Ok(Json(task))
}

async fn delete_task(
    Path(task_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    state.planner().delete_task(task_id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn start_task(
    Path(task_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.planner().start_task(task_id)?;
    Ok(Json(json!({ "message": "task started" })))
}

async fn cancel_task(
    Path(task_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.planner().cancel_task(task_id)?;
    Ok(Json(json!({ "message": "task cancelled" })))
}

async fn complete_task(
    Path(task_id): Path<i64>,
    State(state): State<AppState>,
    Json(payload): Json<CompleteTaskPayload>,
) -> Result<Json<CompletionOutcome>, ApiError> {
    let outcome = state
        .planner()
        .complete_task(task_id, payload.actual_duration)?;
    Ok(Json(outcome))
}

async fn list_schedule(
    State(state): State<AppState>,
) -> Result<Json<Vec<ScheduleEntry>>, ApiError> {
    let entries = state.planner().list_schedule()?;
    Ok(Json(entries))
}

async fn list_schedule_for_date(
    Path(date): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<ScheduleEntry>>, ApiError> {
    let date: NaiveDate = date
        .parse()
        .map_err(|_| ApiError::invalid(format!("malformed date '{date}'")))?;
    let entries = state.planner().list_schedule_for_date(date)?;
    Ok(Json(entries))
}

async fn get_settings(State(state): State<AppState>) -> Result<Json<PlannerSettings>, ApiError> {
    let settings = state.planner().settings()?;
    Ok(Json(settings))
}

async fn put_settings(
    State(state): State<AppState>,
    Json(payload): Json<PlannerSettings>,
) -> Result<Json<PlannerSettings>, ApiError> {
    state.planner().put_settings(payload)?;
    Ok(Json(payload))
}

async fn list_holidays(State(state): State<AppState>) -> Result<Json<Vec<Holiday>>, ApiError> {
    let holidays = state.planner().list_holidays()?;
    Ok(Json(holidays))
}

async fn add_holiday(
    State(state): State<AppState>,
    Json(payload): Json<NewHoliday>,
) -> Result<(StatusCode, Json<Holiday>), ApiError> {
    let holiday = state.planner().add_holiday(payload)?;
    Ok((StatusCode::CREATED, Json(holiday)))
}

async fn delete_holiday(
    Path(holiday_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    state.planner().delete_holiday(holiday_id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn reschedule_all(
    State(state): State<AppState>,
) -> Result<Json<RescheduleSummary>, ApiError> {
    let summary = state.planner().reschedule_all()?;
    Ok(Json(summary))
}
