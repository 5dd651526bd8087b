// --------------------------------------------------
// Handles API endpoints for the task / appointment store
// and day settings.
//
// Responsibilities:
// - Create / read / update / delete flexible tasks
// - Create / read / update / delete appointments
// - Get / update day settings
// --------------------------------------------------

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;
use uuid::Uuid;

use crate::AppState;
use crate::error::{AppError, ValidationError};
use crate::models::{DaySettings, FixedInterval, FlexibleTaskRequest, Priority, TaskDefaults};
use crate::validate::{check_interval, check_task};

fn require_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::invalid("name", "required"));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TaskInput {
    pub name: String,
    pub total_duration: Option<i64>, // falls back to settings.taskDefaults
    pub min_chunk: Option<i64>,
    pub max_chunk: Option<i64>,
    pub priority: Priority,
    pub category: Option<String>,
    pub due_date_days: Option<i64>,
}

impl TaskInput {
    fn into_task(
        self,
        id: String,
        defaults: &TaskDefaults,
    ) -> Result<FlexibleTaskRequest, ValidationError> {
        require_name(&self.name)?;
        let task = FlexibleTaskRequest {
            id,
            name: self.name,
            total_duration: self.total_duration.unwrap_or(defaults.duration),
            min_chunk: self.min_chunk.unwrap_or(defaults.min_chunk),
            max_chunk: self.max_chunk.unwrap_or(defaults.max_chunk),
            priority: self.priority,
            category: self.category,
            due_date_days: self.due_date_days,
        };
        check_task(&task, "task")?;
        Ok(task)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AppointmentInput {
    pub name: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl AppointmentInput {
    fn into_interval(self, id: String) -> Result<FixedInterval, ValidationError> {
        require_name(&self.name)?;
        let interval = FixedInterval {
            id,
            name: self.name,
            start: self.start,
            end: self.end,
        };
        check_interval(&interval, "appointment")?;
        Ok(interval)
    }
}

// -----------------------------
// GET /api/tasks
// -----------------------------
pub async fn get_tasks(
    State(state): State<AppState>,
) -> Result<Json<Vec<FlexibleTaskRequest>>, AppError> {
    let store = state.store.lock().await;
    Ok(Json(store.load()?.tasks))
}

// -----------------------------
// POST /api/tasks
// Missing duration / chunk sizes come from the task defaults
// -----------------------------
pub async fn create_task(
    State(state): State<AppState>,
    payload: Result<Json<TaskInput>, JsonRejection>,
) -> Result<Json<FlexibleTaskRequest>, AppError> {
    let Json(input) = payload?;
    let store = state.store.lock().await;
    let mut db = store.load()?;

    let task = input.into_task(Uuid::new_v4().to_string(), &db.settings.task_defaults)?;
    db.tasks.push(task.clone());
    store.save(&db)?;

    info!(task_id = %task.id, "task created");
    Ok(Json(task))
}

// -----------------------------
// PUT /api/tasks/:id
// -----------------------------
pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<TaskInput>, JsonRejection>,
) -> Result<Json<FlexibleTaskRequest>, AppError> {
    let Json(input) = payload?;
    let store = state.store.lock().await;
    let mut db = store.load()?;

    let updated = input.into_task(id.clone(), &db.settings.task_defaults)?;
    let Some(t) = db.tasks.iter_mut().find(|t| t.id == id) else {
        return Err(AppError::NotFound("task"));
    };
    *t = updated.clone();
    store.save(&db)?;

    Ok(Json(updated))
}

// -----------------------------
// DELETE /api/tasks/:id
// -----------------------------
pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let store = state.store.lock().await;
    let mut db = store.load()?;

    let before = db.tasks.len();
    db.tasks.retain(|t| t.id != id);
    if db.tasks.len() == before {
        return Err(AppError::NotFound("task"));
    }
    store.save(&db)?;

    info!(task_id = %id, "task deleted");
    Ok(Json(json!({ "ok": true })))
}

// -----------------------------
// GET /api/appointments
// -----------------------------
pub async fn get_appointments(
    State(state): State<AppState>,
) -> Result<Json<Vec<FixedInterval>>, AppError> {
    let store = state.store.lock().await;
    Ok(Json(store.load()?.appointments))
}

// -----------------------------
// POST /api/appointments
// -----------------------------
pub async fn create_appointment(
    State(state): State<AppState>,
    payload: Result<Json<AppointmentInput>, JsonRejection>,
) -> Result<Json<FixedInterval>, AppError> {
    let Json(input) = payload?;
    let appointment = input.into_interval(Uuid::new_v4().to_string())?;

    let store = state.store.lock().await;
    let mut db = store.load()?;
    db.appointments.push(appointment.clone());
    store.save(&db)?;

    info!(appointment_id = %appointment.id, "appointment created");
    Ok(Json(appointment))
}

// -----------------------------
// PUT /api/appointments/:id
// -----------------------------
pub async fn update_appointment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<AppointmentInput>, JsonRejection>,
) -> Result<Json<FixedInterval>, AppError> {
    let Json(input) = payload?;
    let updated = input.into_interval(id.clone())?;

    let store = state.store.lock().await;
    let mut db = store.load()?;
    let Some(a) = db.appointments.iter_mut().find(|a| a.id == id) else {
        return Err(AppError::NotFound("appointment"));
    };
    *a = updated.clone();
    store.save(&db)?;

    Ok(Json(updated))
}

// -----------------------------
// DELETE /api/appointments/:id
// -----------------------------
pub async fn delete_appointment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let store = state.store.lock().await;
    let mut db = store.load()?;

    let before = db.appointments.len();
    db.appointments.retain(|a| a.id != id);
    if db.appointments.len() == before {
        return Err(AppError::NotFound("appointment"));
    }
    store.save(&db)?;

    Ok(Json(json!({ "ok": true })))
}

// -----------------------------
// GET /api/settings
// -----------------------------
pub async fn get_settings(State(state): State<AppState>) -> Result<Json<DaySettings>, AppError> {
    let store = state.store.lock().await;
    Ok(Json(store.load()?.settings))
}

// -----------------------------
// PUT /api/settings
// Working hours must parse and chunk defaults must be usable
// -----------------------------
pub async fn put_settings(
    State(state): State<AppState>,
    payload: Result<Json<DaySettings>, JsonRejection>,
) -> Result<Json<DaySettings>, AppError> {
    let Json(settings) = payload?;

    let probe = chrono::Local::now().date_naive();
    let (start, end) = crate::logic::working_hours(probe, &settings, Utc.fix())?;
    if start >= end {
        return Err(ValidationError::invalid("dayEnd", "must be after dayStart").into());
    }
    let d = &settings.task_defaults;
    if d.duration <= 0 || d.min_chunk <= 0 || d.min_chunk > d.max_chunk {
        return Err(ValidationError::invalid(
            "taskDefaults",
            "need duration > 0 and 0 < minChunk <= maxChunk",
        )
        .into());
    }
    if settings.buffer_times.appointments < 0 || settings.buffer_times.tasks < 0 {
        return Err(ValidationError::invalid("bufferTimes", "must not be negative").into());
    }

    let store = state.store.lock().await;
    let mut db = store.load()?;
    db.settings = settings;
    store.save(&db)?;

    info!(day_start = %db.settings.day_start, day_end = %db.settings.day_end, "settings updated");
    Ok(Json(db.settings))
}
