use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::header,
    response::IntoResponse,
};
use chrono::{DateTime, FixedOffset, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::AppState;
use crate::error::{AppError, ValidationError};
use crate::ics;
use crate::logic::{self, ScheduleOutcome, UnplacedTask};
use crate::models::{DaySettings, FixedInterval, ScheduledBlock};
use crate::validate::{ScheduleRequest, parse_external_schedule};

#[derive(Debug, Deserialize)]
pub struct PlanQuery {
    pub date: String,           // "YYYY-MM-DD"
    pub offset: Option<String>, // "+09:00", defaults to the server's local offset
}

// Placed blocks and unplaced minutes travel separately so
// a client can show a warning instead of an error.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleResponse {
    pub complete: bool,
    pub blocks: Vec<ScheduledBlock>,
    pub unplaced: Vec<UnplacedTask>,
}

impl From<ScheduleOutcome> for ScheduleResponse {
    fn from(outcome: ScheduleOutcome) -> Self {
        Self {
            complete: outcome.is_complete(),
            blocks: outcome.blocks,
            unplaced: outcome.unplaced,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResponse {
    pub date: String,
    pub work_day_start: DateTime<FixedOffset>,
    pub work_day_end: DateTime<FixedOffset>,
    pub settings: DaySettings,
    #[serde(flatten)]
    pub schedule: ScheduleResponse,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ValidateRequest {
    pub text: String, // raw output of an external scheduler
    #[serde(default)]
    pub fixed_intervals: Vec<FixedInterval>,
    pub work_day_start: DateTime<FixedOffset>,
    pub work_day_end: DateTime<FixedOffset>,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub blocks: Vec<ScheduledBlock>,
}

fn parse_query(q: &PlanQuery) -> Result<(NaiveDate, FixedOffset), ValidationError> {
    let date = NaiveDate::parse_from_str(&q.date, "%Y-%m-%d")
        .map_err(|_| ValidationError::invalid("date", "expected YYYY-MM-DD"))?;
    let offset = match &q.offset {
        Some(raw) => raw
            .parse::<FixedOffset>()
            .map_err(|_| ValidationError::invalid("offset", "expected +HH:MM"))?,
        None => *Local::now().offset(),
    };
    Ok((date, offset))
}

// Run the packer over the stored tasks and that day's appointments
async fn plan_for(state: &AppState, q: &PlanQuery) -> Result<PlanResponse, AppError> {
    let (date, offset) = parse_query(q)?;

    let db = {
        let store = state.store.lock().await;
        store.load()?
    };

    let (day_start, day_end) = logic::working_hours(date, &db.settings, offset)?;
    let appointments = logic::appointments_within(&db.appointments, day_start, day_end);
    let outcome = logic::schedule(&appointments, &db.tasks, day_start, day_end)?;

    info!(
        %date,
        blocks = outcome.blocks.len(),
        unplaced = outcome.unplaced.len(),
        "plan generated"
    );

    Ok(PlanResponse {
        date: q.date.clone(),
        work_day_start: day_start,
        work_day_end: day_end,
        settings: db.settings,
        schedule: outcome.into(),
    })
}

// -----------------------------
// POST /api/schedule
// Stateless run over the request body
// -----------------------------
pub async fn post_schedule(
    payload: Result<Json<ScheduleRequest>, JsonRejection>,
) -> Result<Json<ScheduleResponse>, AppError> {
    let Json(req) = payload?;
    let outcome = req.run()?;
    Ok(Json(outcome.into()))
}

// -----------------------------
// GET /api/plan?date=YYYY-MM-DD
// -----------------------------
pub async fn get_plan(
    State(state): State<AppState>,
    Query(q): Query<PlanQuery>,
) -> Result<Json<PlanResponse>, AppError> {
    Ok(Json(plan_for(&state, &q).await?))
}

// -----------------------------
// GET /api/plan.ics?date=YYYY-MM-DD
// -----------------------------
pub async fn get_plan_ics(
    State(state): State<AppState>,
    Query(q): Query<PlanQuery>,
) -> Result<impl IntoResponse, AppError> {
    let plan = plan_for(&state, &q).await?;
    let body = ics::render_calendar(&plan.schedule.blocks, Local::now().fixed_offset());
    Ok((
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"schedule-{}.ics\"", plan.date),
            ),
        ],
        body,
    ))
}

// -----------------------------
// POST /api/schedule/validate
// Checks a schedule produced outside the packer
// -----------------------------
pub async fn validate_schedule(
    payload: Result<Json<ValidateRequest>, JsonRejection>,
) -> Result<Json<ValidateResponse>, AppError> {
    let Json(req) = payload?;
    let blocks = parse_external_schedule(
        &req.text,
        &req.fixed_intervals,
        req.work_day_start,
        req.work_day_end,
    )?;
    Ok(Json(ValidateResponse { blocks }))
}
