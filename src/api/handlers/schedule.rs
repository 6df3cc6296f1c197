use axum::{extract::{State, Path, Query}, http::StatusCode, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::extractors::agency::AgencyId;
use crate::api::dtos::requests::{CreateScheduleRequest, ReconcileQuery, SlotRangeQuery, UpdateScheduleRequest};
use crate::api::dtos::responses::{ExpansionResponse, ScheduleCreatedResponse, ScheduleUpdatedResponse};
use crate::domain::models::schedule::{NewScheduleParams, Schedule, WeekdaySet};
use crate::domain::services::calendar::{date_from_iso_date_string, format_iso_date, time_from_string};
use crate::error::AppError;
use std::sync::Arc;
use chrono::NaiveTime;
use tracing::info;

fn parse_weekdays(days: &[u8]) -> Result<WeekdaySet, AppError> {
    WeekdaySet::from_days(days).map_err(|e| AppError::Validation(e.to_string()))
}

fn parse_optional_time(value: Option<&str>) -> Result<Option<NaiveTime>, AppError> {
    value.map(time_from_string).transpose()
}

pub(crate) async fn load_schedule(state: &AppState, agency_id: &str, schedule_id: &str) -> Result<Schedule, AppError> {
    state.schedule_repo.find_by_id(schedule_id).await?
        .filter(|s| s.agency_id == agency_id)
        .ok_or(AppError::NotFound("Schedule not found".into()))
}

pub async fn create_schedule(
    State(state): State<Arc<AppState>>,
    AgencyId(agency_id): AgencyId,
    Json(payload): Json<CreateScheduleRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.activity_id.trim().is_empty() {
        return Err(AppError::Validation("activity_id is required".into()));
    }

    let schedule = Schedule::new(NewScheduleParams {
        activity_id: payload.activity_id,
        agency_id,
        start_date: payload.start_date,
        weekdays: parse_weekdays(&payload.weekdays)?,
        full_day: payload.full_day,
        start_time: parse_optional_time(payload.start_time.as_deref())?,
        end_time: parse_optional_time(payload.end_time.as_deref())?,
        capacity: payload.capacity,
        enabled: payload.enabled.unwrap_or(true),
    });
    schedule.validate().map_err(AppError::Validation)?;

    let created = state.schedule_repo.create(&schedule).await?;
    let generation = state.schedule_events.on_schedule_created(&created).await?;

    info!("Created schedule {} for activity {}", created.id, created.activity_id);
    Ok((StatusCode::CREATED, Json(ScheduleCreatedResponse { schedule: created, generation })))
}

pub async fn get_schedule(
    State(state): State<Arc<AppState>>,
    AgencyId(agency_id): AgencyId,
    Path((_, schedule_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let schedule = load_schedule(&state, &agency_id, &schedule_id).await?;
    Ok(Json(schedule))
}

pub async fn update_schedule(
    State(state): State<Arc<AppState>>,
    AgencyId(agency_id): AgencyId,
    Path((_, schedule_id)): Path<(String, String)>,
    Query(query): Query<ReconcileQuery>,
    Json(payload): Json<UpdateScheduleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let previous = load_schedule(&state, &agency_id, &schedule_id).await?;

    let mut updated = previous.clone();
    if let Some(v) = payload.start_date { updated.start_date = v; }
    if let Some(v) = payload.weekdays { updated.weekdays = parse_weekdays(&v)?; }
    if let Some(v) = payload.full_day { updated.full_day = v; }
    if let Some(v) = parse_optional_time(payload.start_time.as_deref())? { updated.start_time = Some(v); }
    if let Some(v) = parse_optional_time(payload.end_time.as_deref())? { updated.end_time = Some(v); }
    if let Some(v) = payload.capacity { updated.capacity = v; }
    if let Some(v) = payload.enabled { updated.enabled = v; }
    if updated.full_day {
        updated.start_time = None;
        updated.end_time = None;
    }
    updated.validate().map_err(AppError::Validation)?;

    let (saved, reconciliation) = state
        .schedule_events
        .update_schedule(&previous, &updated, query.full_regenerate)
        .await?;

    info!("Updated schedule {}", saved.id);
    Ok(Json(ScheduleUpdatedResponse { schedule: saved, reconciliation }))
}

pub async fn delete_schedule(
    State(state): State<Arc<AppState>>,
    AgencyId(agency_id): AgencyId,
    Path((_, schedule_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let schedule = load_schedule(&state, &agency_id, &schedule_id).await?;
    let result = state.schedule_events.on_schedule_deleted(&schedule).await?;
    Ok(Json(result))
}

pub async fn generate_slots(
    State(state): State<Arc<AppState>>,
    AgencyId(agency_id): AgencyId,
    Path((_, schedule_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let schedule = load_schedule(&state, &agency_id, &schedule_id).await?;
    let result = state.slot_generator.generate(&schedule).await?;
    Ok(Json(result))
}

pub async fn expand_schedule(
    State(state): State<Arc<AppState>>,
    AgencyId(agency_id): AgencyId,
    Path((_, schedule_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let schedule = load_schedule(&state, &agency_id, &schedule_id).await?;
    let dates = state.slot_generator.expand(&schedule).into_iter().map(format_iso_date).collect();

    Ok(Json(ExpansionResponse {
        schedule_id: schedule.id,
        horizon_days: state.slot_generator.horizon_days(),
        dates,
    }))
}

pub async fn list_schedule_slots(
    State(state): State<Arc<AppState>>,
    AgencyId(agency_id): AgencyId,
    Path((_, schedule_id)): Path<(String, String)>,
    Query(query): Query<SlotRangeQuery>,
) -> Result<impl IntoResponse, AppError> {
    let schedule = load_schedule(&state, &agency_id, &schedule_id).await?;
    let from = query.from.as_deref().map(date_from_iso_date_string).transpose()?;

    let mut slots = state.slot_repo.list_by_schedule(&schedule.id, from).await?;
    if let Some(to) = query.to.as_deref().map(date_from_iso_date_string).transpose()? {
        slots.retain(|s| s.date <= to);
    }
    Ok(Json(slots))
}
