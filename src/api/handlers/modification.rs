use axum::{extract::{State, Path}, http::StatusCode, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::extractors::agency::AgencyId;
use crate::api::dtos::requests::CreateModificationRequest;
use crate::domain::models::modification::TemporaryModification;
use crate::domain::services::calendar::time_from_string;
use crate::domain::services::modification_engine::ModificationInput;
use crate::error::AppError;
use std::sync::Arc;
use chrono::NaiveTime;
use tracing::info;

fn parse_optional_time(value: Option<&str>) -> Result<Option<NaiveTime>, AppError> {
    value.map(time_from_string).transpose()
}

async fn load_modification(state: &AppState, agency_id: &str, modification_id: &str) -> Result<TemporaryModification, AppError> {
    state.modification_repo.find_by_id(modification_id).await?
        .filter(|m| m.agency_id == agency_id)
        .ok_or(AppError::NotFound("Modification not found".into()))
}

/// Stores and applies a modification. A stored but unapplied modification still
/// answers 201, with `applied: false` and a warning.
pub async fn create_modification(
    State(state): State<Arc<AppState>>,
    AgencyId(agency_id): AgencyId,
    Json(payload): Json<CreateModificationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let input = ModificationInput {
        modification_type: payload.modification_type.parse()?,
        schedule_id: payload.schedule_id,
        activity_id: payload.activity_id,
        date_from: payload.date_from,
        date_to: payload.date_to,
        new_start_time: parse_optional_time(payload.new_start_time.as_deref())?,
        new_end_time: parse_optional_time(payload.new_end_time.as_deref())?,
        new_capacity: payload.new_capacity,
        current_start_time: parse_optional_time(payload.current_start_time.as_deref())?,
        current_end_time: parse_optional_time(payload.current_end_time.as_deref())?,
        current_capacity: payload.current_capacity,
        reason: payload.reason,
    };

    let outcome = state.modification_engine.create(&agency_id, input).await?;
    info!("Created modification {} (applied: {})", outcome.modification.id, outcome.applied);
    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn get_modification(
    State(state): State<Arc<AppState>>,
    AgencyId(agency_id): AgencyId,
    Path((_, modification_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let modification = load_modification(&state, &agency_id, &modification_id).await?;
    Ok(Json(modification))
}

/// Re-runs application, e.g. after a create that answered with a warning.
pub async fn apply_modification(
    State(state): State<Arc<AppState>>,
    AgencyId(agency_id): AgencyId,
    Path((_, modification_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let modification = load_modification(&state, &agency_id, &modification_id).await?;
    let outcome = state.modification_engine.apply(&modification).await?;
    Ok(Json(outcome))
}

pub async fn revert_modification(
    State(state): State<Arc<AppState>>,
    AgencyId(agency_id): AgencyId,
    Path((_, modification_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    load_modification(&state, &agency_id, &modification_id).await?;
    let outcome = state.modification_engine.revert(&modification_id).await?;
    Ok(Json(outcome))
}
