use axum::{extract::{State, Path, Query}, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::extractors::agency::AgencyId;
use crate::api::dtos::requests::SlotRangeQuery;
use crate::domain::models::slot::SlotScope;
use crate::domain::services::calendar::{add_days, date_from_iso_date_string, validate_range};
use crate::error::AppError;
use std::sync::Arc;

/// Materializes every enabled schedule of the activity. Also the "activity created" hook.
pub async fn generate_activity_slots(
    State(state): State<Arc<AppState>>,
    AgencyId(agency_id): AgencyId,
    Path((_, activity_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let schedules = state.schedule_repo.list_enabled_by_activity(&activity_id).await?;
    if schedules.iter().any(|s| s.agency_id != agency_id) {
        return Err(AppError::NotFound("Activity not found".into()));
    }

    let result = state.schedule_events.on_activity_created(&activity_id).await?;
    Ok(Json(result))
}

pub async fn list_activity_slots(
    State(state): State<Arc<AppState>>,
    AgencyId(agency_id): AgencyId,
    Path((_, activity_id)): Path<(String, String)>,
    Query(query): Query<SlotRangeQuery>,
) -> Result<impl IntoResponse, AppError> {
    let from = match query.from.as_deref() {
        Some(v) => date_from_iso_date_string(v)?,
        None => state.clock.today(),
    };
    let to = match query.to.as_deref() {
        Some(v) => date_from_iso_date_string(v)?,
        None => add_days(from, state.config.horizon_days),
    };
    validate_range(from, to)?;

    let slots = state.slot_repo.list_in_scope(&SlotScope::Activity(activity_id), from, to).await?;
    let slots: Vec<_> = slots.into_iter().filter(|s| s.agency_id == agency_id).collect();
    Ok(Json(slots))
}
