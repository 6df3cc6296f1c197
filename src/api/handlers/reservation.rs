use axum::{extract::{State, Path}, http::StatusCode, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::extractors::agency::AgencyId;
use crate::api::dtos::requests::HoldRequest;
use crate::domain::models::reservation::Reservation;
use crate::error::AppError;
use std::sync::Arc;
use tracing::info;

async fn load_reservation(state: &AppState, agency_id: &str, reservation_id: &str) -> Result<Reservation, AppError> {
    state.reservation_repo.find_by_id(reservation_id).await?
        .filter(|r| r.agency_id == agency_id)
        .ok_or(AppError::NotFound("Reservation not found".into()))
}

pub async fn hold(
    State(state): State<Arc<AppState>>,
    AgencyId(agency_id): AgencyId,
    Json(payload): Json<HoldRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.quantity <= 0 {
        return Err(AppError::Validation("quantity must be positive".into()));
    }

    let slot = state.slot_repo.find_by_id(&payload.slot_id).await?
        .filter(|s| s.agency_id == agency_id)
        .ok_or(AppError::NotFound("Slot not found".into()))?;

    let mut reservation = Reservation::new(slot.id, agency_id, payload.quantity);
    reservation.created_at = state.clock.now();
    let held = state.reservation_repo.hold(&reservation).await?;

    info!("Held {} unit(s) on slot {}", held.quantity, held.slot_id);
    Ok((StatusCode::CREATED, Json(held)))
}

pub async fn confirm(
    State(state): State<Arc<AppState>>,
    AgencyId(agency_id): AgencyId,
    Path((_, reservation_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    load_reservation(&state, &agency_id, &reservation_id).await?;
    let confirmed = state.reservation_repo.confirm(&reservation_id).await?;
    Ok(Json(confirmed))
}

pub async fn release(
    State(state): State<Arc<AppState>>,
    AgencyId(agency_id): AgencyId,
    Path((_, reservation_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    load_reservation(&state, &agency_id, &reservation_id).await?;
    let released = state.reservation_repo.release(&reservation_id).await?;

    info!("Released reservation {} ({} unit(s))", released.id, released.quantity);
    Ok(Json(released))
}
