use axum::{
    body::Body,
    extract::Request,
    routing::{get, post, delete},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use crate::state::AppState;
use crate::api::handlers::{activity, health, modification, reservation, schedule};
use tower_http::{
    trace::TraceLayer,
    classify::ServerErrorsFailureClass,
};
use tracing::{info_span, Span, error, info};
use uuid::Uuid;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))

        // Schedules
        .route("/api/v1/{agency_id}/schedules", post(schedule::create_schedule))
        .route("/api/v1/{agency_id}/schedules/{schedule_id}", get(schedule::get_schedule).put(schedule::update_schedule).delete(schedule::delete_schedule))
        .route("/api/v1/{agency_id}/schedules/{schedule_id}/generate", post(schedule::generate_slots))
        .route("/api/v1/{agency_id}/schedules/{schedule_id}/expansion", get(schedule::expand_schedule))
        .route("/api/v1/{agency_id}/schedules/{schedule_id}/slots", get(schedule::list_schedule_slots))

        // Activities
        .route("/api/v1/{agency_id}/activities/{activity_id}/generate", post(activity::generate_activity_slots))
        .route("/api/v1/{agency_id}/activities/{activity_id}/slots", get(activity::list_activity_slots))

        // Temporary modifications
        .route("/api/v1/{agency_id}/modifications", post(modification::create_modification))
        .route("/api/v1/{agency_id}/modifications/{modification_id}", get(modification::get_modification).delete(modification::revert_modification))
        .route("/api/v1/{agency_id}/modifications/{modification_id}/apply", post(modification::apply_modification))

        // Reservations
        .route("/api/v1/{agency_id}/reservations", post(reservation::hold))
        .route("/api/v1/{agency_id}/reservations/{reservation_id}/confirm", post(reservation::confirm))
        .route("/api/v1/{agency_id}/reservations/{reservation_id}", delete(reservation::release))

        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    let request_id = Uuid::new_v4().to_string();
                    info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = ?request.method(),
                        uri = ?request.uri(),
                        version = ?request.version(),
                        agency_id = tracing::field::Empty,
                    )
                })
                .on_request(|request: &Request<Body>, _span: &Span| {
                    info!("started processing request: {} {}", request.method(), request.uri().path());
                })
                .on_response(|response: &axum::http::Response<Body>, latency: Duration, _span: &Span| {
                    info!(
                        status = response.status().as_u16(),
                        latency_ms = latency.as_millis(),
                        "finished processing request"
                    );
                })
                .on_failure(|error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                    error!("request failed: {:?}", error);
                })
        )
        .with_state(state)
}
