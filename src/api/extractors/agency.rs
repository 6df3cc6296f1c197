use axum::{
    extract::{FromRequestParts, Path},
    http::{request::Parts, StatusCode},
};
use std::collections::HashMap;
use crate::state::AppState;
use std::sync::Arc;
use tracing::Span;

/// Agency the request acts for, taken from the `{agency_id}` path segment.
pub struct AgencyId(pub String);

impl FromRequestParts<Arc<AppState>> for AgencyId {
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let params: Path<HashMap<String, String>> = Path::from_request_parts(parts, state)
            .await
            .map_err(|_| StatusCode::BAD_REQUEST)?;

        let agency_id = params.get("agency_id").ok_or(StatusCode::BAD_REQUEST)?;
        if agency_id.trim().is_empty() {
            return Err(StatusCode::BAD_REQUEST);
        }

        Span::current().record("agency_id", agency_id.as_str());
        Ok(AgencyId(agency_id.clone()))
    }
}
