use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn, info_span, Instrument};
use crate::state::AppState;
use crate::domain::services::slot_generator::GenerationResult;
use crate::error::AppError;

/// Periodically extends every enabled schedule up to the rolling horizon.
pub async fn start_horizon_worker(state: Arc<AppState>) {
    info!(
        horizon_days = state.config.horizon_days,
        every_secs = state.config.horizon_refresh_secs,
        "Starting horizon worker..."
    );

    loop {
        match refresh_horizon(&state).await {
            Ok(result) => info!(
                slots_created = result.slots_created,
                slots_skipped = result.slots_skipped,
                "Horizon refresh finished"
            ),
            Err(e) => error!("Failed to list schedules for horizon refresh: {:?}", e),
        }
        sleep(Duration::from_secs(state.config.horizon_refresh_secs)).await;
    }
}

/// One pass of the horizon worker. A schedule that fails to generate is logged
/// and skipped so the rest still advance.
pub async fn refresh_horizon(state: &AppState) -> Result<GenerationResult, AppError> {
    let schedules = state.schedule_repo.list_enabled().await?;
    let mut total = GenerationResult::default();

    for schedule in schedules {
        let span = info_span!(
            "horizon_refresh",
            schedule_id = %schedule.id,
            activity_id = %schedule.activity_id,
            agency_id = %schedule.agency_id
        );

        let generator = state.slot_generator.clone();
        let outcome = async move {
            match generator.extend_horizon(&schedule).await {
                Ok(result) => {
                    if result.slots_created > 0 {
                        info!("Extended schedule by {} slot(s)", result.slots_created);
                    }
                    Some(result)
                }
                Err(e) => {
                    warn!("Horizon generation failed: {}", e);
                    None
                }
            }
        }
            .instrument(span)
            .await;

        if let Some(result) = outcome {
            total.merge(result);
        }
    }

    Ok(total)
}
