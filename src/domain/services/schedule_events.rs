use std::sync::Arc;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::domain::models::{
    lifecycle::SoftDeletable,
    schedule::Schedule,
    slot::{Slot, SlotUpdate},
};
use crate::domain::ports::{Clock, ScheduleRepository, SlotRepository};
use crate::domain::services::reconciler::{ReconciliationResult, ScheduleReconciler};
use crate::domain::services::slot_generator::{GenerationResult, SlotGenerator};
use crate::domain::services::slot_writer::write_with_retry;
use crate::error::AppError;

#[derive(Debug, Serialize, Clone, Default, PartialEq, Eq)]
pub struct DeletionResult {
    pub slots_deleted: usize,
    pub slots_blocked: usize,
}

/// Entry points for the schedule/activity lifecycle events dispatched by the API
/// layer.
pub struct ScheduleEvents {
    schedule_repo: Arc<dyn ScheduleRepository>,
    slot_repo: Arc<dyn SlotRepository>,
    generator: Arc<SlotGenerator>,
    reconciler: Arc<ScheduleReconciler>,
    clock: Arc<dyn Clock>,
}

impl ScheduleEvents {
    pub fn new(
        schedule_repo: Arc<dyn ScheduleRepository>,
        slot_repo: Arc<dyn SlotRepository>,
        generator: Arc<SlotGenerator>,
        reconciler: Arc<ScheduleReconciler>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { schedule_repo, slot_repo, generator, reconciler, clock }
    }

    pub async fn on_schedule_created(&self, schedule: &Schedule) -> Result<GenerationResult, AppError> {
        info!(schedule_id = %schedule.id, "Schedule created");
        self.generator.generate(schedule).await
    }

    pub async fn on_schedule_updated(
        &self,
        previous: &Schedule,
        updated: &Schedule,
    ) -> Result<ReconciliationResult, AppError> {
        self.reconciler.reconcile_schedule_update(previous, updated).await
    }

    /// Saves `updated` and reconciles its slots. If reconciliation fails the stored
    /// schedule is put back to `previous`, so a retry sees the same change again.
    pub async fn update_schedule(
        &self,
        previous: &Schedule,
        updated: &Schedule,
        full_regenerate: bool,
    ) -> Result<(Schedule, ReconciliationResult), AppError> {
        let saved = self.schedule_repo.update(updated).await?;

        match self.reconciler.reconcile(previous, &saved, full_regenerate).await {
            Ok(result) => Ok((saved, result)),
            Err(e) => {
                warn!(schedule_id = %saved.id, error = %e, "Reconciliation failed, restoring previous schedule");
                if let Err(restore) = self.schedule_repo.update(previous).await {
                    error!(schedule_id = %saved.id, error = %restore, "Failed to restore previous schedule");
                }
                Err(e)
            }
        }
    }

    pub async fn on_activity_created(&self, activity_id: &str) -> Result<GenerationResult, AppError> {
        info!(activity_id, "Activity created");
        self.generator.generate_for_activity(activity_id).await
    }

    /// Soft-deletes the schedule and its untouched future slots. Future slots that
    /// hold reservations are blocked and kept.
    pub async fn on_schedule_deleted(&self, schedule: &Schedule) -> Result<DeletionResult, AppError> {
        if !schedule.is_active() {
            return Err(AppError::NotFound(format!("Schedule {} not found", schedule.id)));
        }

        let now = self.clock.now();
        let slots = self.slot_repo.list_by_schedule(&schedule.id, Some(self.clock.today())).await?;
        let untouched: Vec<String> = slots.iter().filter(|s| !s.has_reservations()).map(|s| s.id.clone()).collect();

        let deleted = if untouched.is_empty() {
            Vec::new()
        } else {
            self.slot_repo.soft_delete_untouched(&untouched, now).await?
        };

        let remaining: Vec<Slot> = slots.into_iter().filter(|s| !deleted.contains(&s.id)).collect();
        let outcome = write_with_retry(self.slot_repo.as_ref(), &remaining, |slot| {
            let mut update = SlotUpdate::from_slot(slot);
            update.blocked = true;
            Some(update)
        })
        .await?;
        if !outcome.stale.is_empty() {
            warn!(schedule_id = %schedule.id, stale = outcome.stale.len(), "Some reserved slots could not be blocked");
        }

        self.schedule_repo.soft_delete(&schedule.id, now).await?;
        info!(schedule_id = %schedule.id, deleted = deleted.len(), blocked = outcome.written, "Schedule deleted");

        Ok(DeletionResult {
            slots_deleted: deleted.len(),
            slots_blocked: outcome.written,
        })
    }
}
