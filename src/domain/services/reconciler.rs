use std::collections::HashSet;
use std::sync::Arc;
use serde::Serialize;
use tracing::{info, warn};

use crate::domain::models::{
    schedule::Schedule,
    slot::{Slot, SlotUpdate},
};
use crate::domain::ports::{Clock, SlotRepository};
use crate::domain::services::modification_engine::ModificationEngine;
use crate::domain::services::capacity::{recompute_available, would_undercut_consumed};
use crate::domain::services::slot_generator::{GenerationResult, SlotGenerator};
use crate::domain::services::slot_writer::{write_with_retry, WriteOutcome};
use crate::error::AppError;

/// What a schedule edit means for its existing slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleChange {
    /// Nothing slot-relevant changed.
    Unchanged,
    /// Only `capacity` changed; propagate to future slots.
    CapacityOnly,
    /// Enabled -> disabled; block future slots.
    Disabled,
    /// Edited while disabled; slots stay blocked until re-enabled.
    StillDisabled,
    /// Dates, weekdays or times changed, or the schedule was re-enabled.
    Reshaped,
}

pub fn classify_change(previous: &Schedule, updated: &Schedule) -> ScheduleChange {
    if previous.enabled && !updated.enabled {
        return ScheduleChange::Disabled;
    }
    if !updated.enabled {
        return ScheduleChange::StillDisabled;
    }

    let reshaped = !previous.enabled
        || previous.start_date != updated.start_date
        || previous.weekdays != updated.weekdays
        || previous.full_day != updated.full_day
        || previous.start_time != updated.start_time
        || previous.end_time != updated.end_time;

    if reshaped {
        ScheduleChange::Reshaped
    } else if previous.capacity != updated.capacity {
        ScheduleChange::CapacityOnly
    } else {
        ScheduleChange::Unchanged
    }
}

#[derive(Debug, Serialize, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationResult {
    pub regenerated: bool,
    pub slots_patched: usize,
    pub slots_deleted: usize,
    pub slots_blocked: usize,
    /// Slot writes made re-applying live modifications over the rewritten slots.
    pub slots_overlaid: usize,
    pub generation: Option<GenerationResult>,
}

/// Brings existing slots in line with an edited schedule without ever deleting a
/// slot that holds reservations.
pub struct ScheduleReconciler {
    slot_repo: Arc<dyn SlotRepository>,
    generator: Arc<SlotGenerator>,
    modifications: Arc<ModificationEngine>,
    clock: Arc<dyn Clock>,
}

impl ScheduleReconciler {
    pub fn new(
        slot_repo: Arc<dyn SlotRepository>,
        generator: Arc<SlotGenerator>,
        modifications: Arc<ModificationEngine>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { slot_repo, generator, modifications, clock }
    }

    pub async fn reconcile_schedule_update(
        &self,
        previous: &Schedule,
        updated: &Schedule,
    ) -> Result<ReconciliationResult, AppError> {
        self.reconcile(previous, updated, false).await
    }

    /// `full_regenerate` reshapes every slot of the schedule, past ones included,
    /// even when no shape field changed.
    pub async fn reconcile(
        &self,
        previous: &Schedule,
        updated: &Schedule,
        full_regenerate: bool,
    ) -> Result<ReconciliationResult, AppError> {
        let mut change = classify_change(previous, updated);
        if full_regenerate && updated.enabled {
            change = ScheduleChange::Reshaped;
        }

        info!(schedule_id = %updated.id, ?change, full_regenerate, "Reconciling schedule update");

        match change {
            ScheduleChange::Unchanged | ScheduleChange::StillDisabled => Ok(ReconciliationResult::default()),
            ScheduleChange::CapacityOnly => self.propagate_capacity(updated).await,
            ScheduleChange::Disabled => self.block_future(updated).await,
            ScheduleChange::Reshaped => {
                let reenabled = !previous.enabled;
                self.reshape(updated, full_regenerate, reenabled).await
            }
        }
    }

    async fn propagate_capacity(&self, schedule: &Schedule) -> Result<ReconciliationResult, AppError> {
        let today = self.clock.today();
        let slots = self.slot_repo.list_by_schedule(&schedule.id, Some(today)).await?;
        let new_total = schedule.capacity;

        let outcome = write_with_retry(self.slot_repo.as_ref(), &slots, |slot| {
            if would_undercut_consumed(slot.total_capacity, slot.available_capacity, new_total) {
                warn!(
                    slot_id = %slot.id,
                    consumed = slot.consumed(),
                    new_total,
                    "Schedule capacity is below reserved units, slot will be fully booked"
                );
            }
            let mut update = SlotUpdate::from_slot(slot);
            update.total_capacity = new_total;
            update.available_capacity = recompute_available(slot.total_capacity, slot.available_capacity, new_total);
            Some(update)
        })
        .await?;
        ensure_settled(&schedule.id, &outcome)?;

        let overlaid = self.modifications.reapply_to_schedule(schedule, Some(today)).await?;

        Ok(ReconciliationResult {
            slots_patched: outcome.written,
            slots_overlaid: overlaid,
            ..Default::default()
        })
    }

    async fn block_future(&self, schedule: &Schedule) -> Result<ReconciliationResult, AppError> {
        let slots = self.slot_repo.list_by_schedule(&schedule.id, Some(self.clock.today())).await?;

        let outcome = write_with_retry(self.slot_repo.as_ref(), &slots, |slot| {
            let mut update = SlotUpdate::from_slot(slot);
            update.blocked = true;
            Some(update)
        })
        .await?;
        ensure_settled(&schedule.id, &outcome)?;

        info!(schedule_id = %schedule.id, blocked = outcome.written, "Blocked future slots of disabled schedule");
        Ok(ReconciliationResult {
            slots_blocked: outcome.written,
            ..Default::default()
        })
    }

    async fn reshape(
        &self,
        schedule: &Schedule,
        all_slots: bool,
        reenabled: bool,
    ) -> Result<ReconciliationResult, AppError> {
        let from = if all_slots { None } else { Some(self.clock.today()) };
        let slots = self.slot_repo.list_by_schedule(&schedule.id, from).await?;

        let (mut consumed, untouched): (Vec<Slot>, Vec<Slot>) =
            slots.into_iter().partition(|s| s.has_reservations());

        let untouched_ids: Vec<String> = untouched.iter().map(|s| s.id.clone()).collect();
        let deleted = if untouched_ids.is_empty() {
            Vec::new()
        } else {
            self.slot_repo.soft_delete_untouched(&untouched_ids, self.clock.now()).await?
        };

        // Slots that picked up a reservation after we read them were not deleted;
        // they must be patched like the rest of the consumed set.
        let deleted_set: HashSet<&str> = deleted.iter().map(String::as_str).collect();
        let survivors: Vec<String> = untouched_ids
            .iter()
            .filter(|id| !deleted_set.contains(id.as_str()))
            .cloned()
            .collect();
        if !survivors.is_empty() {
            warn!(schedule_id = %schedule.id, count = survivors.len(), "Slots were reserved during reconciliation, patching instead");
            consumed.extend(self.slot_repo.find_by_ids(&survivors).await?);
        }

        let (start_time, end_time) = schedule.slot_times();
        let new_total = schedule.capacity;
        let outcome = write_with_retry(self.slot_repo.as_ref(), &consumed, |slot| {
            let mut update = SlotUpdate::from_slot(slot);
            update.start_time = start_time;
            update.end_time = end_time;
            update.total_capacity = new_total;
            update.available_capacity = recompute_available(slot.total_capacity, slot.available_capacity, new_total);
            if reenabled {
                update.blocked = false;
            }
            Some(update)
        })
        .await?;
        ensure_settled(&schedule.id, &outcome)?;

        let generation = self.generator.generate(schedule).await?;
        let overlaid = self.modifications.reapply_to_schedule(schedule, from).await?;

        info!(
            schedule_id = %schedule.id,
            deleted = deleted.len(),
            patched = outcome.written,
            created = generation.slots_created,
            overlaid,
            "Regenerated schedule slots"
        );

        Ok(ReconciliationResult {
            regenerated: true,
            slots_patched: outcome.written,
            slots_deleted: deleted.len(),
            slots_blocked: 0,
            slots_overlaid: overlaid,
            generation: Some(generation),
        })
    }
}

fn ensure_settled(schedule_id: &str, outcome: &WriteOutcome) -> Result<(), AppError> {
    if outcome.stale.is_empty() {
        return Ok(());
    }
    Err(AppError::Conflict(format!(
        "{} slot(s) of schedule {} changed concurrently during reconciliation: {}",
        outcome.stale.len(),
        schedule_id,
        outcome.stale.join(", ")
    )))
}
