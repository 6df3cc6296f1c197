use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use tracing::{info, warn};

use crate::domain::models::{
    lifecycle::SoftDeletable,
    modification::{ModificationFamily, ModificationKind, ModificationType, NewModificationParams, TemporaryModification},
    schedule::Schedule,
    slot::{Slot, SlotScope, SlotUpdate},
};
use crate::domain::ports::{Clock, ModificationRepository, ReservationRepository, ScheduleRepository, SlotRepository};
use crate::domain::services::calendar::validate_range;
use crate::domain::services::capacity::{recompute_available, would_undercut_consumed};
use crate::domain::services::slot_writer::write_each_tolerant;
use crate::error::AppError;

/// Unvalidated request to create a modification. Which reference is mandatory
/// depends on `modification_type`.
#[derive(Debug, Clone)]
pub struct ModificationInput {
    pub modification_type: ModificationType,
    pub schedule_id: Option<String>,
    pub activity_id: Option<String>,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub new_start_time: Option<NaiveTime>,
    pub new_end_time: Option<NaiveTime>,
    pub new_capacity: Option<i32>,
    pub current_start_time: Option<NaiveTime>,
    pub current_end_time: Option<NaiveTime>,
    pub current_capacity: Option<i32>,
    pub reason: Option<String>,
}

impl ModificationInput {
    pub fn to_kind(&self, agency_id: &str) -> Result<ModificationKind, AppError> {
        let required = |value: &Option<String>, field: &str| {
            value
                .clone()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| AppError::Validation(format!("{} requires {}", self.modification_type, field)))
        };

        let kind = match self.modification_type {
            ModificationType::ChangeStartTime => {
                let start_time = self.new_start_time.ok_or_else(|| {
                    AppError::Validation("CHANGE_START_TIME requires new_start_time".into())
                })?;
                if let Some(end) = self.new_end_time
                    && end <= start_time {
                    return Err(AppError::Validation("new_end_time must be after new_start_time".into()));
                }
                ModificationKind::ChangeStartTime {
                    schedule_id: required(&self.schedule_id, "schedule_id")?,
                    start_time,
                    end_time: self.new_end_time,
                }
            }
            ModificationType::ChangeCapacity => {
                let capacity = self.new_capacity.ok_or_else(|| {
                    AppError::Validation("CHANGE_CAPACITY requires new_capacity".into())
                })?;
                if capacity < 0 {
                    return Err(AppError::Validation("new_capacity must not be negative".into()));
                }
                ModificationKind::ChangeCapacity {
                    schedule_id: required(&self.schedule_id, "schedule_id")?,
                    capacity,
                }
            }
            ModificationType::BlockSchedule => ModificationKind::BlockSchedule {
                schedule_id: required(&self.schedule_id, "schedule_id")?,
            },
            ModificationType::BlockActivity => ModificationKind::BlockActivity {
                activity_id: required(&self.activity_id, "activity_id")?,
            },
            ModificationType::BlockAll => ModificationKind::BlockAll {
                agency_id: agency_id.to_string(),
            },
        };
        Ok(kind)
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct ApplyOutcome {
    pub modification: TemporaryModification,
    pub slots_in_scope: usize,
    pub slots_affected: usize,
}

#[derive(Debug, Serialize, Clone)]
pub struct CreateOutcome {
    pub modification: TemporaryModification,
    pub applied: bool,
    pub slots_affected: usize,
    pub warning: Option<String>,
}

#[derive(Debug, Serialize, Clone)]
pub struct RevertOutcome {
    pub modification_id: String,
    pub slots_affected: usize,
    pub warning: Option<String>,
}

/// Applies and reverts time-bounded overrides on slots without touching the
/// underlying schedules.
pub struct ModificationEngine {
    schedule_repo: Arc<dyn ScheduleRepository>,
    slot_repo: Arc<dyn SlotRepository>,
    modification_repo: Arc<dyn ModificationRepository>,
    reservation_repo: Arc<dyn ReservationRepository>,
    clock: Arc<dyn Clock>,
}

impl ModificationEngine {
    pub fn new(
        schedule_repo: Arc<dyn ScheduleRepository>,
        slot_repo: Arc<dyn SlotRepository>,
        modification_repo: Arc<dyn ModificationRepository>,
        reservation_repo: Arc<dyn ReservationRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { schedule_repo, slot_repo, modification_repo, reservation_repo, clock }
    }

    /// Validates, stores and applies a modification. A stored modification whose
    /// application failed is returned with `applied = false` and a warning.
    pub async fn create(&self, agency_id: &str, input: ModificationInput) -> Result<CreateOutcome, AppError> {
        let kind = input.to_kind(agency_id)?;
        validate_range(input.date_from, input.date_to)?;

        let activity_id = match kind.schedule_id() {
            Some(schedule_id) => {
                let schedule = self.schedule_repo.find_by_id(schedule_id).await?
                    .filter(|s| s.agency_id == agency_id)
                    .ok_or_else(|| AppError::NotFound(format!("Schedule {} not found", schedule_id)))?;
                Some(schedule.activity_id)
            }
            None => input.activity_id.clone(),
        };

        let record = TemporaryModification::new(NewModificationParams {
            agency_id: agency_id.to_string(),
            activity_id,
            kind,
            date_from: input.date_from,
            date_to: input.date_to,
            previous_start_time: input.current_start_time,
            previous_end_time: input.current_end_time,
            previous_capacity: input.current_capacity,
            reason: input.reason,
        });

        self.reject_overlaps(&record).await?;
        self.check_conflicts(&record).await?;
        let saved = self.modification_repo.create(&record).await?;
        info!(modification_id = %saved.id, kind = %saved.kind, "Stored temporary modification");

        match self.apply(&saved).await {
            Ok(outcome) => {
                let warning = (outcome.slots_affected < outcome.slots_in_scope).then(|| {
                    format!(
                        "Modification saved but only applied to {} of {} slot(s)",
                        outcome.slots_affected, outcome.slots_in_scope
                    )
                });
                Ok(CreateOutcome {
                    modification: outcome.modification,
                    applied: true,
                    slots_affected: outcome.slots_affected,
                    warning,
                })
            }
            Err(e) => {
                warn!(modification_id = %saved.id, "Modification saved but not applied: {}", e);
                Ok(CreateOutcome {
                    modification: saved,
                    applied: false,
                    slots_affected: 0,
                    warning: Some(format!("Modification saved but not applied: {}", e)),
                })
            }
        }
    }

    /// Checks for conflicts, captures previous values and mutates every slot in scope.
    /// Conflicts are detected before any write; per-slot write failures are skipped.
    pub async fn apply(&self, modification: &TemporaryModification) -> Result<ApplyOutcome, AppError> {
        if !modification.is_active() {
            return Err(AppError::NotFound(format!("Modification {} not found", modification.id)));
        }

        let kind = modification.typed_kind()?;
        let slots = self.check_conflicts(modification).await?;

        // Recorded as active before any slot changes so a revert always finds it.
        let mut record = modification.clone();
        self.capture_previous_values(&mut record, &kind, slots.first()).await?;
        record.active = true;
        let record = self.modification_repo.update(&record).await?;

        let outcome = write_each_tolerant(self.slot_repo.as_ref(), &slots, |slot| apply_to_slot(&kind, slot)).await;

        info!(
            modification_id = %record.id,
            in_scope = slots.len(),
            affected = outcome.written,
            "Applied temporary modification"
        );

        Ok(ApplyOutcome {
            modification: record,
            slots_in_scope: outcome.attempted,
            slots_affected: outcome.written,
        })
    }

    /// Restores the slots currently in scope to the captured previous values and
    /// soft-deletes the modification. Reservations made meanwhile are kept.
    pub async fn revert(&self, modification_id: &str) -> Result<RevertOutcome, AppError> {
        let record = self.modification_repo.find_by_id(modification_id).await?
            .ok_or_else(|| AppError::NotFound(format!("Modification {} not found", modification_id)))?;

        let mut slots_affected = 0;
        let mut warning = None;
        if record.active {
            let kind = record.typed_kind()?;
            let slots = self.slot_repo.list_in_scope(&kind.scope(), record.date_from, record.date_to).await?;
            let keep_blocked = if kind.family() == ModificationFamily::Block {
                self.still_blocked(&record, &slots).await?
            } else {
                HashSet::new()
            };

            let outcome = write_each_tolerant(self.slot_repo.as_ref(), &slots, |slot| {
                if keep_blocked.contains(&slot.id) {
                    return None;
                }
                revert_slot(&record, &kind, slot)
            })
            .await;
            if outcome.written < outcome.attempted {
                warn!(
                    modification_id,
                    attempted = outcome.attempted,
                    written = outcome.written,
                    "Modification only partially reverted"
                );
                warning = Some(format!(
                    "Modification removed but only reverted {} of {} slot(s)",
                    outcome.written, outcome.attempted
                ));
            }
            slots_affected = outcome.written;
        }

        self.modification_repo.soft_delete(modification_id, self.clock.now()).await?;
        info!(modification_id, slots_affected, "Reverted temporary modification");

        Ok(RevertOutcome {
            modification_id: modification_id.to_string(),
            slots_affected,
            warning,
        })
    }

    /// Slots that must stay blocked after `record` is lifted: those under another
    /// active block, and future slots of a disabled or deleted schedule.
    async fn still_blocked(&self, record: &TemporaryModification, slots: &[Slot]) -> Result<HashSet<String>, AppError> {
        let mut other_blocks = Vec::new();
        for other in self.modification_repo.list_overlapping(&record.agency_id, record.date_from, record.date_to).await? {
            if other.id == record.id || !other.active {
                continue;
            }
            let kind = other.typed_kind()?;
            if kind.family() == ModificationFamily::Block {
                other_blocks.push((other.date_from, other.date_to, kind.scope()));
            }
        }

        let today = self.clock.today();
        let mut schedule_enabled: HashMap<String, bool> = HashMap::new();
        let mut keep = HashSet::new();

        for slot in slots {
            let covered = other_blocks
                .iter()
                .any(|(from, to, scope)| *from <= slot.date && slot.date <= *to && scope.matches(slot));

            let disabled = if slot.date >= today {
                if !schedule_enabled.contains_key(&slot.schedule_id) {
                    let enabled = self.schedule_repo.find_by_id(&slot.schedule_id).await?
                        .is_some_and(|s| s.enabled);
                    schedule_enabled.insert(slot.schedule_id.clone(), enabled);
                }
                !schedule_enabled[&slot.schedule_id]
            } else {
                false
            };

            if covered || disabled {
                keep.insert(slot.id.clone());
            }
        }

        if !keep.is_empty() {
            info!(modification_id = %record.id, kept = keep.len(), "Slots stay blocked after revert");
        }
        Ok(keep)
    }

    /// Lays every active modification covering `schedule` back over its slots from
    /// `from` on, oldest first. Used after schedule edits rewrite those slots.
    pub async fn reapply_to_schedule(&self, schedule: &Schedule, from: Option<NaiveDate>) -> Result<usize, AppError> {
        let slots = self.slot_repo.list_by_schedule(&schedule.id, from).await?;
        let (Some(first), Some(last)) = (slots.first(), slots.last()) else {
            return Ok(0);
        };

        let modifications = self.modification_repo
            .list_overlapping(&schedule.agency_id, first.date, last.date)
            .await?;

        let mut written = 0;
        for modification in modifications.iter().filter(|m| m.active) {
            let kind = modification.typed_kind()?;
            if !kind.scope().covers_schedule(schedule) {
                continue;
            }

            let date_from = modification.date_from.max(first.date);
            let in_range = self.slot_repo
                .list_in_scope(&SlotScope::Schedule(schedule.id.clone()), date_from, modification.date_to)
                .await?;
            let outcome = write_each_tolerant(self.slot_repo.as_ref(), &in_range, |slot| apply_to_slot(&kind, slot)).await;
            if outcome.written < outcome.attempted {
                warn!(
                    modification_id = %modification.id,
                    attempted = outcome.attempted,
                    written = outcome.written,
                    "Modification only partially re-applied"
                );
            }
            written += outcome.written;
        }

        if written > 0 {
            info!(schedule_id = %schedule.id, written, "Re-applied live modifications after schedule change");
        }
        Ok(written)
    }

    /// Loads the slots in scope and fails if the modification may not touch them:
    /// any live reservation for the blocking and start-time kinds, or a slot whose
    /// reserved units exceed the new capacity. Nothing is written.
    async fn check_conflicts(&self, modification: &TemporaryModification) -> Result<Vec<Slot>, AppError> {
        let kind = modification.typed_kind()?;
        let scope = kind.scope();
        let slots = self.slot_repo.list_in_scope(&scope, modification.date_from, modification.date_to).await?;

        if kind.rejects_reservations() {
            let reservations = self.reservation_repo
                .count_live_in_scope(&scope, modification.date_from, modification.date_to)
                .await?;
            if reservations > 0 {
                warn!(modification_id = %modification.id, reservations, "Modification conflicts with reservations");
                return Err(AppError::ReservationConflict { reservations });
            }
        }

        if let ModificationKind::ChangeCapacity { capacity, .. } = &kind
            && let Some(slot) = slots.iter().find(|s| would_undercut_consumed(s.total_capacity, s.available_capacity, *capacity)) {
            warn!(modification_id = %modification.id, slot_id = %slot.id, "Capacity change would undercut reserved units");
            return Err(AppError::CapacityConflict {
                slot_id: slot.id.clone(),
                consumed: slot.consumed(),
                requested: *capacity,
            });
        }

        Ok(slots)
    }

    async fn reject_overlaps(&self, record: &TemporaryModification) -> Result<(), AppError> {
        let family = record.typed_kind()?.family();
        let existing = self.modification_repo
            .list_overlapping(&record.agency_id, record.date_from, record.date_to)
            .await?;

        for other in existing.iter().filter(|m| m.id != record.id) {
            if other.typed_kind()?.family() == family
                && other.date_range_overlaps(record)
                && other.scope_intersects(record) {
                return Err(AppError::Conflict(format!(
                    "Overlaps existing {} modification {} ({} to {})",
                    other.kind, other.id, other.date_from, other.date_to
                )));
            }
        }
        Ok(())
    }

    async fn capture_previous_values(
        &self,
        record: &mut TemporaryModification,
        kind: &ModificationKind,
        representative: Option<&Slot>,
    ) -> Result<(), AppError> {
        let needs_capture = match kind {
            ModificationKind::ChangeStartTime { .. } => record.previous_start_time.is_none(),
            ModificationKind::ChangeCapacity { .. } => record.previous_capacity.is_none(),
            _ => false,
        };
        if !needs_capture {
            return Ok(());
        }

        let (start_time, end_time, capacity) = match representative {
            Some(slot) => (slot.start_time, slot.end_time, slot.total_capacity),
            None => {
                let schedule_id = kind.schedule_id().unwrap_or_default();
                let schedule = self.schedule_repo.find_by_id(schedule_id).await?
                    .ok_or_else(|| AppError::NotFound(format!("Schedule {} not found", schedule_id)))?;
                let (start, end) = schedule.slot_times();
                (start, end, schedule.capacity)
            }
        };

        match kind {
            ModificationKind::ChangeStartTime { .. } => {
                record.previous_start_time = start_time;
                record.previous_end_time = record.previous_end_time.or(end_time);
            }
            ModificationKind::ChangeCapacity { .. } => record.previous_capacity = Some(capacity),
            _ => {}
        }
        Ok(())
    }
}

fn apply_to_slot(kind: &ModificationKind, slot: &Slot) -> Option<SlotUpdate> {
    let mut update = SlotUpdate::from_slot(slot);
    match kind {
        ModificationKind::BlockSchedule { .. }
        | ModificationKind::BlockActivity { .. }
        | ModificationKind::BlockAll { .. } => update.blocked = true,
        ModificationKind::ChangeStartTime { start_time, end_time, .. } => {
            update.start_time = Some(*start_time);
            if end_time.is_some() {
                update.end_time = *end_time;
            }
        }
        ModificationKind::ChangeCapacity { capacity, .. } => {
            if would_undercut_consumed(slot.total_capacity, slot.available_capacity, *capacity) {
                warn!(slot_id = %slot.id, consumed = slot.consumed(), capacity, "Slot was reserved past the new capacity, skipped");
                return None;
            }
            update.total_capacity = *capacity;
            update.available_capacity = recompute_available(slot.total_capacity, slot.available_capacity, *capacity);
        }
    }
    Some(update)
}

fn revert_slot(record: &TemporaryModification, kind: &ModificationKind, slot: &Slot) -> Option<SlotUpdate> {
    let mut update = SlotUpdate::from_slot(slot);
    match kind {
        ModificationKind::BlockSchedule { .. }
        | ModificationKind::BlockActivity { .. }
        | ModificationKind::BlockAll { .. } => update.blocked = false,
        ModificationKind::ChangeStartTime { end_time, .. } => {
            update.start_time = record.previous_start_time;
            if end_time.is_some() {
                update.end_time = record.previous_end_time;
            }
        }
        ModificationKind::ChangeCapacity { .. } => {
            let previous = record.previous_capacity?;
            if would_undercut_consumed(slot.total_capacity, slot.available_capacity, previous) {
                warn!(slot_id = %slot.id, consumed = slot.consumed(), previous, "Restored capacity is below reserved units");
            }
            update.total_capacity = previous;
            update.available_capacity = recompute_available(slot.total_capacity, slot.available_capacity, previous);
        }
    }
    Some(update)
}
