use std::collections::HashSet;
use std::sync::Arc;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::domain::models::{lifecycle::SoftDeletable, schedule::Schedule, slot::Slot};
use crate::domain::ports::{Clock, ScheduleRepository, SlotRepository};
use crate::domain::services::calendar::add_days;
use crate::domain::services::recurrence::{expand_recurrence, occurrences_between};
use crate::error::AppError;

pub const SKIP_REASON_EXISTS: &str = "slot already exists for this date and schedule";

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct SkippedDate {
    pub date: NaiveDate,
    pub reason: String,
}

#[derive(Debug, Serialize, Clone, Default, PartialEq, Eq)]
pub struct GenerationResult {
    pub dates_considered: usize,
    pub slots_created: usize,
    pub slots_skipped: usize,
    pub skipped_detail: Vec<SkippedDate>,
}

impl GenerationResult {
    pub fn merge(&mut self, other: GenerationResult) {
        self.dates_considered += other.dates_considered;
        self.slots_created += other.slots_created;
        self.slots_skipped += other.slots_skipped;
        self.skipped_detail.extend(other.skipped_detail);
    }

    fn skip(&mut self, date: NaiveDate) {
        self.slots_skipped += 1;
        self.skipped_detail.push(SkippedDate {
            date,
            reason: SKIP_REASON_EXISTS.to_string(),
        });
    }
}

/// Materializes recurring schedules into dated slots. Generation is idempotent:
/// dates that already have a live slot for the schedule are skipped.
pub struct SlotGenerator {
    schedule_repo: Arc<dyn ScheduleRepository>,
    slot_repo: Arc<dyn SlotRepository>,
    clock: Arc<dyn Clock>,
    horizon_days: i64,
}

impl SlotGenerator {
    pub fn new(
        schedule_repo: Arc<dyn ScheduleRepository>,
        slot_repo: Arc<dyn SlotRepository>,
        clock: Arc<dyn Clock>,
        horizon_days: i64,
    ) -> Self {
        Self { schedule_repo, slot_repo, clock, horizon_days }
    }

    pub fn horizon_days(&self) -> i64 {
        self.horizon_days
    }

    pub fn expand(&self, schedule: &Schedule) -> Vec<NaiveDate> {
        expand_recurrence(schedule, self.horizon_days)
    }

    pub async fn generate(&self, schedule: &Schedule) -> Result<GenerationResult, AppError> {
        let dates = self.expand(schedule);
        self.generate_dates(schedule, dates).await
    }

    /// Tops up a schedule so it is materialized through `today + horizon_days`.
    /// Dates before today are left alone.
    pub async fn extend_horizon(&self, schedule: &Schedule) -> Result<GenerationResult, AppError> {
        let today = self.clock.today();
        let until = add_days(today, self.horizon_days);
        let dates: Vec<NaiveDate> = occurrences_between(schedule, today, until).collect();
        self.generate_dates(schedule, dates).await
    }

    async fn generate_dates(&self, schedule: &Schedule, dates: Vec<NaiveDate>) -> Result<GenerationResult, AppError> {
        let mut result = GenerationResult::default();

        if !schedule.enabled || !schedule.is_active() {
            return Ok(result);
        }

        result.dates_considered = dates.len();
        if dates.is_empty() {
            return Ok(result);
        }

        let existing = self.slot_repo.list_by_schedule_dates(&schedule.id, &dates).await
            .inspect_err(|e| error!(schedule_id = %schedule.id, "Could not load existing slots: {:?}", e))?;
        let existing_dates: HashSet<NaiveDate> = existing.iter().map(|s| s.date).collect();

        let now = self.clock.now();
        let mut new_slots = Vec::new();
        for date in &dates {
            if existing_dates.contains(date) {
                result.skip(*date);
            } else {
                new_slots.push(Slot::from_schedule(schedule, *date, now));
            }
        }

        if new_slots.is_empty() {
            return Ok(result);
        }

        let inserted = self.slot_repo.insert_many(&new_slots).await
            .inspect_err(|e| error!(schedule_id = %schedule.id, "Bulk slot insert failed: {:?}", e))? as usize;
        result.slots_created = inserted;

        if inserted < new_slots.len() {
            // A concurrent generation claimed some dates between our read and insert.
            let attempted: Vec<NaiveDate> = new_slots.iter().map(|s| s.date).collect();
            let ours: HashSet<&str> = new_slots.iter().map(|s| s.id.as_str()).collect();
            let now_live = self.slot_repo.list_by_schedule_dates(&schedule.id, &attempted).await?;
            for slot in now_live.iter().filter(|s| !ours.contains(s.id.as_str())) {
                result.skip(slot.date);
            }
            warn!(
                schedule_id = %schedule.id,
                "{} date(s) were generated concurrently and skipped",
                new_slots.len() - inserted
            );
        }

        info!(
            schedule_id = %schedule.id,
            created = result.slots_created,
            skipped = result.slots_skipped,
            "Generated slots"
        );
        Ok(result)
    }

    /// Generates every enabled schedule of the activity. Stops at the first failure.
    pub async fn generate_for_activity(&self, activity_id: &str) -> Result<GenerationResult, AppError> {
        let schedules = self.schedule_repo.list_enabled_by_activity(activity_id).await?;
        let mut total = GenerationResult::default();

        for schedule in &schedules {
            let result = self.generate(schedule).await
                .inspect_err(|e| error!(activity_id, schedule_id = %schedule.id, "Generation aborted: {}", e))?;
            total.merge(result);
        }

        info!(activity_id, schedules = schedules.len(), created = total.slots_created, "Generated slots for activity");
        Ok(total)
    }
}
