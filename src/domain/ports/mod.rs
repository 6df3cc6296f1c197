use crate::domain::models::{
    schedule::Schedule,
    slot::{Slot, SlotScope, SlotUpdate},
    modification::TemporaryModification,
    reservation::Reservation,
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

/// Source of "now" for the engine. All dates are UTC calendar dates.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    async fn create(&self, schedule: &Schedule) -> Result<Schedule, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Schedule>, AppError>;
    async fn list_enabled_by_activity(&self, activity_id: &str) -> Result<Vec<Schedule>, AppError>;
    async fn list_enabled(&self) -> Result<Vec<Schedule>, AppError>;
    async fn update(&self, schedule: &Schedule) -> Result<Schedule, AppError>;
    async fn soft_delete(&self, id: &str, at: DateTime<Utc>) -> Result<(), AppError>;
}

#[async_trait]
pub trait SlotRepository: Send + Sync {
    /// Inserts all slots in one transaction, skipping dates that already have a live slot.
    /// Returns the number of rows actually inserted.
    async fn insert_many(&self, slots: &[Slot]) -> Result<u64, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Slot>, AppError>;
    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Slot>, AppError>;
    async fn list_by_schedule_dates(&self, schedule_id: &str, dates: &[NaiveDate]) -> Result<Vec<Slot>, AppError>;
    /// Live slots of a schedule, optionally only those on or after `from`.
    async fn list_by_schedule(&self, schedule_id: &str, from: Option<NaiveDate>) -> Result<Vec<Slot>, AppError>;
    async fn list_in_scope(&self, scope: &SlotScope, from: NaiveDate, to: NaiveDate) -> Result<Vec<Slot>, AppError>;
    /// Writes every update whose row still holds its expected values, all in one
    /// transaction. Returns the ids that were stale (or gone) and left untouched.
    async fn compare_and_update(&self, updates: &[SlotUpdate]) -> Result<Vec<String>, AppError>;
    /// Soft-deletes the given slots only while they have no consumed capacity.
    /// Returns the ids actually deleted.
    async fn soft_delete_untouched(&self, ids: &[String], at: DateTime<Utc>) -> Result<Vec<String>, AppError>;
}

#[async_trait]
pub trait ModificationRepository: Send + Sync {
    async fn create(&self, modification: &TemporaryModification) -> Result<TemporaryModification, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<TemporaryModification>, AppError>;
    async fn update(&self, modification: &TemporaryModification) -> Result<TemporaryModification, AppError>;
    async fn soft_delete(&self, id: &str, at: DateTime<Utc>) -> Result<(), AppError>;
    async fn list_overlapping(&self, agency_id: &str, from: NaiveDate, to: NaiveDate) -> Result<Vec<TemporaryModification>, AppError>;
}

#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// Atomically takes `quantity` units from the slot and records a HOLD.
    async fn hold(&self, reservation: &Reservation) -> Result<Reservation, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Reservation>, AppError>;
    async fn confirm(&self, id: &str) -> Result<Reservation, AppError>;
    /// Cancels a live reservation and returns its units to the slot.
    async fn release(&self, id: &str) -> Result<Reservation, AppError>;
    async fn count_live_in_scope(&self, scope: &SlotScope, from: NaiveDate, to: NaiveDate) -> Result<i64, AppError>;
}
