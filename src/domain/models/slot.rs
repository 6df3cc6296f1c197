use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::lifecycle::SoftDeletable;
use super::schedule::Schedule;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
pub struct Slot {
    pub id: String,
    pub schedule_id: String,
    pub activity_id: String,
    pub agency_id: String,
    pub date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub total_capacity: i32,
    pub available_capacity: i32,
    pub blocked: bool,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Slot {
    /// Fresh, fully available slot for `date` built from the schedule template.
    pub fn from_schedule(schedule: &Schedule, date: NaiveDate, created_at: DateTime<Utc>) -> Self {
        let (start_time, end_time) = schedule.slot_times();
        Self {
            id: Uuid::new_v4().to_string(),
            schedule_id: schedule.id.clone(),
            activity_id: schedule.activity_id.clone(),
            agency_id: schedule.agency_id.clone(),
            date,
            start_time,
            end_time,
            total_capacity: schedule.capacity,
            available_capacity: schedule.capacity,
            blocked: false,
            created_at,
            deleted_at: None,
        }
    }

    /// Units already committed to reservations.
    pub fn consumed(&self) -> i32 {
        self.total_capacity - self.available_capacity
    }

    pub fn has_reservations(&self) -> bool {
        self.total_capacity != self.available_capacity
    }
}

impl SoftDeletable for Slot {
    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
}

/// Full new state of a slot's mutable columns, written only if the row still holds
/// every `expected_*` value it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotUpdate {
    pub id: String,
    pub expected_total: i32,
    pub expected_available: i32,
    pub expected_start_time: Option<NaiveTime>,
    pub expected_end_time: Option<NaiveTime>,
    pub expected_blocked: bool,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub total_capacity: i32,
    pub available_capacity: i32,
    pub blocked: bool,
}

impl SlotUpdate {
    /// Starts from the slot's current state; callers override the fields they change.
    pub fn from_slot(slot: &Slot) -> Self {
        Self {
            id: slot.id.clone(),
            expected_total: slot.total_capacity,
            expected_available: slot.available_capacity,
            expected_start_time: slot.start_time,
            expected_end_time: slot.end_time,
            expected_blocked: slot.blocked,
            start_time: slot.start_time,
            end_time: slot.end_time,
            total_capacity: slot.total_capacity,
            available_capacity: slot.available_capacity,
            blocked: slot.blocked,
        }
    }

    pub fn changes(&self, slot: &Slot) -> bool {
        self.start_time != slot.start_time
            || self.end_time != slot.end_time
            || self.total_capacity != slot.total_capacity
            || self.available_capacity != slot.available_capacity
            || self.blocked != slot.blocked
    }
}

/// Which slots a query or modification covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotScope {
    Schedule(String),
    Activity(String),
    Agency(String),
}

impl SlotScope {
    pub fn column(&self) -> &'static str {
        match self {
            SlotScope::Schedule(_) => "schedule_id",
            SlotScope::Activity(_) => "activity_id",
            SlotScope::Agency(_) => "agency_id",
        }
    }

    pub fn id(&self) -> &str {
        match self {
            SlotScope::Schedule(id) | SlotScope::Activity(id) | SlotScope::Agency(id) => id,
        }
    }

    pub fn matches(&self, slot: &Slot) -> bool {
        match self {
            SlotScope::Schedule(id) => slot.schedule_id == *id,
            SlotScope::Activity(id) => slot.activity_id == *id,
            SlotScope::Agency(id) => slot.agency_id == *id,
        }
    }

    /// Whether the scope takes in every slot of `schedule`.
    pub fn covers_schedule(&self, schedule: &Schedule) -> bool {
        match self {
            SlotScope::Schedule(id) => schedule.id == *id,
            SlotScope::Activity(id) => schedule.activity_id == *id,
            SlotScope::Agency(id) => schedule.agency_id == *id,
        }
    }
}
