use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

pub const STATUS_HOLD: &str = "HOLD";
pub const STATUS_CONFIRMED: &str = "CONFIRMED";
pub const STATUS_CANCELLED: &str = "CANCELLED";

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Reservation {
    pub id: String,
    pub slot_id: String,
    pub agency_id: String,
    pub quantity: i32,
    pub status: String, // "HOLD", "CONFIRMED" or "CANCELLED"
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    pub fn new(slot_id: String, agency_id: String, quantity: i32) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            slot_id,
            agency_id,
            quantity,
            status: STATUS_HOLD.to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn is_live(&self) -> bool {
        self.status == STATUS_HOLD || self.status == STATUS_CONFIRMED
    }
}
