use chrono::NaiveDate;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct CreateScheduleRequest {
    pub activity_id: String,
    pub start_date: NaiveDate,
    pub weekdays: Vec<u8>,
    #[serde(default)]
    pub full_day: bool,
    pub start_time: Option<String>, // "HH:MM"
    pub end_time: Option<String>,
    pub capacity: i32,
    pub enabled: Option<bool>,
}

#[derive(Deserialize)]
pub struct UpdateScheduleRequest {
    pub start_date: Option<NaiveDate>,
    pub weekdays: Option<Vec<u8>>,
    pub full_day: Option<bool>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub capacity: Option<i32>,
    pub enabled: Option<bool>,
}

#[derive(Deserialize, Default)]
pub struct ReconcileQuery {
    #[serde(default)]
    pub full_regenerate: bool,
}

#[derive(Deserialize, Default)]
pub struct SlotRangeQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateModificationRequest {
    #[serde(rename = "type")]
    pub modification_type: String,
    pub schedule_id: Option<String>,
    pub activity_id: Option<String>,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub new_start_time: Option<String>,
    pub new_end_time: Option<String>,
    pub new_capacity: Option<i32>,
    pub current_start_time: Option<String>,
    pub current_end_time: Option<String>,
    pub current_capacity: Option<i32>,
    pub reason: Option<String>,
}

#[derive(Deserialize)]
pub struct HoldRequest {
    pub slot_id: String,
    pub quantity: i32,
}
