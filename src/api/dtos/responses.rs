use serde::Serialize;
use crate::domain::models::schedule::Schedule;
use crate::domain::services::{
    reconciler::ReconciliationResult,
    slot_generator::GenerationResult,
};

#[derive(Serialize)]
pub struct ScheduleCreatedResponse {
    pub schedule: Schedule,
    pub generation: GenerationResult,
}

#[derive(Serialize)]
pub struct ScheduleUpdatedResponse {
    pub schedule: Schedule,
    pub reconciliation: ReconciliationResult,
}

#[derive(Serialize)]
pub struct ExpansionResponse {
    pub schedule_id: String,
    pub horizon_days: i64,
    pub dates: Vec<String>,
}
