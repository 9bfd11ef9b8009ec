use chrono::NaiveTime;
use serde::Deserialize;
use shared_models::schedule::Weekday;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Availability template not found: {0}")]
    NotFound(String),

    #[error("Schedule conflict: {0}")]
    Conflict(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTemplateRequest {
    pub doctor_id: Uuid,
    pub day: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub max_appointments: u32,
    pub is_available: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTemplateRequest {
    pub day: Option<Weekday>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub max_appointments: Option<u32>,
    pub is_available: Option<bool>,
}
