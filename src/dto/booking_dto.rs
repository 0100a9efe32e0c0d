use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::candidate::CandidateRecord;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ScheduleRequest {
    #[serde(alias = "id", alias = "candidateId")]
    #[validate(length(min = 1, max = 64))]
    pub candidate_id: String,
    #[serde(alias = "token")]
    #[validate(length(min = 1, max = 128))]
    pub signature: String,
    #[serde(alias = "appointmentTime")]
    pub appointment_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RescheduleRequest {
    #[serde(alias = "appointmentTime")]
    pub appointment_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingView {
    pub candidate_name: String,
    pub email: String,
    pub appointment_time: Option<DateTime<Utc>>,
    pub status: String,
    pub interview_completed: bool,
    pub can_reschedule: bool,
    pub can_cancel: bool,
}

impl From<&CandidateRecord> for BookingView {
    fn from(record: &CandidateRecord) -> Self {
        let started = record.interview_started();
        let cancelled = record.is_cancelled();
        Self {
            candidate_name: record.name.clone(),
            email: record.email.clone(),
            appointment_time: record.appointment_time,
            status: record.status.to_string(),
            interview_completed: started,
            can_reschedule: !started && !cancelled,
            can_cancel: !started && !cancelled,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub success: bool,
    pub message: String,
    pub booking: BookingView,
}
