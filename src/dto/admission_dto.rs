use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::services::admission_service::CandidateSummary;
use crate::services::window::{WindowResult, CLOSES_AFTER_MINUTES, OPENS_BEFORE_MINUTES};

#[derive(Debug, Clone, Deserialize)]
pub struct TokenRequest {
    #[serde(default)]
    pub token: Option<String>,
}

impl TokenRequest {
    /// The token with surrounding whitespace removed, if one was sent.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeInfo {
    pub valid: bool,
    pub too_early: bool,
    pub too_late: bool,
    pub appointment_time: DateTime<Utc>,
    pub current_time: DateTime<Utc>,
    pub window_opens_minutes_before: i64,
    pub window_closes_minutes_after: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minutes_into_window: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minutes_until: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hours: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minutes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minutes_late: Option<i64>,
    pub message: String,
}

impl TimeInfo {
    pub fn new(window: &WindowResult, appointment: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let mut info = TimeInfo {
            valid: matches!(window, WindowResult::Valid { .. }),
            too_early: matches!(window, WindowResult::TooEarly { .. }),
            too_late: matches!(window, WindowResult::TooLate { .. }),
            appointment_time: appointment,
            current_time: now,
            window_opens_minutes_before: OPENS_BEFORE_MINUTES,
            window_closes_minutes_after: CLOSES_AFTER_MINUTES,
            minutes_into_window: None,
            minutes_until: None,
            days: None,
            hours: None,
            minutes: None,
            minutes_late: None,
            message: window.message(),
        };
        match *window {
            WindowResult::Valid {
                minutes_into_window,
            } => info.minutes_into_window = Some(minutes_into_window),
            WindowResult::TooEarly {
                minutes_until,
                until,
            } => {
                info.minutes_until = Some(minutes_until);
                info.days = Some(until.days);
                info.hours = Some(until.hours);
                info.minutes = Some(until.minutes);
            }
            WindowResult::TooLate { minutes_late } => info.minutes_late = Some(minutes_late),
        }
        info
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateTokenResponse {
    pub valid: bool,
    pub message: String,
    pub candidate: CandidateSummary,
    pub time_info: TimeInfo,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkStartedResponse {
    pub success: bool,
    pub call_attempts: i32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VapiCredentialsResponse {
    pub public_key: String,
    pub assistant_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn time_info_flags_follow_the_window() {
        let appointment = Utc::now();

        let open = TimeInfo::new(&WindowResult::Valid { minutes_into_window: 5 }, appointment, appointment);
        assert!(open.valid && !open.too_early && !open.too_late);

        let late_at = appointment + Duration::minutes(40);
        let late = TimeInfo::new(&WindowResult::TooLate { minutes_late: 10 }, appointment, late_at);
        assert!(!late.valid && !late.too_early && late.too_late);

        let json = serde_json::to_value(&late).unwrap();
        assert_eq!(json["valid"], false);
        assert_eq!(json["tooEarly"], false);
        assert_eq!(json["tooLate"], true);
        assert_eq!(json["minutesLate"], 10);
    }
}
