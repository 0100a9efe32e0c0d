use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Value written to `action` once the live interview has been entered.
pub const ACTION_INTERVIEWED: &str = "interviewed";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    #[serde(skip_serializing)]
    pub token: Option<String>,
    #[serde(skip_serializing)]
    pub management_token: Option<String>,
    pub appointment_time: Option<DateTime<Utc>>,
    pub status: CandidateStatus,
    pub call_attempts: i32,
    pub interview_completed: bool,
    pub action: Option<String>,
    pub call_started_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub result: InterviewResult,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CandidateRecord {
    /// A fresh, unscheduled record.
    pub fn new(id: impl Into<String>, name: impl Into<String>, email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            phone: None,
            token: None,
            management_token: None,
            appointment_time: None,
            status: CandidateStatus::Pending,
            call_attempts: 0,
            interview_completed: false,
            action: None,
            call_started_at: None,
            result: InterviewResult::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// True once admission has been consumed, whichever flag the store recorded.
    pub fn interview_started(&self) -> bool {
        self.interview_completed || self.action.as_deref() == Some(ACTION_INTERVIEWED)
    }

    pub fn display_status(&self) -> DisplayStatus {
        self.status.display()
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.status, CandidateStatus::Cancelled)
    }
}

/// Outcome fields written by the voice interview result webhook.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InterviewResult {
    pub overall_score: Option<i32>,
    pub communication: Option<i32>,
    pub enthusiasm: Option<i32>,
    pub professionalism: Option<i32>,
    pub recommendation: Option<String>,
    pub summary: Option<String>,
    pub analysis: Option<String>,
    pub transcript: Option<String>,
    pub interview_length_seconds: Option<i32>,
    pub availability: Option<String>,
    pub next_action: Option<String>,
}

impl InterviewResult {
    /// Fields present in `other` win; absent ones keep the current value.
    pub fn merge(&mut self, other: InterviewResult) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if other.$field.is_some() { self.$field = other.$field; })*
            };
        }
        take!(
            overall_score,
            communication,
            enthusiasm,
            professionalism,
            recommendation,
            summary,
            analysis,
            transcript,
            interview_length_seconds,
            availability,
            next_action
        );
    }

    pub fn score_category(&self) -> ScoreCategory {
        ScoreCategory::from_score(self.overall_score.unwrap_or(0))
    }
}

/// Lifecycle status as stored. Unknown store values are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CandidateStatus {
    Scheduled,
    Pending,
    Accepted,
    Rejected,
    Cancelled,
    Rescheduled,
    Other(String),
}

impl CandidateStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "scheduled" => CandidateStatus::Scheduled,
            "" | "pending" | "waiting for interview" | "interviewed" => CandidateStatus::Pending,
            "accept" | "accepted" | "hired" => CandidateStatus::Accepted,
            "reject" | "rejected" => CandidateStatus::Rejected,
            "cancelled" | "canceled" => CandidateStatus::Cancelled,
            "rescheduled" => CandidateStatus::Rescheduled,
            _ => CandidateStatus::Other(raw.trim().to_string()),
        }
    }

    pub fn as_store_value(&self) -> &str {
        match self {
            CandidateStatus::Scheduled => "scheduled",
            CandidateStatus::Pending => "pending",
            CandidateStatus::Accepted => "accept",
            CandidateStatus::Rejected => "reject",
            CandidateStatus::Cancelled => "cancelled",
            CandidateStatus::Rescheduled => "rescheduled",
            CandidateStatus::Other(raw) => raw,
        }
    }

    /// Statuses a cancelled booking may still move to. Cancellation is
    /// terminal for scheduling; staff can only record a decision.
    pub fn allowed_after_cancel(&self) -> bool {
        matches!(
            self,
            CandidateStatus::Accepted | CandidateStatus::Rejected | CandidateStatus::Cancelled
        )
    }

    pub fn display(&self) -> DisplayStatus {
        match self {
            CandidateStatus::Accepted => DisplayStatus::Accepted,
            CandidateStatus::Rejected => DisplayStatus::Rejected,
            _ => DisplayStatus::Pending,
        }
    }
}

impl From<String> for CandidateStatus {
    fn from(raw: String) -> Self {
        CandidateStatus::parse(&raw)
    }
}

impl From<CandidateStatus> for String {
    fn from(status: CandidateStatus) -> Self {
        status.as_store_value().to_string()
    }
}

impl std::fmt::Display for CandidateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_store_value())
    }
}

/// The reduced status set the dashboard works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayStatus {
    Pending,
    Accepted,
    Rejected,
}

impl DisplayStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "pending" => Some(DisplayStatus::Pending),
            "accepted" => Some(DisplayStatus::Accepted),
            "rejected" => Some(DisplayStatus::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreCategory {
    High,
    Medium,
    Low,
}

impl ScoreCategory {
    pub fn from_score(score: i32) -> Self {
        if score >= 7 {
            ScoreCategory::High
        } else if score >= 5 {
            ScoreCategory::Medium
        } else {
            ScoreCategory::Low
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "high" => Some(ScoreCategory::High),
            "medium" => Some(ScoreCategory::Medium),
            "low" => Some(ScoreCategory::Low),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewCandidate {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// Partial update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct CandidatePatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub token: Option<String>,
    pub management_token: Option<String>,
    pub appointment_time: Option<DateTime<Utc>>,
    pub status: Option<CandidateStatus>,
    pub interview_completed: Option<bool>,
    pub action: Option<String>,
    pub call_attempts: Option<i32>,
    pub call_started_at: Option<DateTime<Utc>>,
    pub result: Option<InterviewResult>,
}

impl CandidatePatch {
    pub fn apply(self, record: &mut CandidateRecord, now: DateTime<Utc>) {
        if let Some(v) = self.name {
            record.name = v;
        }
        if let Some(v) = self.email {
            record.email = v;
        }
        if let Some(v) = self.phone {
            record.phone = Some(v);
        }
        if let Some(v) = self.token {
            record.token = Some(v);
        }
        if let Some(v) = self.management_token {
            record.management_token = Some(v);
        }
        if let Some(v) = self.appointment_time {
            record.appointment_time = Some(v);
        }
        if let Some(v) = self.status {
            record.status = v;
        }
        if let Some(v) = self.interview_completed {
            record.interview_completed = v;
        }
        if let Some(v) = self.action {
            record.action = Some(v);
        }
        if let Some(v) = self.call_attempts {
            record.call_attempts = v;
        }
        if let Some(v) = self.call_started_at {
            record.call_started_at = Some(v);
        }
        if let Some(v) = self.result {
            record.result.merge(v);
        }
        record.updated_at = now;
    }
}

/// Result of the single-attempt admission commit.
#[derive(Debug, Clone)]
pub enum AdmissionCommit {
    Committed(CandidateRecord),
    AlreadyStarted(CandidateRecord),
    /// The booking was cancelled; nothing was written.
    Cancelled(CandidateRecord),
    NotFound,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_normalises_to_display_set() {
        assert_eq!(CandidateStatus::parse("Accept").display(), DisplayStatus::Accepted);
        assert_eq!(CandidateStatus::parse("hired").display(), DisplayStatus::Accepted);
        assert_eq!(CandidateStatus::parse("reject").display(), DisplayStatus::Rejected);
        assert_eq!(
            CandidateStatus::parse("Waiting for interview").display(),
            DisplayStatus::Pending
        );
        assert_eq!(CandidateStatus::parse("missed").display(), DisplayStatus::Pending);
        assert_eq!(CandidateStatus::parse("").display(), DisplayStatus::Pending);
        assert_eq!(CandidateStatus::parse("cancelled").display(), DisplayStatus::Pending);
    }

    #[test]
    fn unknown_status_keeps_raw_value() {
        let status = CandidateStatus::parse("interview personally");
        assert_eq!(status.as_store_value(), "interview personally");
        assert_eq!(status.display(), DisplayStatus::Pending);
    }

    #[test]
    fn score_categories() {
        assert_eq!(ScoreCategory::from_score(7), ScoreCategory::High);
        assert_eq!(ScoreCategory::from_score(5), ScoreCategory::Medium);
        assert_eq!(ScoreCategory::from_score(4), ScoreCategory::Low);
    }

    #[test]
    fn merge_keeps_existing_fields() {
        let mut current = InterviewResult {
            overall_score: Some(6),
            summary: Some("first".into()),
            ..Default::default()
        };
        current.merge(InterviewResult {
            summary: Some("second".into()),
            ..Default::default()
        });
        assert_eq!(current.overall_score, Some(6));
        assert_eq!(current.summary.as_deref(), Some("second"));
    }
}
