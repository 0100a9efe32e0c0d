use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::database::store::CandidateStore;
use crate::error::Result;
use crate::models::candidate::{AdmissionCommit, CandidateRecord, CandidateStatus};
use crate::services::window::{check_window, WindowResult};

/// Outcome of an admission check. Denials are ordinary results, not errors.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision<T> {
    Granted(T),
    Denied(Denial),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Denial {
    NotFound,
    NotScheduled,
    Cancelled,
    AlreadyUsed,
    AlreadyStarted,
    OutOfWindow {
        window: WindowResult,
        appointment: DateTime<Utc>,
    },
}

impl Denial {
    pub fn message(&self) -> String {
        match self {
            Denial::NotFound => "Invalid interview token".to_string(),
            Denial::NotScheduled => "No interview is scheduled for this link".to_string(),
            Denial::Cancelled => "This interview has been cancelled".to_string(),
            Denial::AlreadyUsed => "This interview link has already been used".to_string(),
            Denial::AlreadyStarted => "Interview has already been started".to_string(),
            Denial::OutOfWindow { window, .. } => window.message(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateSummary {
    pub id: String,
    pub name: String,
    pub email: String,
    pub appointment_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Admission {
    pub candidate: CandidateSummary,
    pub window: WindowResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterviewStatus {
    pub completed: bool,
    pub status: CandidateStatus,
    pub action: Option<String>,
}

#[derive(Clone)]
pub struct AdmissionService {
    candidates: Arc<dyn CandidateStore>,
}

impl AdmissionService {
    pub fn new(candidates: Arc<dyn CandidateStore>) -> Self {
        Self { candidates }
    }

    pub async fn validate_access(&self, token: &str) -> Result<Decision<Admission>> {
        self.validate_access_at(token, Utc::now()).await
    }

    /// Read-only. The record is never mutated here.
    pub async fn validate_access_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Decision<Admission>> {
        let Some(record) = self.candidates.find_by_token(token).await? else {
            tracing::info!("admission denied: unknown token");
            return Ok(Decision::Denied(Denial::NotFound));
        };

        if record.interview_started() {
            tracing::info!(candidate_id = %record.id, "admission denied: token already used");
            return Ok(Decision::Denied(Denial::AlreadyUsed));
        }

        Ok(Self::judge_window(&record, now))
    }

    /// Marks the interview as entered. At most one caller per token succeeds.
    pub async fn consume_access(&self, token: &str) -> Result<Decision<i32>> {
        self.consume_access_at(token, Utc::now()).await
    }

    pub async fn consume_access_at(&self, token: &str, now: DateTime<Utc>) -> Result<Decision<i32>> {
        match self.candidates.commit_admission(token, now).await? {
            AdmissionCommit::Committed(record) => {
                tracing::info!(
                    candidate_id = %record.id,
                    call_attempts = record.call_attempts,
                    "interview started"
                );
                Ok(Decision::Granted(record.call_attempts))
            }
            AdmissionCommit::AlreadyStarted(record) => {
                tracing::warn!(
                    candidate_id = %record.id,
                    call_attempts = record.call_attempts,
                    "duplicate interview start rejected"
                );
                Ok(Decision::Denied(Denial::AlreadyStarted))
            }
            AdmissionCommit::Cancelled(record) => {
                tracing::info!(candidate_id = %record.id, "admission denied: booking cancelled");
                Ok(Decision::Denied(Denial::Cancelled))
            }
            AdmissionCommit::NotFound => Ok(Decision::Denied(Denial::NotFound)),
        }
    }

    pub async fn interview_status(&self, token: &str) -> Result<Option<InterviewStatus>> {
        Ok(self
            .candidates
            .find_by_token(token)
            .await?
            .map(|record| InterviewStatus {
                completed: record.interview_started(),
                status: record.status,
                action: record.action,
            }))
    }

    /// Whether the window for `token` is open right now, whether or not the
    /// interview has already been entered.
    pub async fn window_open(&self, token: &str, now: DateTime<Utc>) -> Result<Decision<Admission>> {
        match self.candidates.find_by_token(token).await? {
            Some(record) => Ok(Self::judge_window(&record, now)),
            None => Ok(Decision::Denied(Denial::NotFound)),
        }
    }

    fn judge_window(record: &CandidateRecord, now: DateTime<Utc>) -> Decision<Admission> {
        if record.is_cancelled() {
            return Decision::Denied(Denial::Cancelled);
        }
        let Some(appointment) = record.appointment_time else {
            return Decision::Denied(Denial::NotScheduled);
        };

        let window = check_window(now, appointment);
        if !window.is_valid() {
            tracing::info!(candidate_id = %record.id, window = ?window, "admission denied: outside window");
            return Decision::Denied(Denial::OutOfWindow {
                window,
                appointment,
            });
        }

        Decision::Granted(Admission {
            candidate: CandidateSummary {
                id: record.id.clone(),
                name: record.name.clone(),
                email: record.email.clone(),
                appointment_time: appointment,
            },
            window,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryCandidateStore;
    use chrono::Duration;

    fn service_with(record: CandidateRecord) -> AdmissionService {
        let store = MemoryCandidateStore::new();
        store.insert(record);
        AdmissionService::new(Arc::new(store))
    }

    fn scheduled(token: &str, appointment: DateTime<Utc>) -> CandidateRecord {
        let mut rec = CandidateRecord::new("rec1", "Ada", "ada@example.com");
        rec.token = Some(token.to_string());
        rec.appointment_time = Some(appointment);
        rec.status = CandidateStatus::Scheduled;
        rec
    }

    #[tokio::test]
    async fn grants_inside_window() {
        let appt = Utc::now();
        let svc = service_with(scheduled("tok", appt));
        let decision = svc
            .validate_access_at("tok", appt - Duration::minutes(4))
            .await
            .unwrap();
        match decision {
            Decision::Granted(a) => {
                assert_eq!(a.candidate.id, "rec1");
                assert_eq!(a.window, WindowResult::Valid { minutes_into_window: 1 });
            }
            other => panic!("expected grant, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn used_token_is_denied_even_inside_window() {
        let appt = Utc::now();
        let mut rec = scheduled("tok", appt);
        rec.action = Some("interviewed".into());
        let svc = service_with(rec);
        assert_eq!(
            svc.validate_access_at("tok", appt).await.unwrap(),
            Decision::Denied(Denial::AlreadyUsed)
        );
    }

    #[tokio::test]
    async fn unknown_unscheduled_and_cancelled() {
        let mut rec = CandidateRecord::new("rec1", "Ada", "ada@example.com");
        rec.token = Some("tok".into());
        let svc = service_with(rec);
        let now = Utc::now();
        assert_eq!(
            svc.validate_access_at("nope", now).await.unwrap(),
            Decision::Denied(Denial::NotFound)
        );
        assert_eq!(
            svc.validate_access_at("tok", now).await.unwrap(),
            Decision::Denied(Denial::NotScheduled)
        );

        let mut rec = scheduled("tok", now);
        rec.status = CandidateStatus::Cancelled;
        let svc = service_with(rec);
        assert_eq!(
            svc.validate_access_at("tok", now).await.unwrap(),
            Decision::Denied(Denial::Cancelled)
        );
    }

    #[tokio::test]
    async fn out_of_window_carries_the_window() {
        let appt = Utc::now();
        let svc = service_with(scheduled("tok", appt));
        match svc
            .validate_access_at("tok", appt + Duration::minutes(31))
            .await
            .unwrap()
        {
            Decision::Denied(Denial::OutOfWindow { window, appointment }) => {
                assert_eq!(window, WindowResult::TooLate { minutes_late: 1 });
                assert_eq!(appointment, appt);
            }
            other => panic!("expected out of window, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn validate_does_not_mutate() {
        let appt = Utc::now();
        let store = Arc::new(MemoryCandidateStore::new());
        store.insert(scheduled("tok", appt));
        let svc = AdmissionService::new(store.clone());
        for _ in 0..3 {
            svc.validate_access_at("tok", appt).await.unwrap();
        }
        let rec = store.find_by_token("tok").await.unwrap().unwrap();
        assert_eq!(rec.call_attempts, 0);
        assert!(!rec.interview_completed);
    }

    #[tokio::test]
    async fn consume_then_validate_and_status() {
        let appt = Utc::now();
        let svc = service_with(scheduled("tok", appt));

        assert_eq!(svc.consume_access("tok").await.unwrap(), Decision::Granted(1));
        assert_eq!(
            svc.consume_access("tok").await.unwrap(),
            Decision::Denied(Denial::AlreadyStarted)
        );
        assert_eq!(
            svc.validate_access_at("tok", appt).await.unwrap(),
            Decision::Denied(Denial::AlreadyUsed)
        );

        let status = svc.interview_status("tok").await.unwrap().unwrap();
        assert!(status.completed);
        assert_eq!(status.status, CandidateStatus::Pending);
        assert_eq!(status.action.as_deref(), Some("interviewed"));
        assert!(svc.interview_status("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cancelled_booking_cannot_be_consumed() {
        let appt = Utc::now();
        let store = Arc::new(MemoryCandidateStore::new());
        let mut rec = scheduled("tok", appt);
        rec.status = CandidateStatus::Cancelled;
        store.insert(rec);
        let svc = AdmissionService::new(store.clone());

        assert_eq!(
            svc.consume_access_at("tok", appt).await.unwrap(),
            Decision::Denied(Denial::Cancelled)
        );
        let rec = store.find_by_token("tok").await.unwrap().unwrap();
        assert_eq!(rec.status, CandidateStatus::Cancelled);
        assert_eq!(rec.call_attempts, 0);
        assert!(!rec.interview_completed);
        assert!(rec.action.is_none());
    }

    #[tokio::test]
    async fn concurrent_consume_grants_once() {
        let svc = service_with(scheduled("tok", Utc::now()));
        let mut handles = Vec::new();
        for _ in 0..16 {
            let svc = svc.clone();
            handles.push(tokio::spawn(async move { svc.consume_access("tok").await.unwrap() }));
        }
        let mut granted = 0;
        for h in handles {
            if let Decision::Granted(n) = h.await.unwrap() {
                assert_eq!(n, 1);
                granted += 1;
            }
        }
        assert_eq!(granted, 1);
    }
}
