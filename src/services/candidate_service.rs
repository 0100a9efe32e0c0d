use std::cmp::Ordering;
use std::sync::Arc;

use serde::Serialize;

use crate::database::store::CandidateStore;
use crate::error::{Error, Result};
use crate::models::candidate::{
    CandidatePatch, CandidateRecord, CandidateStatus, DisplayStatus, InterviewResult,
    NewCandidate, ScoreCategory,
};
use crate::services::email_service::{templates, EmailService};
use crate::services::notification_service::NotificationService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    AppointmentTime,
    Name,
    Score,
    CreatedAt,
}

impl SortField {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "appointment_time" | "appointmenttime" | "interview_time" | "date" => {
                Some(SortField::AppointmentTime)
            }
            "name" => Some(SortField::Name),
            "score" | "overall_score" => Some(SortField::Score),
            "created_at" | "createdat" => Some(SortField::CreatedAt),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CandidateFilter {
    pub status: Option<DisplayStatus>,
    pub score: Option<ScoreCategory>,
    pub search: Option<String>,
    pub sort: SortField,
    pub order: SortOrder,
}

impl CandidateFilter {
    fn matches(&self, record: &CandidateRecord) -> bool {
        if let Some(status) = self.status {
            if record.display_status() != status {
                return false;
            }
        }
        if let Some(score) = self.score {
            if record.result.score_category() != score {
                return false;
            }
        }
        if let Some(needle) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let needle = needle.to_lowercase();
            let hit = record.name.to_lowercase().contains(&needle)
                || record.email.to_lowercase().contains(&needle)
                || record
                    .result
                    .recommendation
                    .as_deref()
                    .is_some_and(|r| r.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        true
    }

    fn compare(&self, a: &CandidateRecord, b: &CandidateRecord) -> Ordering {
        let ord = match self.sort {
            SortField::AppointmentTime => a.appointment_time.cmp(&b.appointment_time),
            SortField::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortField::Score => a.result.overall_score.cmp(&b.result.overall_score),
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        };
        match self.order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateStats {
    pub total: usize,
    pub pending: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub average_score: f64,
}

impl CandidateStats {
    pub fn from_records(records: &[CandidateRecord]) -> Self {
        let mut stats = CandidateStats {
            total: records.len(),
            pending: 0,
            accepted: 0,
            rejected: 0,
            average_score: 0.0,
        };
        let mut score_sum = 0i64;
        let mut scored = 0i64;
        for record in records {
            match record.display_status() {
                DisplayStatus::Pending => stats.pending += 1,
                DisplayStatus::Accepted => stats.accepted += 1,
                DisplayStatus::Rejected => stats.rejected += 1,
            }
            if let Some(score) = record.result.overall_score {
                score_sum += i64::from(score);
                scored += 1;
            }
        }
        if scored > 0 {
            let avg = score_sum as f64 / scored as f64;
            stats.average_score = (avg * 10.0).round() / 10.0;
        }
        stats
    }
}

/// Staff edits. `status` accepts display values (`accepted`) as well as
/// store actions (`accept`).
#[derive(Debug, Clone, Default)]
pub struct CandidateUpdate {
    pub status: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Locates the record a result belongs to. The token wins when both are given.
#[derive(Debug, Clone)]
pub enum ResultTarget {
    Token(String),
    CandidateId(String),
}

#[derive(Clone)]
pub struct CandidateService {
    candidates: Arc<dyn CandidateStore>,
    email: EmailService,
    notifications: NotificationService,
}

impl CandidateService {
    pub fn new(
        candidates: Arc<dyn CandidateStore>,
        email: EmailService,
        notifications: NotificationService,
    ) -> Self {
        Self {
            candidates,
            email,
            notifications,
        }
    }

    pub async fn list(&self, filter: &CandidateFilter) -> Result<Vec<CandidateRecord>> {
        let mut records: Vec<CandidateRecord> = self
            .candidates
            .list()
            .await?
            .into_iter()
            .filter(|r| filter.matches(r))
            .collect();
        records.sort_by(|a, b| filter.compare(a, b));
        Ok(records)
    }

    pub async fn stats(&self) -> Result<CandidateStats> {
        let records = self.candidates.list().await?;
        Ok(CandidateStats::from_records(&records))
    }

    pub async fn get(&self, id: &str) -> Result<CandidateRecord> {
        self.candidates
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound("Candidate not found".into()))
    }

    pub async fn create(&self, candidate: NewCandidate) -> Result<CandidateRecord> {
        let created = self.candidates.create(candidate).await?;
        tracing::info!(candidate_id = %created.id, "candidate created");
        Ok(created)
    }

    /// Accept and reject fire the status webhook and a decision email. Neither
    /// can fail the update.
    pub async fn update(&self, id: &str, update: CandidateUpdate) -> Result<CandidateRecord> {
        let status = update.status.as_deref().map(CandidateStatus::parse);
        if let Some(next) = status.as_ref().filter(|s| !s.allowed_after_cancel()) {
            let current = self
                .candidates
                .get(id)
                .await?
                .ok_or_else(|| Error::NotFound("Candidate not found".into()))?;
            if current.is_cancelled() {
                tracing::warn!(
                    candidate_id = %id,
                    requested = next.as_store_value(),
                    "status change on cancelled booking refused"
                );
                return Err(Error::Conflict(
                    "This interview has been cancelled; only a decision can be recorded".into(),
                ));
            }
        }
        let patch = CandidatePatch {
            name: update.name,
            email: update.email,
            phone: update.phone,
            status: status.clone(),
            ..Default::default()
        };
        let updated = self.candidates.update(id, patch).await?;

        match status {
            Some(CandidateStatus::Accepted) => self.announce_decision(&updated, true),
            Some(CandidateStatus::Rejected) => self.announce_decision(&updated, false),
            _ => {}
        }
        Ok(updated)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        if !self.candidates.delete(id).await? {
            return Err(Error::NotFound("Candidate not found".into()));
        }
        tracing::info!(candidate_id = %id, "candidate deleted");
        Ok(())
    }

    /// Stores the voice interview outcome and marks the interview completed.
    pub async fn record_result(
        &self,
        target: ResultTarget,
        result: InterviewResult,
    ) -> Result<CandidateRecord> {
        let record = match &target {
            ResultTarget::Token(token) => self.candidates.find_by_token(token).await?,
            ResultTarget::CandidateId(id) => self.candidates.get(id).await?,
        }
        .ok_or_else(|| Error::NotFound("Candidate not found".into()))?;

        let updated = self
            .candidates
            .update(
                &record.id,
                CandidatePatch {
                    interview_completed: Some(true),
                    result: Some(result),
                    ..Default::default()
                },
            )
            .await?;
        tracing::info!(
            candidate_id = %updated.id,
            score = ?updated.result.overall_score,
            "interview result recorded"
        );
        Ok(updated)
    }

    fn announce_decision(&self, record: &CandidateRecord, accepted: bool) {
        let action = record.status.as_store_value();
        self.notifications.notify_status(action, record);
        self.email
            .dispatch(templates::decision(&record.email, &record.name, accepted));
    }
}
