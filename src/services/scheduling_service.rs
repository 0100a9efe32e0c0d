use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::database::store::CandidateStore;
use crate::error::{Error, Result};
use crate::models::candidate::{CandidatePatch, CandidateRecord, CandidateStatus};
use crate::services::email_service::{templates, EmailService};
use crate::utils::links::page_link;
use crate::utils::signing::{scheduling_signature, verify_scheduling_signature};
use crate::utils::token::{generate_access_token, ACCESS_TOKEN_LEN, MANAGEMENT_TOKEN_LEN};

/// Furthest ahead a candidate may book.
pub const MAX_BOOKING_AHEAD_DAYS: i64 = 60;

/// Candidate self-service: booking from a signed link, then rescheduling or
/// cancelling with the management token.
#[derive(Clone)]
pub struct SchedulingService {
    candidates: Arc<dyn CandidateStore>,
    email: EmailService,
    secret: String,
    base_url: String,
}

impl SchedulingService {
    pub fn new(
        candidates: Arc<dyn CandidateStore>,
        email: EmailService,
        secret: String,
        base_url: String,
    ) -> Self {
        Self {
            candidates,
            email,
            secret,
            base_url,
        }
    }

    pub fn scheduling_link(&self, record: &CandidateRecord) -> Result<String> {
        let signature = scheduling_signature(&self.secret, &record.id, &record.email)
            .ok_or_else(|| Error::Internal("Failed to sign scheduling link".into()))?;
        page_link(
            &self.base_url,
            "schedule-interview.html",
            &[("id", record.id.as_str()), ("token", signature.as_str())],
        )
    }

    pub fn interview_link(&self, token: &str) -> Result<String> {
        page_link(&self.base_url, "interview.html", &[("token", token)])
    }

    pub fn manage_link(&self, management_token: &str) -> Result<String> {
        page_link(&self.base_url, "manage-interview.html", &[("token", management_token)])
    }

    /// Emails the signed scheduling link to the candidate.
    pub fn send_invitation(&self, record: &CandidateRecord) -> Result<()> {
        let link = self.scheduling_link(record)?;
        self.email
            .dispatch(templates::scheduling_invitation(&record.email, &record.name, &link));
        Ok(())
    }

    pub async fn schedule(
        &self,
        candidate_id: &str,
        signature: &str,
        appointment: DateTime<Utc>,
    ) -> Result<CandidateRecord> {
        self.schedule_at(candidate_id, signature, appointment, Utc::now())
            .await
    }

    pub async fn schedule_at(
        &self,
        candidate_id: &str,
        signature: &str,
        appointment: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<CandidateRecord> {
        let record = self
            .candidates
            .get(candidate_id)
            .await?
            .ok_or_else(|| Error::NotFound("Candidate not found".into()))?;

        if !verify_scheduling_signature(&self.secret, &record.id, &record.email, signature) {
            tracing::warn!(candidate_id = %record.id, "scheduling link signature mismatch");
            return Err(Error::Forbidden("Invalid scheduling link".into()));
        }
        ensure_bookable(&record)?;
        check_appointment(appointment, now)?;

        let rescheduled = record.appointment_time.is_some();
        let patch = CandidatePatch {
            token: record
                .token
                .is_none()
                .then(|| generate_access_token(ACCESS_TOKEN_LEN)),
            management_token: record
                .management_token
                .is_none()
                .then(|| generate_access_token(MANAGEMENT_TOKEN_LEN)),
            appointment_time: Some(appointment),
            status: Some(if rescheduled {
                CandidateStatus::Rescheduled
            } else {
                CandidateStatus::Scheduled
            }),
            ..Default::default()
        };
        let updated = self.candidates.update(&record.id, patch).await?;
        tracing::info!(candidate_id = %updated.id, appointment = %appointment, "interview scheduled");

        self.send_confirmation(&updated, rescheduled)?;
        Ok(updated)
    }

    pub async fn booking(&self, management_token: &str) -> Result<CandidateRecord> {
        self.candidates
            .find_by_management_token(management_token)
            .await?
            .ok_or_else(|| Error::NotFound("Booking not found".into()))
    }

    pub async fn reschedule(
        &self,
        management_token: &str,
        appointment: DateTime<Utc>,
    ) -> Result<CandidateRecord> {
        self.reschedule_at(management_token, appointment, Utc::now())
            .await
    }

    pub async fn reschedule_at(
        &self,
        management_token: &str,
        appointment: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<CandidateRecord> {
        let record = self.booking(management_token).await?;
        ensure_bookable(&record)?;
        check_appointment(appointment, now)?;

        let updated = self
            .candidates
            .update(
                &record.id,
                CandidatePatch {
                    appointment_time: Some(appointment),
                    status: Some(CandidateStatus::Rescheduled),
                    ..Default::default()
                },
            )
            .await?;
        tracing::info!(candidate_id = %updated.id, appointment = %appointment, "interview rescheduled");

        self.send_confirmation(&updated, true)?;
        Ok(updated)
    }

    pub async fn cancel(&self, management_token: &str) -> Result<CandidateRecord> {
        let record = self.booking(management_token).await?;
        if record.interview_started() {
            return Err(Error::Conflict("Interview has already taken place".into()));
        }
        if record.is_cancelled() {
            return Err(Error::Conflict("Interview is already cancelled".into()));
        }

        let updated = self
            .candidates
            .update(
                &record.id,
                CandidatePatch {
                    status: Some(CandidateStatus::Cancelled),
                    ..Default::default()
                },
            )
            .await?;
        tracing::info!(candidate_id = %updated.id, "interview cancelled");

        self.email
            .dispatch(templates::interview_cancelled(&updated.email, &updated.name));
        Ok(updated)
    }

    fn send_confirmation(&self, record: &CandidateRecord, rescheduled: bool) -> Result<()> {
        let (Some(token), Some(management_token), Some(appointment)) = (
            record.token.as_deref(),
            record.management_token.as_deref(),
            record.appointment_time,
        ) else {
            return Err(Error::Internal(format!(
                "booking {} saved without tokens or time",
                record.id
            )));
        };
        let interview_link = self.interview_link(token)?;
        let manage_link = self.manage_link(management_token)?;
        self.email.dispatch(templates::interview_confirmation(
            &record.email,
            &record.name,
            appointment,
            &interview_link,
            &manage_link,
            rescheduled,
        ));
        Ok(())
    }
}

fn ensure_bookable(record: &CandidateRecord) -> Result<()> {
    if record.is_cancelled() {
        return Err(Error::Conflict("This interview has been cancelled".into()));
    }
    if record.interview_started() {
        return Err(Error::Conflict("Interview has already taken place".into()));
    }
    Ok(())
}

fn check_appointment(appointment: DateTime<Utc>, now: DateTime<Utc>) -> Result<()> {
    if appointment <= now {
        return Err(Error::BadRequest(
            "Appointment time must be in the future".into(),
        ));
    }
    if appointment > now + Duration::days(MAX_BOOKING_AHEAD_DAYS) {
        return Err(Error::BadRequest(format!(
            "Appointment time must be within the next {} days",
            MAX_BOOKING_AHEAD_DAYS
        )));
    }
    Ok(())
}
