use serde::Deserialize;

use crate::error::{Error, Result};
use crate::models::candidate::InterviewResult;
use crate::services::candidate_service::ResultTarget;

/// Body posted by the voice agent when a call ends.
#[derive(Debug, Clone, Deserialize)]
pub struct InterviewResultWebhook {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default, alias = "candidateId", alias = "record_id")]
    pub candidate_id: Option<String>,
    #[serde(flatten)]
    pub result: InterviewResult,
}

fn non_empty(v: &Option<String>) -> Option<String> {
    v.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl InterviewResultWebhook {
    pub fn target(&self) -> Result<ResultTarget> {
        if let Some(token) = non_empty(&self.token) {
            return Ok(ResultTarget::Token(token));
        }
        if let Some(id) = non_empty(&self.candidate_id) {
            return Ok(ResultTarget::CandidateId(id));
        }
        Err(Error::BadRequest("token or candidate_id is required".into()))
    }

    /// Scores are 0 to 10.
    pub fn check_scores(&self) -> Result<()> {
        let r = &self.result;
        for (name, value) in [
            ("overall_score", r.overall_score),
            ("communication", r.communication),
            ("enthusiasm", r.enthusiasm),
            ("professionalism", r.professionalism),
        ] {
            if let Some(v) = value {
                if !(0..=10).contains(&v) {
                    return Err(Error::BadRequest(format!("{} must be between 0 and 10", name)));
                }
            }
        }
        if r.interview_length_seconds.is_some_and(|s| s < 0) {
            return Err(Error::BadRequest("interview_length_seconds must not be negative".into()));
        }
        Ok(())
    }
}
