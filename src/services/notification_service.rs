use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use serde_json::{json, Value as JsonValue};

use crate::error::{Error, Result};
use crate::models::candidate::CandidateRecord;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

/// Posts candidate decisions to the configured status webhook.
#[derive(Clone)]
pub struct NotificationService {
    client: Client,
    target_url: Option<String>,
    secret: String,
    retry: RetryPolicy,
}

impl NotificationService {
    pub fn new(target_url: Option<String>, secret: String, retry: RetryPolicy) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(Self {
            client,
            target_url,
            secret,
            retry,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.target_url.is_some()
    }

    pub fn status_payload(action: &str, candidate: &CandidateRecord) -> JsonValue {
        json!({
            "action": action,
            "timestamp": Utc::now().to_rfc3339(),
            "candidate": {
                "id": candidate.id,
                "fields": {
                    "name": candidate.name,
                    "email": candidate.email,
                    "phone": candidate.phone,
                    "status": candidate.status.as_store_value(),
                    "appointment_time": candidate.appointment_time.map(|t| t.to_rfc3339()),
                    "overall_score": candidate.result.overall_score,
                    "recommendation": candidate.result.recommendation,
                    "summary": candidate.result.summary,
                },
            },
        })
    }

    pub async fn deliver(&self, payload: &JsonValue) -> Result<()> {
        let Some(url) = &self.target_url else {
            return Ok(());
        };

        let mut attempt = 1;
        loop {
            let res = self
                .client
                .post(url)
                .header("X-Webhook-Secret", &self.secret)
                .json(payload)
                .send()
                .await;
            let err = match res {
                Ok(resp) if resp.status().is_success() => {
                    tracing::info!(attempt, "status webhook delivered");
                    return Ok(());
                }
                Ok(resp) => Error::Internal(format!("status webhook returned {}", resp.status())),
                Err(e) => Error::Reqwest(e),
            };
            if attempt >= self.retry.max_attempts {
                tracing::error!(attempt, error = %err, "status webhook failed, giving up");
                return Err(err);
            }
            tracing::warn!(attempt, error = %err, "status webhook failed, retrying");
            tokio::time::sleep(self.retry.delay).await;
            attempt += 1;
        }
    }

    /// Fire-and-forget. The caller's response never waits on the webhook.
    pub fn notify_status(&self, action: &str, candidate: &CandidateRecord) {
        if !self.is_enabled() {
            tracing::debug!(candidate_id = %candidate.id, "status webhook not configured, skipping");
            return;
        }
        let payload = Self::status_payload(action, candidate);
        let svc = self.clone();
        tokio::spawn(async move {
            let _ = svc.deliver(&payload).await;
        });
    }
}
