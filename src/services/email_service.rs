use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::config::{EmailConfig, EmailProvider};
use crate::error::{Error, Result};
use crate::services::notification_service::RetryPolicy;

const SENDGRID_URL: &str = "https://api.sendgrid.com/v3/mail/send";
const OUTBOX_CAPACITY: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// Sends through the SendGrid v3 HTTP API.
pub struct SendGridMailer {
    client: Client,
    api_key: String,
    from_name: Option<String>,
    from_email: String,
}

impl SendGridMailer {
    pub fn new(api_key: String, from: &str) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(15)).build()?;
        let (from_name, from_email) = parse_mailbox(from);
        Ok(Self {
            client,
            api_key,
            from_name,
            from_email,
        })
    }
}

#[async_trait]
impl Mailer for SendGridMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let mut from = json!({ "email": self.from_email });
        if let Some(name) = &self.from_name {
            from["name"] = json!(name);
        }
        let body = json!({
            "personalizations": [{ "to": [{ "email": message.to }] }],
            "from": from,
            "subject": message.subject,
            "content": [
                { "type": "text/plain", "value": message.text },
                { "type": "text/html", "value": message.html },
            ],
        });
        let resp = self
            .client
            .post(SENDGRID_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            let detail = resp.text().await.unwrap_or_default();
            Err(Error::Internal(format!("SendGrid returned {}: {}", status, detail)))
        }
    }
}

/// Writes messages to the log instead of delivering them and keeps the most
/// recent ones in memory.
#[derive(Clone, Default)]
pub struct LogMailer {
    outbox: Arc<Mutex<VecDeque<EmailMessage>>>,
}

impl LogMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.outbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        tracing::info!(to = %message.to, subject = %message.subject, "email (log mailer)");
        let mut outbox = self.outbox.lock().unwrap_or_else(PoisonError::into_inner);
        if outbox.len() == OUTBOX_CAPACITY {
            outbox.pop_front();
        }
        outbox.push_back(message.clone());
        Ok(())
    }
}

pub fn mailer_from_config(config: &EmailConfig) -> Result<Arc<dyn Mailer>> {
    match &config.provider {
        EmailProvider::SendGrid { api_key } => {
            Ok(Arc::new(SendGridMailer::new(api_key.clone(), &config.from)?))
        }
        EmailProvider::Log => Ok(Arc::new(LogMailer::new())),
    }
}

/// "Name <addr>" or a bare address.
fn parse_mailbox(raw: &str) -> (Option<String>, String) {
    match (raw.find('<'), raw.rfind('>')) {
        (Some(start), Some(end)) if start < end => {
            let name = raw[..start].trim().trim_matches('"').to_string();
            let email = raw[start + 1..end].trim().to_string();
            ((!name.is_empty()).then_some(name), email)
        }
        _ => (None, raw.trim().to_string()),
    }
}

/// Transactional email with a bounded, fixed-delay retry.
#[derive(Clone)]
pub struct EmailService {
    mailer: Arc<dyn Mailer>,
    retry: RetryPolicy,
}

impl EmailService {
    pub fn new(mailer: Arc<dyn Mailer>, retry: RetryPolicy) -> Self {
        Self { mailer, retry }
    }

    pub async fn send_with_retry(&self, message: &EmailMessage) -> Result<()> {
        let mut attempt = 1;
        loop {
            match self.mailer.send(message).await {
                Ok(()) => {
                    tracing::info!(to = %message.to, subject = %message.subject, attempt, "email sent");
                    return Ok(());
                }
                Err(e) if attempt < self.retry.max_attempts => {
                    tracing::warn!(to = %message.to, attempt, error = %e, "email send failed, retrying");
                    tokio::time::sleep(self.retry.delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(to = %message.to, attempt, error = %e, "email send failed, giving up");
                    return Err(e);
                }
            }
        }
    }

    /// Fire-and-forget. Failures are only logged.
    pub fn dispatch(&self, message: EmailMessage) {
        let svc = self.clone();
        tokio::spawn(async move {
            let _ = svc.send_with_retry(&message).await;
        });
    }
}

pub mod templates {
    use super::EmailMessage;
    use crate::utils::time::to_display;
    use chrono::{DateTime, Utc};

    const BRAND: &str = "Bloom Buddies";

    pub fn escape_html(raw: &str) -> String {
        let mut out = String::with_capacity(raw.len());
        for c in raw.chars() {
            match c {
                '&' => out.push_str("&amp;"),
                '<' => out.push_str("&lt;"),
                '>' => out.push_str("&gt;"),
                '"' => out.push_str("&quot;"),
                '\'' => out.push_str("&#39;"),
                _ => out.push(c),
            }
        }
        out
    }

    fn layout(title: &str, accent: &str, body: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html>
<head><meta charset="UTF-8"><meta name="viewport" content="width=device-width, initial-scale=1.0"></head>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Arial, sans-serif; line-height: 1.6; color: #333; background-color: #f4f4f4; margin: 0; padding: 0;">
  <div style="max-width: 600px; margin: 40px auto; background: white; border-radius: 8px; overflow: hidden;">
    <div style="background: {accent}; color: white; padding: 30px; text-align: center;">
      <h1 style="margin: 0; font-size: 24px;">{title}</h1>
    </div>
    <div style="padding: 40px 30px;">
{body}
      <p>Best regards,<br>{brand} Team</p>
    </div>
    <div style="background: #f9f9f9; padding: 20px 30px; text-align: center; font-size: 12px; color: #666; border-top: 1px solid #eee;">
      <p>This is an automated message from {brand}</p>
    </div>
  </div>
</body>
</html>"#,
            accent = accent,
            title = escape_html(title),
            body = body,
            brand = BRAND,
        )
    }

    fn button(href: &str, label: &str) -> String {
        format!(
            r#"      <p style="text-align: center;"><a href="{href}" style="display: inline-block; padding: 14px 32px; background: #667eea; color: white; text-decoration: none; border-radius: 6px; font-weight: 600;">{label}</a></p>
      <p style="font-family: monospace; font-size: 13px; word-break: break-all;">{href}</p>"#,
            href = escape_html(href),
            label = escape_html(label),
        )
    }

    pub fn scheduling_invitation(to: &str, name: &str, link: &str) -> EmailMessage {
        let body = format!(
            "      <p>Hi {},</p>\n      <p>Thanks for your interest in joining {}. Please pick a time for your phone interview:</p>\n{}",
            escape_html(name),
            BRAND,
            button(link, "Schedule your interview"),
        );
        EmailMessage {
            to: to.to_string(),
            subject: format!("Schedule your {} interview", BRAND),
            html: layout("Schedule your interview", "#667eea", &body),
            text: format!(
                "Hi {},\n\nThanks for your interest in joining {}. Please pick a time for your phone interview:\n{}\n\nBest regards,\n{} Team",
                name, BRAND, link, BRAND
            ),
        }
    }

    pub fn interview_confirmation(
        to: &str,
        name: &str,
        appointment: DateTime<Utc>,
        interview_link: &str,
        manage_link: &str,
        rescheduled: bool,
    ) -> EmailMessage {
        let when = to_display(appointment);
        let (title, subject) = if rescheduled {
            ("Interview rescheduled", format!("Your {} interview has been rescheduled", BRAND))
        } else {
            ("Interview confirmed", format!("Your {} interview is confirmed", BRAND))
        };
        let body = format!(
            "      <p>Hi {name},</p>\n      <p>Your phone interview is scheduled for <strong>{when}</strong>.</p>\n      <p>The interview link opens 5 minutes before your appointment and stays open for 30 minutes after it. It can only be used once.</p>\n{join}\n      <p>Need a different time? <a href=\"{manage}\">Reschedule or cancel</a>.</p>",
            name = escape_html(name),
            when = escape_html(&when),
            join = button(interview_link, "Join your interview"),
            manage = escape_html(manage_link),
        );
        EmailMessage {
            to: to.to_string(),
            subject,
            html: layout(title, "linear-gradient(135deg, #667eea 0%, #764ba2 100%)", &body),
            text: format!(
                "Hi {name},\n\nYour phone interview is scheduled for {when}.\nThe interview link opens 5 minutes before your appointment and stays open for 30 minutes after it. It can only be used once.\n\nJoin: {join}\nReschedule or cancel: {manage}\n\nBest regards,\n{brand} Team",
                name = name,
                when = when,
                join = interview_link,
                manage = manage_link,
                brand = BRAND,
            ),
        }
    }

    pub fn interview_cancelled(to: &str, name: &str) -> EmailMessage {
        let body = format!(
            "      <p>Hi {},</p>\n      <p>Your phone interview has been cancelled. If this was a mistake, please contact us.</p>",
            escape_html(name)
        );
        EmailMessage {
            to: to.to_string(),
            subject: format!("Your {} interview has been cancelled", BRAND),
            html: layout("Interview cancelled", "#ef4444", &body),
            text: format!(
                "Hi {},\n\nYour phone interview has been cancelled. If this was a mistake, please contact us.\n\nBest regards,\n{} Team",
                name, BRAND
            ),
        }
    }

    pub fn decision(to: &str, name: &str, accepted: bool) -> EmailMessage {
        let (title, accent, line) = if accepted {
            (
                "Good news!",
                "#10b981",
                "We enjoyed speaking with you and would like to move forward. We will be in touch shortly with next steps.",
            )
        } else {
            (
                "Thank you for interviewing",
                "#6b7280",
                "Thank you for taking the time to interview with us. After careful consideration we have decided not to move forward at this time.",
            )
        };
        let body = format!(
            "      <p>Hi {},</p>\n      <p>{}</p>",
            escape_html(name),
            line
        );
        EmailMessage {
            to: to.to_string(),
            subject: format!("Your {} application", BRAND),
            html: layout(title, accent, &body),
            text: format!("Hi {},\n\n{}\n\nBest regards,\n{} Team", name, line, BRAND),
        }
    }

    pub fn password_reset(to: &str, name: &str, link: &str) -> EmailMessage {
        let body = format!(
            "      <p>Hi {},</p>\n      <p>We received a request to reset your password for the {} Dashboard.</p>\n{}\n      <p><strong>Important:</strong> This link will expire in 1 hour.</p>\n      <p>If you didn't request a password reset, you can safely ignore this email.</p>",
            escape_html(name),
            BRAND,
            button(link, "Reset Password"),
        );
        EmailMessage {
            to: to.to_string(),
            subject: format!("Password Reset Request - {} Dashboard", BRAND),
            html: layout("Password Reset Request", "linear-gradient(135deg, #667eea 0%, #764ba2 100%)", &body),
            text: format!(
                "Hi {},\n\nWe received a request to reset your password for the {} Dashboard.\n\nTo reset your password, visit this link:\n{}\n\nThis link will expire in 1 hour.\n\nIf you didn't request a password reset, you can safely ignore this email.\n\nBest regards,\n{} Team",
                name, BRAND, link, BRAND
            ),
        }
    }

    pub fn password_changed(to: &str, name: &str) -> EmailMessage {
        let body = format!(
            "      <p>Hi {},</p>\n      <p>Your password for the {} Dashboard has been successfully changed.</p>\n      <p><strong>If you did not change your password,</strong> please contact your administrator immediately.</p>",
            escape_html(name),
            BRAND
        );
        EmailMessage {
            to: to.to_string(),
            subject: format!("Password Successfully Changed - {} Dashboard", BRAND),
            html: layout("Password Changed Successfully", "linear-gradient(135deg, #10b981 0%, #059669 100%)", &body),
            text: format!(
                "Hi {},\n\nYour password for the {} Dashboard has been successfully changed.\n\nIf you did not change your password, please contact your administrator immediately.\n\nBest regards,\n{} Team",
                name, BRAND, BRAND
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> EmailMessage {
        templates::password_changed("a@example.com", "A")
    }

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn retries_until_success() {
        let mut mock = MockMailer::new();
        let mut calls = 0;
        mock.expect_send().times(3).returning(move |_| {
            calls += 1;
            if calls < 3 {
                Err(Error::Internal("smtp down".into()))
            } else {
                Ok(())
            }
        });
        let svc = EmailService::new(Arc::new(mock), policy(3));
        assert!(svc.send_with_retry(&message()).await.is_ok());
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let mut mock = MockMailer::new();
        mock.expect_send()
            .times(2)
            .returning(|_| Err(Error::Internal("smtp down".into())));
        let svc = EmailService::new(Arc::new(mock), policy(2));
        assert!(svc.send_with_retry(&message()).await.is_err());
    }

    #[tokio::test]
    async fn log_mailer_keeps_outbox() {
        let mailer = LogMailer::new();
        mailer.send(&message()).await.unwrap();
        assert_eq!(mailer.sent().len(), 1);
        assert_eq!(mailer.sent()[0].to, "a@example.com");
    }

    #[test]
    fn mailbox_parsing() {
        assert_eq!(
            parse_mailbox("Bloom Buddies <no-reply@bloom.test>"),
            (Some("Bloom Buddies".to_string()), "no-reply@bloom.test".to_string())
        );
        assert_eq!(parse_mailbox("x@y.z"), (None, "x@y.z".to_string()));
    }

    #[test]
    fn templates_escape_user_input() {
        let msg = templates::decision("a@example.com", "<script>", true);
        assert!(msg.html.contains("&lt;script&gt;"));
        assert!(!msg.html.contains("<script>"));
        assert!(msg.text.contains("<script>"));
    }
}
