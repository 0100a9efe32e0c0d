pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use crate::config::Config;
use crate::database::store::Stores;
use crate::error::Result;
use crate::services::{
    admission_service::AdmissionService,
    auth_service::AuthService,
    candidate_service::CandidateService,
    email_service::{EmailService, Mailer},
    notification_service::{NotificationService, RetryPolicy},
    scheduling_service::SchedulingService,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub admission_service: AdmissionService,
    pub scheduling_service: SchedulingService,
    pub candidate_service: CandidateService,
    pub auth_service: AuthService,
    pub email_service: EmailService,
    pub notification_service: NotificationService,
}

impl AppState {
    pub fn new(config: Config, stores: Stores, mailer: Arc<dyn Mailer>) -> Result<Self> {
        let retry = RetryPolicy {
            max_attempts: config.email.max_attempts,
            delay: config.email.retry_delay,
        };

        let email_service = EmailService::new(mailer, retry);
        let notification_service = NotificationService::new(
            config.status_webhook_url.clone(),
            config.webhook_secret.clone(),
            retry,
        )?;
        let admission_service = AdmissionService::new(stores.candidates.clone());
        let scheduling_service = SchedulingService::new(
            stores.candidates.clone(),
            email_service.clone(),
            config.scheduling_secret.clone(),
            config.public_base_url.clone(),
        );
        let candidate_service = CandidateService::new(
            stores.candidates.clone(),
            email_service.clone(),
            notification_service.clone(),
        );
        let auth_service = AuthService::new(
            stores.users.clone(),
            email_service.clone(),
            config.jwt_secret.clone(),
            config.jwt_ttl_hours,
            config.public_base_url.clone(),
        );

        Ok(Self {
            config: Arc::new(config),
            admission_service,
            scheduling_service,
            candidate_service,
            auth_service,
            email_service,
            notification_service,
        })
    }
}
