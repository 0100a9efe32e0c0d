#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use bloom_backend::{
    config::{Config, EmailConfig, EmailProvider, StoreConfig, VapiConfig},
    database::{
        memory::{MemoryCandidateStore, MemoryUserStore},
        store::Stores,
    },
    models::user::UserRole,
    routes,
    services::email_service::{EmailMessage, LogMailer},
    AppState,
};
use serde_json::Value as JsonValue;
use tower::ServiceExt;

pub const WEBHOOK_SECRET: &str = "whsec_test";
pub const SCHEDULING_SECRET: &str = "sched_test";
pub const BASE_URL: &str = "https://bloom.test";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub candidates: MemoryCandidateStore,
    pub users: MemoryUserStore,
    pub mailer: LogMailer,
}

pub fn test_config() -> Config {
    Config {
        server_address: "127.0.0.1:0".into(),
        jwt_secret: "test_secret_key".into(),
        jwt_ttl_hours: 8,
        webhook_secret: WEBHOOK_SECRET.into(),
        scheduling_secret: SCHEDULING_SECRET.into(),
        public_base_url: BASE_URL.into(),
        cors_origin: None,
        public_rps: 1000,
        staff_rps: 1000,
        store: StoreConfig::Memory,
        email: EmailConfig {
            provider: EmailProvider::Log,
            from: "Bloom Buddies <no-reply@bloom.test>".into(),
            max_attempts: 1,
            retry_delay: Duration::from_millis(1),
        },
        status_webhook_url: None,
        vapi: Some(VapiConfig {
            public_key: "pk_test".into(),
            assistant_id: "asst_test".into(),
        }),
        admission_lock_timeout: Duration::from_millis(500),
    }
}

pub fn setup_app_with(config: Config) -> TestApp {
    let candidates = MemoryCandidateStore::new();
    let users = MemoryUserStore::new();
    let mailer = LogMailer::new();
    let stores = Stores {
        candidates: Arc::new(candidates.clone()),
        users: Arc::new(users.clone()),
    };
    let state = AppState::new(config, stores, Arc::new(mailer.clone())).expect("app state");
    TestApp {
        router: routes::router(state.clone()),
        state,
        candidates,
        users,
        mailer,
    }
}

pub fn setup_app() -> TestApp {
    setup_app_with(test_config())
}

impl TestApp {
    pub async fn send(&self, req: Request<Body>) -> (StatusCode, JsonValue) {
        let resp = self.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            JsonValue::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null)
        };
        (status, body)
    }

    pub async fn post(&self, uri: &str, body: JsonValue) -> (StatusCode, JsonValue) {
        self.send(json_request("POST", uri, body, None)).await
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, JsonValue) {
        self.send(
            Request::builder()
                .method("GET")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn staff(
        &self,
        method: &str,
        uri: &str,
        token: &str,
        body: Option<JsonValue>,
    ) -> (StatusCode, JsonValue) {
        let req = match body {
            Some(body) => json_request(method, uri, body, Some(token)),
            None => Request::builder()
                .method(method)
                .uri(uri)
                .header("authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        };
        self.send(req).await
    }

    /// Creates a user through the service and logs in over HTTP.
    pub async fn login_as(&self, email: &str, role: UserRole) -> String {
        let password = "Passw0rdA";
        self.state
            .auth_service
            .create_user(email, "Staff", role, password)
            .await
            .unwrap();
        let (status, body) = self
            .post(
                "/api/auth/login",
                serde_json::json!({ "email": email, "password": password }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body["token"].as_str().unwrap().to_string()
    }

    /// Waits for fire-and-forget email tasks.
    pub async fn wait_for_emails(&self, count: usize) -> Vec<EmailMessage> {
        for _ in 0..100 {
            let sent = self.mailer.sent();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.mailer.sent()
    }
}

pub fn json_request(method: &str, uri: &str, body: JsonValue, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Pulls `token=` out of the first link in `text` that points at `page`.
pub fn token_from_link(text: &str, page: &str) -> Option<String> {
    let start = text.find(&format!("/{}?", page))?;
    let rest = &text[start..];
    let token_at = rest.find("token=")? + "token=".len();
    Some(
        rest[token_at..]
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect(),
    )
}
