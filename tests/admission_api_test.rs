mod common;

use axum::http::StatusCode;
use bloom_backend::database::store::CandidateStore;
use bloom_backend::models::candidate::{CandidateRecord, CandidateStatus};
use chrono::{DateTime, Duration, Utc};
use common::{setup_app, setup_app_with, test_config};
use serde_json::json;

fn seed(app: &common::TestApp, token: &str, appointment: DateTime<Utc>) {
    let mut rec = CandidateRecord::new(format!("rec-{}", token), "Ada Lovelace", "ada@example.com");
    rec.token = Some(token.to_string());
    rec.management_token = Some(format!("mgmt-{}", token));
    rec.appointment_time = Some(appointment);
    rec.status = CandidateStatus::Scheduled;
    app.candidates.insert(rec);
}

#[tokio::test]
async fn validate_token_outcomes() {
    let app = setup_app();
    seed(&app, "open", Utc::now() + Duration::minutes(2));
    seed(&app, "early", Utc::now() + Duration::days(1) + Duration::hours(2));
    seed(&app, "late", Utc::now() - Duration::minutes(45));

    let (status, body) = app.post("/api/validate-token", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["valid"], false);

    let (status, body) = app
        .post("/api/validate-token", json!({ "token": "missing" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Invalid interview token");

    let (status, body) = app
        .post("/api/validate-token", json!({ "token": "open" }))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["valid"], true);
    assert_eq!(body["candidate"]["name"], "Ada Lovelace");
    assert!(body["timeInfo"]["minutesIntoWindow"].is_i64());
    assert_eq!(body["timeInfo"]["windowOpensMinutesBefore"], 5);
    assert_eq!(body["timeInfo"]["valid"], true);
    assert_eq!(body["timeInfo"]["tooEarly"], false);

    let (status, body) = app
        .post("/api/validate-token", json!({ "token": "early" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["timeInfo"]["days"], 1);
    assert_eq!(body["timeInfo"]["tooEarly"], true);
    assert_eq!(body["timeInfo"]["valid"], false);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Interview window opens in 1 day"));

    let (status, body) = app
        .post("/api/validate-token", json!({ "token": "late" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["timeInfo"]["minutesLate"].as_i64().unwrap() >= 14);
    assert_eq!(body["timeInfo"]["tooLate"], true);
}

#[tokio::test]
async fn token_is_single_use() {
    let app = setup_app();
    seed(&app, "tok", Utc::now());

    let (status, body) = app
        .post("/api/mark-interview-started", json!({ "token": "tok" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "callAttempts": 1 }));

    let (status, body) = app
        .post("/api/mark-interview-started", json!({ "token": "tok" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);

    let (status, body) = app
        .post("/api/validate-token", json!({ "token": "tok" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "This interview link has already been used");

    let (status, body) = app.get("/api/check-interview-status?token=tok").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "completed": true, "status": "pending", "action": "interviewed" })
    );

    let (status, _) = app
        .post("/api/mark-interview-started", json!({ "token": "nope" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cancelled_booking_cannot_be_started() {
    let app = setup_app();
    seed(&app, "gone", Utc::now());
    let mut rec = app.candidates.find_by_token("gone").await.unwrap().unwrap();
    rec.status = CandidateStatus::Cancelled;
    app.candidates.insert(rec);

    let (status, body) = app
        .post("/api/mark-interview-started", json!({ "token": "gone" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "This interview has been cancelled");

    let rec = app.candidates.find_by_token("gone").await.unwrap().unwrap();
    assert_eq!(rec.status, CandidateStatus::Cancelled);
    assert_eq!(rec.call_attempts, 0);
    assert!(!rec.interview_completed);

    let (status, body) = app.get("/api/check-interview-status?token=gone").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");
    assert_eq!(body["completed"], false);
}

#[tokio::test]
async fn concurrent_starts_admit_exactly_one() {
    let app = setup_app();
    seed(&app, "race", Utc::now());

    let mut handles = Vec::new();
    for _ in 0..10 {
        let router = app.router.clone();
        handles.push(tokio::spawn(async move {
            use tower::ServiceExt;
            let req = common::json_request(
                "POST",
                "/api/mark-interview-started",
                json!({ "token": "race" }),
                None,
            );
            router.oneshot(req).await.unwrap().status()
        }));
    }

    let mut ok = 0;
    let mut conflict = 0;
    for h in handles {
        match h.await.unwrap() {
            StatusCode::OK => ok += 1,
            StatusCode::CONFLICT => conflict += 1,
            other => panic!("unexpected status {}", other),
        }
    }
    assert_eq!(ok, 1);
    assert_eq!(conflict, 9);
}

#[tokio::test]
async fn check_status_requires_known_token() {
    let app = setup_app();
    let (status, _) = app.get("/api/check-interview-status").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.get("/api/check-interview-status?token=zzz").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn voice_credentials_follow_the_window() {
    let app = setup_app();
    seed(&app, "now", Utc::now());
    seed(&app, "tomorrow", Utc::now() + Duration::days(1));

    let (status, body) = app
        .post("/api/get-vapi-credentials", json!({ "token": "now" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "publicKey": "pk_test", "assistantId": "asst_test" }));

    let (status, _) = app
        .post("/api/get-vapi-credentials", json!({ "token": "tomorrow" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let mut config = test_config();
    config.vapi = None;
    let unconfigured = setup_app_with(config);
    let (status, _) = unconfigured
        .post("/api/get-vapi-credentials", json!({ "token": "now" }))
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn public_routes_are_rate_limited() {
    let mut config = test_config();
    config.public_rps = 2;
    let app = setup_app_with(config);

    let mut statuses = Vec::new();
    for _ in 0..3 {
        let (status, _) = app.get("/api/check-interview-status?token=x").await;
        statuses.push(status);
    }
    assert_eq!(statuses[2], StatusCode::TOO_MANY_REQUESTS);

    let (status, _) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
}
