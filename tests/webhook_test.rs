mod common;

use axum::{body::Body, http::{Request, StatusCode}};
use bloom_backend::models::candidate::CandidateRecord;
use common::{setup_app, WEBHOOK_SECRET};
use serde_json::json;

fn result_request(secret: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/webhook/interview-result")
        .header("content-type", "application/json");
    if let Some(secret) = secret {
        builder = builder.header("x-webhook-secret", secret);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn result_webhook_requires_secret_and_stores_result() {
    let app = setup_app();
    let mut rec = CandidateRecord::new("rec1", "Ada", "ada@example.com");
    rec.token = Some("tok".into());
    app.candidates.insert(rec);

    let body = json!({
        "token": "tok",
        "overall_score": 8,
        "communication": 9,
        "recommendation": "Strong hire",
        "summary": "Warm and articulate",
        "interview_length_seconds": 540
    });

    let (status, _) = app.send(result_request(None, body.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.send(result_request(Some("wrong"), body.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, resp) = app
        .send(result_request(Some(WEBHOOK_SECRET), body))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", resp);
    assert_eq!(resp["candidateId"], "rec1");

    let stored = app.state.candidate_service.get("rec1").await.unwrap();
    assert!(stored.interview_completed);
    assert_eq!(stored.result.overall_score, Some(8));
    assert_eq!(stored.result.recommendation.as_deref(), Some("Strong hire"));
    assert_eq!(stored.result.interview_length_seconds, Some(540));
}

#[tokio::test]
async fn result_webhook_validates_payload() {
    let app = setup_app();
    app.candidates
        .insert(CandidateRecord::new("rec1", "Ada", "ada@example.com"));

    let (status, _) = app
        .send(result_request(
            Some(WEBHOOK_SECRET),
            json!({ "candidate_id": "rec1", "overall_score": 42 }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(result_request(Some(WEBHOOK_SECRET), json!({ "summary": "orphan" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(result_request(
            Some(WEBHOOK_SECRET),
            json!({ "candidate_id": "missing", "overall_score": 5 }),
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
