use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use crate::dto::webhook_dto::InterviewResultWebhook;
use crate::error::Result;
use crate::utils::signing::secrets_match;
use crate::AppState;

pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

#[axum::debug_handler]
pub async fn interview_result(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<InterviewResultWebhook>,
) -> Result<Response> {
    let provided = headers
        .get(WEBHOOK_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !secrets_match(provided, &state.config.webhook_secret) {
        tracing::warn!("interview result webhook with bad secret");
        return Ok((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "invalid_webhook_secret" })),
        )
            .into_response());
    }

    body.check_scores()?;
    let target = body.target()?;
    let record = state
        .candidate_service
        .record_result(target, body.result)
        .await?;
    Ok(Json(json!({ "success": true, "candidateId": record.id })).into_response())
}
