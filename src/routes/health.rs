use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::AppState;

#[axum::debug_handler]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let body = json!({
        "status": "ok",
        "store": state.config.store.backend_name(),
        "statusWebhook": state.notification_service.is_enabled(),
        "voice": state.config.vapi.is_some(),
    });
    (StatusCode::OK, Json(body))
}
