use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde_json::json;

use crate::dto::admission_dto::{
    MarkStartedResponse, TimeInfo, TokenQuery, TokenRequest, ValidateTokenResponse,
    VapiCredentialsResponse,
};
use crate::error::Result;
use crate::services::admission_service::{Decision, Denial};
use crate::AppState;

fn denial_status(denial: &Denial) -> StatusCode {
    match denial {
        Denial::NotFound | Denial::NotScheduled => StatusCode::NOT_FOUND,
        Denial::Cancelled | Denial::AlreadyUsed => StatusCode::BAD_REQUEST,
        Denial::AlreadyStarted => StatusCode::CONFLICT,
        Denial::OutOfWindow { .. } => StatusCode::FORBIDDEN,
    }
}

fn missing_token() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "valid": false, "error": "Token is required" })),
    )
        .into_response()
}

#[axum::debug_handler]
pub async fn validate_token(
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> Result<Response> {
    let Some(token) = req.token() else {
        return Ok(missing_token());
    };

    let now = Utc::now();
    match state.admission_service.validate_access_at(token, now).await? {
        Decision::Granted(admission) => {
            let time_info = TimeInfo::new(&admission.window, admission.candidate.appointment_time, now);
            let response = ValidateTokenResponse {
                valid: true,
                message: admission.window.message(),
                candidate: admission.candidate,
                time_info,
            };
            Ok(Json(response).into_response())
        }
        Decision::Denied(denial) => {
            let mut body = json!({ "valid": false, "error": denial.message() });
            if let Denial::OutOfWindow {
                window,
                appointment,
            } = &denial
            {
                body["timeInfo"] = serde_json::to_value(TimeInfo::new(window, *appointment, now))?;
            }
            Ok((denial_status(&denial), Json(body)).into_response())
        }
    }
}

#[axum::debug_handler]
pub async fn check_interview_status(
    State(state): State<AppState>,
    Query(q): Query<TokenQuery>,
) -> Result<Response> {
    let Some(token) = q.token.as_deref().map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Token is required" })),
        )
            .into_response());
    };

    match state.admission_service.interview_status(token).await? {
        Some(status) => Ok(Json(status).into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": Denial::NotFound.message() })),
        )
            .into_response()),
    }
}

#[axum::debug_handler]
pub async fn mark_interview_started(
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> Result<Response> {
    let Some(token) = req.token() else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": "Token is required" })),
        )
            .into_response());
    };

    match state.admission_service.consume_access(token).await? {
        Decision::Granted(call_attempts) => Ok(Json(MarkStartedResponse {
            success: true,
            call_attempts,
        })
        .into_response()),
        Decision::Denied(denial) => Ok((
            denial_status(&denial),
            Json(json!({ "success": false, "error": denial.message() })),
        )
            .into_response()),
    }
}

/// Hands the browser what it needs to start the voice call, only while the
/// token's window is open.
#[axum::debug_handler]
pub async fn get_vapi_credentials(
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> Result<Response> {
    let Some(vapi) = state.config.vapi.as_ref() else {
        tracing::warn!("voice credentials requested but VAPI is not configured");
        return Ok((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "Voice interview service is not configured" })),
        )
            .into_response());
    };
    let Some(token) = req.token() else {
        return Ok(missing_token());
    };

    match state.admission_service.window_open(token, Utc::now()).await? {
        Decision::Granted(_) => Ok(Json(VapiCredentialsResponse {
            public_key: vapi.public_key.clone(),
            assistant_id: vapi.assistant_id.clone(),
        })
        .into_response()),
        Decision::Denied(denial) => {
            let status = match denial {
                Denial::NotFound | Denial::NotScheduled => StatusCode::NOT_FOUND,
                _ => StatusCode::FORBIDDEN,
            };
            Ok((status, Json(json!({ "error": denial.message() }))).into_response())
        }
    }
}
