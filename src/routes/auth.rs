use axum::{
    extract::State,
    response::{IntoResponse, Json, Response},
    Extension,
};
use validator::Validate;

use crate::dto::auth_dto::{
    ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, LoginResponse, MessageResponse,
    ResetPasswordRequest, UserView,
};
use crate::error::Result;
use crate::middleware::auth::Claims;
use crate::AppState;

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Response> {
    req.validate()?;
    let (token, user) = state.auth_service.login(&req.email, &req.password).await?;
    Ok(Json(LoginResponse {
        token,
        user: UserView::from(user),
    })
    .into_response())
}

/// Always answers the same way so the response does not reveal accounts.
#[axum::debug_handler]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<Response> {
    req.validate()?;
    if let Err(e) = state.auth_service.forgot_password(&req.email).await {
        tracing::error!(error = %e, "forgot-password handling failed");
    }
    Ok(Json(MessageResponse::ok(
        "If an account exists for that email, a reset link has been sent.",
    ))
    .into_response())
}

#[axum::debug_handler]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Response> {
    req.validate()?;
    state
        .auth_service
        .reset_password(&req.token, &req.password)
        .await?;
    Ok(Json(MessageResponse::ok("Password has been reset")).into_response())
}

#[axum::debug_handler]
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Response> {
    let user = state.auth_service.current_user(&claims.sub).await?;
    Ok(Json(UserView::from(user)).into_response())
}

#[axum::debug_handler]
pub async fn change_password(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Response> {
    state
        .auth_service
        .change_password(&claims.sub, &req.current_password, &req.new_password)
        .await?;
    Ok(Json(MessageResponse::ok("Password changed")).into_response())
}
