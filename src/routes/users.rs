use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Extension,
};
use validator::Validate;

use crate::dto::auth_dto::{CreateUserRequest, UpdateUserRequest, UserView};
use crate::error::Result;
use crate::middleware::auth::Claims;
use crate::models::user::UserRole;
use crate::services::auth_service::UserUpdate;
use crate::AppState;

#[axum::debug_handler]
pub async fn list_users(State(state): State<AppState>) -> Result<Response> {
    let users: Vec<UserView> = state
        .auth_service
        .list_users()
        .await?
        .into_iter()
        .map(UserView::from)
        .collect();
    Ok(Json(users).into_response())
}

#[axum::debug_handler]
pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<Response> {
    req.validate()?;
    let user = state
        .auth_service
        .create_user(
            &req.email,
            &req.name,
            req.role.unwrap_or(UserRole::User),
            &req.password,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(UserView::from(user))).into_response())
}

#[axum::debug_handler]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Response> {
    req.validate()?;
    let user = state
        .auth_service
        .update_user(
            &id,
            UserUpdate {
                email: req.email,
                name: req.name,
                role: req.role,
                password: req.password,
            },
        )
        .await?;
    Ok(Json(UserView::from(user)).into_response())
}

#[axum::debug_handler]
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Response> {
    state.auth_service.delete_user(&claims.sub, &id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}
