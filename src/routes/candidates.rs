use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Extension,
};
use validator::Validate;

use crate::dto::candidate_dto::{
    CandidateListQuery, CandidateListResponse, CandidateView, CreateCandidateRequest,
    CreateCandidateResponse, SchedulingLinkResponse, UpdateCandidateRequest,
};
use crate::error::{Error, Result};
use crate::middleware::auth::Claims;
use crate::models::candidate::NewCandidate;
use crate::services::candidate_service::{CandidateFilter, CandidateUpdate};
use crate::AppState;

#[axum::debug_handler]
pub async fn list_candidates(
    State(state): State<AppState>,
    Query(q): Query<CandidateListQuery>,
) -> Result<Response> {
    let filter = CandidateFilter::try_from(q)?;
    let records = state.candidate_service.list(&filter).await?;
    let candidates: Vec<CandidateView> = records.into_iter().map(CandidateView::from).collect();
    Ok(Json(CandidateListResponse {
        total: candidates.len(),
        candidates,
    })
    .into_response())
}

#[axum::debug_handler]
pub async fn candidate_stats(State(state): State<AppState>) -> Result<Response> {
    let stats = state.candidate_service.stats().await?;
    Ok(Json(stats).into_response())
}

#[axum::debug_handler]
pub async fn create_candidate(
    State(state): State<AppState>,
    Json(req): Json<CreateCandidateRequest>,
) -> Result<Response> {
    req.validate()?;
    let record = state
        .candidate_service
        .create(NewCandidate {
            name: req.name.trim().to_string(),
            email: req.email.trim().to_string(),
            phone: req.phone,
        })
        .await?;

    let scheduling_link = state.scheduling_service.scheduling_link(&record)?;
    if req.send_invite {
        state.scheduling_service.send_invitation(&record)?;
    }

    Ok((
        StatusCode::CREATED,
        Json(CreateCandidateResponse {
            candidate: CandidateView::from(record),
            scheduling_link,
        }),
    )
        .into_response())
}

#[axum::debug_handler]
pub async fn get_candidate(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response> {
    let record = state.candidate_service.get(&id).await?;
    Ok(Json(CandidateView::from(record)).into_response())
}

#[axum::debug_handler]
pub async fn update_candidate(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateCandidateRequest>,
) -> Result<Response> {
    req.validate()?;
    let record = state
        .candidate_service
        .update(
            &id,
            CandidateUpdate {
                status: req.status,
                name: req.name,
                email: req.email,
                phone: req.phone,
            },
        )
        .await?;
    Ok(Json(CandidateView::from(record)).into_response())
}

#[axum::debug_handler]
pub async fn delete_candidate(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Response> {
    if !claims.is_admin() {
        return Err(Error::Forbidden("Only admins can delete candidates".into()));
    }
    state.candidate_service.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

#[axum::debug_handler]
pub async fn scheduling_link(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response> {
    let record = state.candidate_service.get(&id).await?;
    let link = state.scheduling_service.scheduling_link(&record)?;
    Ok(Json(SchedulingLinkResponse { link }).into_response())
}
