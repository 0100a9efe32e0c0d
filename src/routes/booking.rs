use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json, Response},
};
use validator::Validate;

use crate::dto::booking_dto::{BookingResponse, BookingView, RescheduleRequest, ScheduleRequest};
use crate::error::Result;
use crate::AppState;

#[axum::debug_handler]
pub async fn schedule(
    State(state): State<AppState>,
    Json(req): Json<ScheduleRequest>,
) -> Result<Response> {
    req.validate()?;
    let record = state
        .scheduling_service
        .schedule(&req.candidate_id, &req.signature, req.appointment_time)
        .await?;
    Ok(Json(BookingResponse {
        success: true,
        message: "Interview scheduled. A confirmation email is on its way.".into(),
        booking: BookingView::from(&record),
    })
    .into_response())
}

#[axum::debug_handler]
pub async fn get_booking(
    State(state): State<AppState>,
    Path(management_token): Path<String>,
) -> Result<Response> {
    let record = state.scheduling_service.booking(&management_token).await?;
    Ok(Json(BookingView::from(&record)).into_response())
}

#[axum::debug_handler]
pub async fn reschedule(
    State(state): State<AppState>,
    Path(management_token): Path<String>,
    Json(req): Json<RescheduleRequest>,
) -> Result<Response> {
    let record = state
        .scheduling_service
        .reschedule(&management_token, req.appointment_time)
        .await?;
    Ok(Json(BookingResponse {
        success: true,
        message: "Interview rescheduled".into(),
        booking: BookingView::from(&record),
    })
    .into_response())
}

#[axum::debug_handler]
pub async fn cancel(
    State(state): State<AppState>,
    Path(management_token): Path<String>,
) -> Result<Response> {
    let record = state.scheduling_service.cancel(&management_token).await?;
    Ok(Json(BookingResponse {
        success: true,
        message: "Interview cancelled".into(),
        booking: BookingView::from(&record),
    })
    .into_response())
}
