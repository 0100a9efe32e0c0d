pub mod admission;
pub mod auth;
pub mod booking;
pub mod candidates;
pub mod health;
pub mod users;
pub mod webhook;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};

use crate::middleware::{
    auth::{require_admin, require_bearer_auth},
    rate_limit::{rps_middleware, RateLimiter},
};
use crate::AppState;

/// Every route the service exposes, with auth and rate limiting applied.
pub fn router(state: AppState) -> Router {
    let public_api = Router::new()
        .route("/api/validate-token", post(admission::validate_token))
        .route(
            "/api/check-interview-status",
            get(admission::check_interview_status),
        )
        .route(
            "/api/mark-interview-started",
            post(admission::mark_interview_started),
        )
        .route(
            "/api/get-vapi-credentials",
            post(admission::get_vapi_credentials),
        )
        .route("/api/schedule", post(booking::schedule))
        .route("/api/booking/:management_token", get(booking::get_booking))
        .route(
            "/api/booking/:management_token/reschedule",
            post(booking::reschedule),
        )
        .route("/api/booking/:management_token/cancel", post(booking::cancel))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/forgot-password", post(auth::forgot_password))
        .route("/api/auth/reset-password", post(auth::reset_password))
        .route(
            "/api/webhook/interview-result",
            post(webhook::interview_result),
        )
        .layer(from_fn_with_state(
            RateLimiter::new(state.config.public_rps),
            rps_middleware,
        ));

    let staff_api = Router::new()
        .route(
            "/api/candidates",
            get(candidates::list_candidates).post(candidates::create_candidate),
        )
        .route("/api/candidates/stats", get(candidates::candidate_stats))
        .route(
            "/api/candidates/:id",
            get(candidates::get_candidate)
                .put(candidates::update_candidate)
                .delete(candidates::delete_candidate),
        )
        .route(
            "/api/candidates/:id/scheduling-link",
            get(candidates::scheduling_link),
        )
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/change-password", post(auth::change_password))
        .route_layer(from_fn_with_state(state.clone(), require_bearer_auth));

    let admin_api = Router::new()
        .route("/api/users", get(users::list_users).post(users::create_user))
        .route(
            "/api/users/:id",
            put(users::update_user).delete(users::delete_user),
        )
        .route_layer(from_fn_with_state(state.clone(), require_admin));

    let staff_rps = RateLimiter::new(state.config.staff_rps);
    let dashboard_api = staff_api
        .merge(admin_api)
        .layer(from_fn_with_state(staff_rps, rps_middleware));

    Router::new()
        .route("/health", get(health::health))
        .merge(public_api)
        .merge(dashboard_api)
        .with_state(state)
}
