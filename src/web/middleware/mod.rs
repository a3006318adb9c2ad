//! # Web API Middleware
//!
//! Request tracing, the request timeout and the auth gate.

pub mod auth;

use axum::http::StatusCode;
use axum::middleware;
use axum::Router;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::web::state::AppState;

/// Apply the middleware stack, outermost last:
/// 1. auth gate
/// 2. request timeout
/// 3. tracing
pub fn apply_middleware_stack(router: Router<AppState>, state: &AppState) -> Router<AppState> {
    let timeout = Duration::from_millis(state.config.web.request_timeout_ms);

    router
        .layer(middleware::from_fn_with_state(state.clone(), auth::require_auth))
        .layer(TimeoutLayer::with_status_code(StatusCode::GATEWAY_TIMEOUT, timeout))
        .layer(TraceLayer::new_for_http())
}
