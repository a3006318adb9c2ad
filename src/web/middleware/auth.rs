//! # Authentication Middleware
//!
//! Runs the [`RequestGate`](crate::auth::RequestGate) in front of every route.

use axum::extract::{Request, State};
use axum::http::Method;
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

use crate::auth::Operation;
use crate::web::response_types::ApiError;
use crate::web::state::AppState;

/// Reject the request unless the gate lets it through
pub async fn require_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let operation = classify(request.method());
    state.gate.authorize(request.headers(), operation)?;

    debug!(method = %request.method(), path = %request.uri().path(), "Request authorized");
    Ok(next.run(request).await)
}

fn classify(method: &Method) -> Operation {
    if method == Method::GET || method == Method::HEAD || method == Method::OPTIONS {
        Operation::Read
    } else {
        Operation::Write
    }
}
