//! # Task Hub Handlers

use axum::extract::State;
use axum::Json;
use tracing::debug;

use crate::web::response_types::{ApiError, ApiResult};
use crate::web::state::AppState;

/// Allowed task hub names: GET /task-hub-names
///
/// 404 when the allow-list could not be determined.
pub async fn list_task_hub_names(State(state): State<AppState>) -> ApiResult<Json<Vec<String>>> {
    match state.task_hubs.task_hub_names().await {
        Some(names) => {
            debug!(count = names.len(), "Returning task hub names");
            Ok(Json(names))
        }
        None => Err(ApiError::not_found("Task hub list is not available")),
    }
}
