//! # Web API
//!
//! Thin axum surface over the listing engine. All routes sit behind the
//! request gate; hub-scoped routes validate the task hub first.

pub mod handlers;
pub mod middleware;
pub mod response_types;
pub mod state;

pub use response_types::{ApiError, ApiResult};
pub use state::AppState;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use handlers::{health, orchestrations, task_hubs};

/// Build the router with its middleware stack applied
pub fn create_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/health", get(health::basic_health))
        .route("/task-hub-names", get(task_hubs::list_task_hub_names))
        .route("/{hub}/orchestrations", get(orchestrations::list_orchestrations))
        .route(
            "/{hub}/orchestrations/{instance_id}",
            get(orchestrations::get_orchestration),
        )
        .route(
            "/{hub}/orchestrations/{instance_id}/history",
            get(orchestrations::get_orchestration_history),
        );

    middleware::apply_middleware_stack(router, &state).with_state(state)
}

/// Bind the configured address and serve until the process exits
pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let bind_address = state.config.web.bind_address.clone();
    let listener = TcpListener::bind(&bind_address).await?;
    info!(bind_address = %bind_address, "Durable Functions Monitor listening");

    axum::serve(listener, create_router(state)).await?;
    Ok(())
}
