//! # Orchestration Handlers
//!
//! Instance listing, single-instance detail and history timeline for one
//! task hub. Every route validates the hub before storage is touched.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use tracing::debug;

use crate::listing::{HistoryRequest, ListRequest};
use crate::models::{DetailedOrchestrationStatus, ExpandedOrchestrationStatus, HistoryEvent};
use crate::web::response_types::ApiResult;
use crate::web::state::AppState;

/// Query parameters shared by the listing routes
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(rename = "$filter")]
    pub filter: Option<String>,
    #[serde(rename = "$orderby")]
    pub order_by: Option<String>,
    #[serde(rename = "$skip")]
    pub skip: Option<String>,
    #[serde(rename = "$top")]
    pub top: Option<String>,
    #[serde(rename = "hidden-columns")]
    pub hidden_columns: Option<String>,
}

/// List instances: GET /{hub}/orchestrations
pub async fn list_orchestrations(
    State(state): State<AppState>,
    Path(hub_name): Path<String>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<ExpandedOrchestrationStatus>>> {
    let hub = state.hub(&hub_name).await?;
    let request = ListRequest::from_query(
        query.filter.as_deref(),
        query.order_by.as_deref(),
        query.skip.as_deref(),
        query.top.as_deref(),
        query.hidden_columns.as_deref(),
    )?;

    let items = state.lister.list(&hub, &request).await?;
    Ok(Json(items))
}

/// Instance detail: GET /{hub}/orchestrations/{instance_id}
pub async fn get_orchestration(
    State(state): State<AppState>,
    Path((hub_name, instance_id)): Path<(String, String)>,
) -> ApiResult<Json<DetailedOrchestrationStatus>> {
    let hub = state.hub(&hub_name).await?;
    debug!(hub = %hub.hub_name, instance_id = %instance_id, "Fetching instance detail");

    let detail = state.lister.get_instance(&hub, &instance_id).await?;
    Ok(Json(detail))
}

/// History timeline: GET /{hub}/orchestrations/{instance_id}/history
pub async fn get_orchestration_history(
    State(state): State<AppState>,
    Path((hub_name, instance_id)): Path<(String, String)>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<HistoryEvent>>> {
    let hub = state.hub(&hub_name).await?;
    let request = HistoryRequest::from_query(
        query.filter.as_deref(),
        query.order_by.as_deref(),
        query.skip.as_deref(),
        query.top.as_deref(),
    )?;

    let events = state.lister.history(&hub, &instance_id, &request).await?;
    Ok(Json(events))
}
