//! # Instance Listing
//!
//! Staged query pipeline over all instances of a hub:
//!
//! 1. page through the backend with native time-range and status filters
//! 2. expand each record, and fill `lastEvent` when the filter targets it
//! 3. re-apply the status filter so entities and running orchestrations differ
//! 4. apply the field predicate
//! 5. sort when `$orderby` is present
//! 6. skip, then take
//!
//! Stages run as a stream. Nothing is collected unless the `lastEvent`
//! expansion or the sort needs the whole set, so a small `$top` stops
//! paging early. Without `$orderby` the result order is whatever the backend
//! returns.

pub mod history;

pub use history::HistoryRequest;

use chrono::Utc;
use futures::future;
use futures::stream::{self, BoxStream, Stream, StreamExt, TryStreamExt};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::constants::{RuntimeStatus, DURABLE_ENTITIES_STATUS, LAST_EVENT_FIELD};
use crate::error::{MonitorError, Result};
use crate::logging::log_query_operation;
use crate::models::{
    DetailedOrchestrationStatus, ExpandedOrchestrationStatus, HiddenColumns, OrchestrationStatus,
};
use crate::query_builder::{FilterClause, OrderBy, Pagination};
use crate::status::StatusAggregator;
use crate::storage::{DurableStorage, HubContext, InstanceQuery};

/// Parsed list query parameters
#[derive(Debug, Clone, Default)]
pub struct ListRequest {
    pub filter: FilterClause,
    pub order_by: Option<OrderBy>,
    pub pagination: Pagination,
    pub hidden_columns: HiddenColumns,
}

impl ListRequest {
    pub fn from_query(
        filter: Option<&str>,
        order_by: Option<&str>,
        skip: Option<&str>,
        top: Option<&str>,
        hidden_columns: Option<&str>,
    ) -> Result<Self> {
        Ok(Self {
            filter: FilterClause::parse(filter.unwrap_or_default()),
            order_by: order_by.and_then(OrderBy::parse),
            pagination: Pagination::from_query(skip, top)?,
            hidden_columns: HiddenColumns::parse(hidden_columns),
        })
    }

    /// `lastEvent` is fetched per instance only when filtering or sorting on it
    pub fn needs_last_event(&self) -> bool {
        self.filter.references_field(LAST_EVENT_FIELD)
            || self
                .order_by
                .as_ref()
                .is_some_and(|order| order.field_name.eq_ignore_ascii_case(LAST_EVENT_FIELD))
    }

    /// Native backend query. `DurableEntities` becomes `Running`; names the
    /// backend does not know are dropped.
    pub fn instance_query(&self, page_size: usize) -> InstanceQuery {
        let runtime_statuses = self.filter.runtime_statuses.as_ref().map(|names| {
            names
                .iter()
                .filter_map(|name| {
                    if name.eq_ignore_ascii_case(DURABLE_ENTITIES_STATUS) {
                        Some(RuntimeStatus::Running)
                    } else {
                        name.parse::<RuntimeStatus>().ok()
                    }
                })
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        });

        InstanceQuery {
            created_time_from: self.filter.time_from,
            created_time_till: self.filter.time_till,
            runtime_statuses,
            page_size,
        }
    }
}

/// Whether an expanded item passes the requested status set
pub fn passes_status_filter(filter: &FilterClause, item: &ExpandedOrchestrationStatus) -> bool {
    if filter.runtime_statuses.is_none() {
        return true;
    }
    (item.is_entity() && filter.includes_durable_entities())
        || filter.includes_status(item.runtime_status.as_str())
}

/// Every instance matching `query`, following continuation tokens lazily
pub fn instance_stream(
    storage: Arc<dyn DurableStorage>,
    hub_name: String,
    query: InstanceQuery,
) -> impl Stream<Item = Result<OrchestrationStatus>> + Send + 'static {
    // State is the next token to request; `None` once the last page is read
    stream::try_unfold(Some(None::<String>), move |next| {
        let storage = Arc::clone(&storage);
        let hub_name = hub_name.clone();
        let query = query.clone();
        async move {
            let Some(token) = next else {
                return Ok::<_, MonitorError>(None);
            };
            let page = storage.list_instances_page(&hub_name, &query, token).await?;
            let items = stream::iter(page.items.into_iter().map(Ok::<_, MonitorError>));
            Ok(Some((items, page.continuation_token.map(Some))))
        }
    })
    .try_flatten()
}

#[derive(Debug)]
pub struct InstanceLister {
    aggregator: Arc<StatusAggregator>,
    page_size: usize,
}

impl InstanceLister {
    pub fn new(aggregator: Arc<StatusAggregator>, page_size: usize) -> Self {
        Self {
            aggregator,
            page_size: page_size.max(1),
        }
    }

    pub fn aggregator(&self) -> &Arc<StatusAggregator> {
        &self.aggregator
    }

    pub async fn list(
        &self,
        hub: &HubContext,
        request: &ListRequest,
    ) -> Result<Vec<ExpandedOrchestrationStatus>> {
        let start = Instant::now();

        let aggregator = Arc::clone(&self.aggregator);
        let expand_hub = hub.clone();
        let hidden_columns = request.hidden_columns.clone();
        let now = Utc::now();

        let expanded = instance_stream(
            Arc::clone(&hub.storage),
            hub.hub_name.clone(),
            request.instance_query(self.page_size),
        )
        .map_ok(move |status| {
            aggregator.expand_for_list(&expand_hub, status, &hidden_columns, now)
        });

        let expanded: BoxStream<'static, Result<ExpandedOrchestrationStatus>> =
            if request.needs_last_event() {
                let items: Vec<_> = expanded.try_collect().await?;
                let items = self.aggregator.expand_last_events(hub, items).await;
                stream::iter(items.into_iter().map(Ok)).boxed()
            } else {
                expanded.boxed()
            };

        let status_filter = request.filter.clone();
        let field_filter = request.filter.clone();
        let filtered = expanded
            .try_filter(move |item| future::ready(passes_status_filter(&status_filter, item)))
            .try_filter(move |item| future::ready(field_filter.matches(item)));

        let pagination = request.pagination;
        let items: Vec<ExpandedOrchestrationStatus> = match &request.order_by {
            Some(order_by) => {
                let mut items: Vec<_> = filtered.try_collect().await?;
                if !order_by.apply(&mut items) {
                    debug!(field = %order_by.field_name, "Ignoring order by unknown field");
                }
                pagination.window(items.into_iter()).collect()
            }
            None => {
                filtered
                    .skip(pagination.skip())
                    .take(pagination.take())
                    .try_collect()
                    .await?
            }
        };

        log_query_operation(
            "list_instances",
            &hub.hub_name,
            None,
            items.len(),
            start.elapsed().as_millis() as u64,
        );
        Ok(items)
    }

    /// Single instance detail view without history
    pub async fn get_instance(
        &self,
        hub: &HubContext,
        instance_id: &str,
    ) -> Result<DetailedOrchestrationStatus> {
        let status = hub
            .storage
            .get_status(&hub.hub_name, instance_id, false)
            .await?
            .ok_or_else(|| MonitorError::NotFound(format!("Instance {instance_id}")))?;
        self.aggregator.expand_detailed(hub, status, false).await
    }
}
