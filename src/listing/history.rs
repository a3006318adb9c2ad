//! History query pipeline: time range, field predicate, order, then window.
//!
//! The reconstructed timeline is consumed lazily; without `$orderby` only
//! the rows needed to fill `$skip + $top` events are examined.

use std::sync::Arc;
use std::time::Instant;

use super::InstanceLister;
use crate::error::Result;
use crate::logging::log_query_operation;
use crate::models::HistoryEvent;
use crate::query_builder::{FilterClause, OrderBy, Pagination};
use crate::storage::HubContext;

#[derive(Debug, Clone, Default)]
pub struct HistoryRequest {
    pub filter: FilterClause,
    pub order_by: Option<OrderBy>,
    pub pagination: Pagination,
}

impl HistoryRequest {
    pub fn from_query(
        filter: Option<&str>,
        order_by: Option<&str>,
        skip: Option<&str>,
        top: Option<&str>,
    ) -> Result<Self> {
        Ok(Self {
            filter: FilterClause::parse(filter.unwrap_or_default()),
            order_by: order_by.and_then(OrderBy::parse),
            pagination: Pagination::from_query(skip, top)?,
        })
    }

    fn in_time_range(&self, event: &HistoryEvent) -> bool {
        self.filter
            .time_from
            .map_or(true, |from| event.timestamp >= from)
            && self
                .filter
                .time_till
                .map_or(true, |till| event.timestamp <= till)
    }
}

impl InstanceLister {
    pub async fn history(
        &self,
        hub: &HubContext,
        instance_id: &str,
        request: &HistoryRequest,
    ) -> Result<Vec<HistoryEvent>> {
        let start = Instant::now();

        let timeline = self
            .aggregator()
            .history_provider()
            .load_history(
                Arc::clone(&hub.storage),
                &hub.connection_name,
                &hub.hub_name,
                instance_id,
            )
            .await?;

        let filtered = timeline
            .filter(|event| request.in_time_range(event))
            .filter(|event| request.filter.matches(event));

        let events: Vec<HistoryEvent> = match &request.order_by {
            Some(order_by) => {
                let mut events: Vec<_> = filtered.collect();
                order_by.apply(&mut events);
                request.pagination.window(events.into_iter()).collect()
            }
            None => request.pagination.window(filtered).collect(),
        };

        log_query_operation(
            "instance_history",
            &hub.hub_name,
            Some(instance_id),
            events.len(),
            start.elapsed().as_millis() as u64,
        );
        Ok(events)
    }
}
