//! # Status Aggregator
//!
//! Turns base status records into the list and detail views:
//!
//! - [`StatusAggregator::expand_for_list`] classifies entities, computes the
//!   duration, nulls hidden columns and starts the background parent lookup.
//! - [`StatusAggregator::expand_last_events`] fetches every instance's inline
//!   history concurrently and records its last event name.
//! - [`StatusAggregator::expand_detailed`] builds the single-instance view with
//!   parent id, tab template names and, optionally, the reconstructed history.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

use super::background::BackgroundValue;
use super::parent_resolver::ParentInstanceResolver;
use crate::error::Result;
use crate::history::HistoryProvider;
use crate::models::{
    DetailedOrchestrationStatus, EntityId, EntityType, ExpandedOrchestrationStatus, HiddenColumns,
    OrchestrationStatus,
};
use crate::storage::HubContext;
use crate::templates::TabTemplates;

/// Column name that turns off background parent resolution
pub const PARENT_INSTANCE_COLUMN: &str = "parentInstanceId";

pub struct StatusAggregator {
    history_provider: Arc<dyn HistoryProvider>,
    parent_resolver: Arc<dyn ParentInstanceResolver>,
    templates: Arc<TabTemplates>,
}

impl std::fmt::Debug for StatusAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusAggregator")
            .field("templates", &self.templates)
            .finish_non_exhaustive()
    }
}

impl StatusAggregator {
    pub fn new(
        history_provider: Arc<dyn HistoryProvider>,
        parent_resolver: Arc<dyn ParentInstanceResolver>,
        templates: Arc<TabTemplates>,
    ) -> Self {
        Self {
            history_provider,
            parent_resolver,
            templates,
        }
    }

    pub fn history_provider(&self) -> &Arc<dyn HistoryProvider> {
        &self.history_provider
    }

    /// Start the parent lookup on the runtime; reading it never blocks
    pub fn spawn_parent_lookup(&self, hub: &HubContext, instance_id: &str) -> BackgroundValue {
        let resolver = Arc::clone(&self.parent_resolver);
        let storage = Arc::clone(&hub.storage);
        let connection_name = hub.connection_name.clone();
        let hub_name = hub.hub_name.clone();
        let instance_id = instance_id.to_string();

        BackgroundValue::spawn("parentInstanceId", async move {
            resolver
                .resolve_parent(storage, &connection_name, &hub_name, &instance_id)
                .await
        })
    }

    pub fn expand_for_list(
        &self,
        hub: &HubContext,
        status: OrchestrationStatus,
        hidden_columns: &HiddenColumns,
        now: DateTime<Utc>,
    ) -> ExpandedOrchestrationStatus {
        let parent = if hidden_columns.contains(PARENT_INSTANCE_COLUMN)
            || EntityId::detect(&status.instance_id).0 == EntityType::DurableEntity
        {
            BackgroundValue::empty()
        } else {
            self.spawn_parent_lookup(hub, &status.instance_id)
        };

        ExpandedOrchestrationStatus::new(status, hidden_columns, parent, now)
    }

    /// Fill `last_event` for every item.
    ///
    /// All detail fetches start before any is awaited; results keep input
    /// order. A failed fetch leaves that item's `last_event` unset.
    pub async fn expand_last_events(
        &self,
        hub: &HubContext,
        items: Vec<ExpandedOrchestrationStatus>,
    ) -> Vec<ExpandedOrchestrationStatus> {
        let fetches = items.iter().map(|item| {
            hub.storage
                .get_status(&hub.hub_name, &item.instance_id, true)
        });
        let statuses = join_all(fetches).await;

        debug!(hub = %hub.hub_name, count = statuses.len(), "Expanded last events");

        items
            .into_iter()
            .zip(statuses)
            .map(|(mut item, status)| {
                match status {
                    Ok(Some(status)) => item.last_event = status.last_event_name(),
                    Ok(None) => {}
                    Err(e) => warn!(
                        hub = %hub.hub_name,
                        instance_id = %item.instance_id,
                        error = %e,
                        "Failed to fetch last event"
                    ),
                }
                item
            })
            .collect()
    }

    pub async fn expand_detailed(
        &self,
        hub: &HubContext,
        status: OrchestrationStatus,
        include_history: bool,
    ) -> Result<DetailedOrchestrationStatus> {
        let mut detailed = DetailedOrchestrationStatus::new(status);

        if detailed.entity_type == EntityType::Orchestration {
            let parent = self
                .spawn_parent_lookup(hub, &detailed.status.instance_id)
                .settled()
                .await;
            detailed.parent_instance_id = Some(parent).filter(|p| !p.is_empty());
        }

        detailed.tab_template_names = self.templates.names_for(detailed.type_name()).await;

        if include_history {
            let history = self
                .history_provider
                .load_history(
                    Arc::clone(&hub.storage),
                    &hub.connection_name,
                    &hub.hub_name,
                    &detailed.status.instance_id,
                )
                .await?;
            detailed.history = Some(history.collect());
        }

        Ok(detailed)
    }
}
