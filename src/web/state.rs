//! # Web API Application State
//!
//! Process-wide services built once at startup and shared by every handler:
//! the storage connections, the task hub validator with its cached
//! allow-list, the listing engine and the request gate.

use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::auth::RequestGate;
use crate::config::MonitorConfig;
use crate::history::StorageHistoryProvider;
use crate::listing::InstanceLister;
use crate::status::{StatusAggregator, StorageParentResolver};
use crate::storage::{HubContext, StorageConnections};
use crate::task_hubs::{AllowListLoader, TaskHubValidator};
use crate::templates::{TabTemplates, TemplateSource};
use crate::web::response_types::ApiResult;

/// Shared application state for the web API
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<MonitorConfig>,
    pub connections: StorageConnections,
    pub task_hubs: Arc<TaskHubValidator>,
    pub lister: Arc<InstanceLister>,
    pub gate: Arc<RequestGate>,
    pub started_at: Instant,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("connections", &self.connections)
            .field("task_hubs", &self.task_hubs)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Wire the default services over `connections`
    pub fn new(config: Arc<MonitorConfig>, connections: StorageConnections) -> Self {
        let template_source = match &config.templates.folder {
            Some(folder) => TemplateSource::Folder(folder.clone()),
            None => TemplateSource::Storage(Arc::clone(connections.default_storage())),
        };

        let aggregator = Arc::new(StatusAggregator::new(
            Arc::new(StorageHistoryProvider),
            Arc::new(StorageParentResolver::new(
                config.parent_resolution.search_window(),
                config.parent_resolution.timeout(),
            )),
            Arc::new(TabTemplates::new(template_source)),
        ));
        Self::with_aggregator(config, connections, aggregator)
    }

    /// Wire the services around a caller-built aggregator, e.g. one with a
    /// custom history provider or parent resolver
    pub fn with_aggregator(
        config: Arc<MonitorConfig>,
        connections: StorageConnections,
        aggregator: Arc<StatusAggregator>,
    ) -> Self {
        let task_hubs = Arc::new(TaskHubValidator::new(
            AllowListLoader::new(
                config.task_hubs.explicit_hub_names(),
                config.task_hubs.host_json_path.clone(),
                connections.clone(),
            ),
            config.task_hubs.refresh_interval(),
        ));
        let lister = Arc::new(InstanceLister::new(
            aggregator,
            config.listing.instance_page_size,
        ));
        let gate = Arc::new(RequestGate::from_config(&config.auth));

        info!(
            alternatives = connections.alternatives().count(),
            read_only = gate.is_read_only(),
            page_size = config.listing.instance_page_size,
            "Web API application state created"
        );

        Self {
            config,
            connections,
            task_hubs,
            lister,
            gate,
            started_at: Instant::now(),
        }
    }

    /// Validate a client-supplied hub name and bind it to its connection
    pub async fn hub(&self, hub_name: &str) -> ApiResult<HubContext> {
        self.task_hubs.validate(hub_name).await?;
        Ok(self.connections.resolve(hub_name))
    }
}
