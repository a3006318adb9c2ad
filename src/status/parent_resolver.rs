//! Parent instance lookup for sub-orchestrations.

use async_trait::async_trait;
use chrono::Duration as ChronoDuration;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::constants::{event_types, PARENT_SEARCH_TIMEOUT, PARENT_SEARCH_WINDOW};
use crate::error::{MonitorError, Result};
use crate::storage::{DurableStorage, HistoryQuery};

/// Finds the instance that started a given instance, if any
#[async_trait]
pub trait ParentInstanceResolver: Send + Sync {
    async fn resolve_parent(
        &self,
        storage: Arc<dyn DurableStorage>,
        connection_name: &str,
        hub_name: &str,
        instance_id: &str,
    ) -> Result<Option<String>>;
}

/// Default resolver over the history table.
///
/// Uses the parent recorded on the child's `ExecutionStarted` row when there
/// is one. Otherwise scans for a `SubOrchestrationInstanceCreated` row naming
/// the child within `search_window` of its start, or of its creation time
/// when no start was recorded. The whole lookup gives up
/// after `timeout` and reports no parent.
#[derive(Debug, Clone)]
pub struct StorageParentResolver {
    search_window: Duration,
    timeout: Duration,
}

impl Default for StorageParentResolver {
    fn default() -> Self {
        Self::new(PARENT_SEARCH_WINDOW, PARENT_SEARCH_TIMEOUT)
    }
}

impl StorageParentResolver {
    pub fn new(search_window: Duration, timeout: Duration) -> Self {
        Self {
            search_window,
            timeout,
        }
    }

    async fn lookup(
        &self,
        storage: &dyn DurableStorage,
        hub_name: &str,
        instance_id: &str,
    ) -> Result<Option<String>> {
        let started = storage
            .query_history(
                hub_name,
                &HistoryQuery::for_instance(instance_id).of_type(event_types::EXECUTION_STARTED),
            )
            .await?;

        // Without an ExecutionStarted row the scan centers on the created time
        let anchor = match started.into_iter().next() {
            Some(started) => {
                if let Some(parent) = started.parent_instance_id.filter(|p| !p.is_empty()) {
                    return Ok(Some(parent));
                }
                started.timestamp
            }
            None => match storage.get_status(hub_name, instance_id, false).await? {
                Some(status) => status.created_time,
                None => return Ok(None),
            },
        };

        let window = ChronoDuration::from_std(self.search_window)
            .map_err(|e| MonitorError::Configuration(format!("Invalid parent search window: {e}")))?;
        let candidates = storage
            .query_history(
                hub_name,
                &HistoryQuery::default()
                    .of_type(event_types::SUB_ORCHESTRATION_CREATED)
                    .for_child(instance_id)
                    .between(anchor - window, anchor + window),
            )
            .await?;

        Ok(candidates.into_iter().next().map(|row| row.partition_key))
    }
}

#[async_trait]
impl ParentInstanceResolver for StorageParentResolver {
    async fn resolve_parent(
        &self,
        storage: Arc<dyn DurableStorage>,
        connection_name: &str,
        hub_name: &str,
        instance_id: &str,
    ) -> Result<Option<String>> {
        match tokio::time::timeout(self.timeout, self.lookup(storage.as_ref(), hub_name, instance_id))
            .await
        {
            Ok(result) => result,
            Err(_) => {
                debug!(
                    connection = %connection_name,
                    hub = %hub_name,
                    instance_id = %instance_id,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Parent instance search timed out"
                );
                Ok(None)
            }
        }
    }
}
