//! In-memory [`DurableStorage`] for tests and local runs.
//!
//! Hubs are keyed case-insensitively. Failure injection and call counters
//! let tests observe degraded paths and caching behavior.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use super::{DurableStorage, HistoryQuery, InstancePage, InstanceQuery};
use crate::constants::{HISTORY_TABLE_SUFFIX, INSTANCES_TABLE_SUFFIX};
use crate::error::{MonitorError, Result};
use crate::models::{OrchestrationStatus, RawHistoryEntity};

#[derive(Debug, Default)]
struct HubTables {
    display_name: String,
    instances: Vec<OrchestrationStatus>,
    history: Vec<RawHistoryEntity>,
}

#[derive(Debug, Default)]
pub struct InMemoryStorage {
    hubs: DashMap<String, HubTables>,
    extra_tables: RwLock<Vec<String>>,
    templates: RwLock<Vec<String>>,
    fail_table_scans: AtomicBool,
    fail_history_queries: AtomicBool,
    fail_template_listing: AtomicBool,
    history_delay: RwLock<Option<Duration>>,
    table_scans: AtomicUsize,
    page_requests: AtomicUsize,
    status_requests: AtomicUsize,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create both tables of a hub
    pub fn create_hub(&self, hub_name: &str) {
        self.hubs
            .entry(hub_name.to_ascii_lowercase())
            .or_insert_with(|| HubTables {
                display_name: hub_name.to_string(),
                ..HubTables::default()
            });
    }

    pub fn add_instance(&self, hub_name: &str, status: OrchestrationStatus) {
        self.create_hub(hub_name);
        if let Some(mut hub) = self.hubs.get_mut(&hub_name.to_ascii_lowercase()) {
            hub.instances.push(status);
        }
    }

    pub fn add_history(&self, hub_name: &str, rows: impl IntoIterator<Item = RawHistoryEntity>) {
        self.create_hub(hub_name);
        if let Some(mut hub) = self.hubs.get_mut(&hub_name.to_ascii_lowercase()) {
            hub.history.extend(rows);
        }
    }

    /// Register a table that is not part of a hub pair
    pub fn add_table(&self, table_name: impl Into<String>) {
        self.extra_tables.write().push(table_name.into());
    }

    pub fn add_template(&self, file_name: impl Into<String>) {
        self.templates.write().push(file_name.into());
    }

    pub fn set_table_scan_failure(&self, fail: bool) {
        self.fail_table_scans.store(fail, Ordering::SeqCst);
    }

    pub fn set_history_failure(&self, fail: bool) {
        self.fail_history_queries.store(fail, Ordering::SeqCst);
    }

    pub fn set_template_failure(&self, fail: bool) {
        self.fail_template_listing.store(fail, Ordering::SeqCst);
    }

    /// Delay every history query, to exercise timeouts
    pub fn set_history_delay(&self, delay: Option<Duration>) {
        *self.history_delay.write() = delay;
    }

    pub fn table_scan_count(&self) -> usize {
        self.table_scans.load(Ordering::SeqCst)
    }

    pub fn page_request_count(&self) -> usize {
        self.page_requests.load(Ordering::SeqCst)
    }

    pub fn status_request_count(&self) -> usize {
        self.status_requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DurableStorage for InMemoryStorage {
    async fn list_instances_page(
        &self,
        hub_name: &str,
        query: &InstanceQuery,
        continuation_token: Option<String>,
    ) -> Result<InstancePage> {
        self.page_requests.fetch_add(1, Ordering::SeqCst);

        let offset = match continuation_token {
            Some(token) => token.parse::<usize>().map_err(|_| {
                MonitorError::BadRequest(format!("Invalid continuation token: {token}"))
            })?,
            None => 0,
        };

        let Some(hub) = self.hubs.get(&hub_name.to_ascii_lowercase()) else {
            return Ok(InstancePage::default());
        };

        let matching: Vec<&OrchestrationStatus> =
            hub.instances.iter().filter(|s| query.matches(s)).collect();
        let page_size = query.page_size.max(1);
        let end = (offset + page_size).min(matching.len());
        let items = matching
            .get(offset..end)
            .unwrap_or_default()
            .iter()
            .map(|s| (*s).clone())
            .collect();

        Ok(InstancePage {
            items,
            continuation_token: (end < matching.len()).then(|| end.to_string()),
        })
    }

    async fn get_status(
        &self,
        hub_name: &str,
        instance_id: &str,
        show_history: bool,
    ) -> Result<Option<OrchestrationStatus>> {
        self.status_requests.fetch_add(1, Ordering::SeqCst);

        let Some(hub) = self.hubs.get(&hub_name.to_ascii_lowercase()) else {
            return Ok(None);
        };
        let Some(mut status) = hub
            .instances
            .iter()
            .find(|s| s.instance_id == instance_id)
            .cloned()
        else {
            return Ok(None);
        };

        if show_history {
            status.history = Some(
                hub.history
                    .iter()
                    .filter(|row| row.partition_key == instance_id)
                    .map(RawHistoryEntity::to_runtime_json)
                    .collect(),
            );
        }

        Ok(Some(status))
    }

    async fn query_history(
        &self,
        hub_name: &str,
        query: &HistoryQuery,
    ) -> Result<Vec<RawHistoryEntity>> {
        let delay = *self.history_delay.read();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_history_queries.load(Ordering::SeqCst) {
            return Err(MonitorError::storage("history table unavailable"));
        }

        Ok(self
            .hubs
            .get(&hub_name.to_ascii_lowercase())
            .map(|hub| {
                hub.history
                    .iter()
                    .filter(|row| query.matches(row))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list_table_names(&self) -> Result<Vec<String>> {
        self.table_scans.fetch_add(1, Ordering::SeqCst);
        if self.fail_table_scans.load(Ordering::SeqCst) {
            return Err(MonitorError::storage("table service unavailable"));
        }

        let mut names: Vec<String> = self
            .hubs
            .iter()
            .flat_map(|hub| {
                [
                    format!("{}{INSTANCES_TABLE_SUFFIX}", hub.display_name),
                    format!("{}{HISTORY_TABLE_SUFFIX}", hub.display_name),
                ]
            })
            .collect();
        names.extend(self.extra_tables.read().iter().cloned());
        Ok(names)
    }

    async fn list_template_blobs(&self) -> Result<Vec<String>> {
        if self.fail_template_listing.load(Ordering::SeqCst) {
            return Err(MonitorError::storage("template container unavailable"));
        }
        Ok(self.templates.read().clone())
    }
}
