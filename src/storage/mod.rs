//! # Storage Backends
//!
//! The monitor reads orchestration state through [`DurableStorage`], a
//! table-like view over one storage connection. Every task hub on a connection
//! is a pair of tables, `<hub>Instances` and `<hub>History`.
//!
//! - [`in_memory`] - dashmap-backed store for tests and local demos
//! - [`postgres`] - sqlx-backed store over PostgreSQL tables
//!
//! [`StorageConnections`] holds the default connection plus named
//! alternatives. Hubs living on an alternative connection are addressed as
//! `<connName>-<hub>`.

pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use in_memory::InMemoryStorage;
#[cfg(feature = "postgres")]
pub use postgres::PostgresStorage;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::constants::{RuntimeStatus, DEFAULT_CONNECTION_NAME, DEFAULT_INSTANCE_PAGE_SIZE};
use crate::error::Result;
use crate::models::{OrchestrationStatus, RawHistoryEntity};

/// Natively supported instance filters plus the page size
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceQuery {
    pub created_time_from: Option<DateTime<Utc>>,
    pub created_time_till: Option<DateTime<Utc>>,
    /// `None` means every status
    pub runtime_statuses: Option<Vec<RuntimeStatus>>,
    pub page_size: usize,
}

impl Default for InstanceQuery {
    fn default() -> Self {
        Self {
            created_time_from: None,
            created_time_till: None,
            runtime_statuses: None,
            page_size: DEFAULT_INSTANCE_PAGE_SIZE,
        }
    }
}

impl InstanceQuery {
    pub fn matches(&self, status: &OrchestrationStatus) -> bool {
        self.created_time_from
            .map_or(true, |from| status.created_time >= from)
            && self
                .created_time_till
                .map_or(true, |till| status.created_time <= till)
            && self
                .runtime_statuses
                .as_ref()
                .map_or(true, |statuses| statuses.contains(&status.runtime_status))
    }
}

#[derive(Debug, Clone, Default)]
pub struct InstancePage {
    pub items: Vec<OrchestrationStatus>,
    /// `None` on the last page
    pub continuation_token: Option<String>,
}

/// Filter over the history table. Unset fields do not constrain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryQuery {
    pub partition_key: Option<String>,
    pub event_type: Option<String>,
    pub child_instance_id: Option<String>,
    pub timestamp_from: Option<DateTime<Utc>>,
    pub timestamp_till: Option<DateTime<Utc>>,
    /// Only rows carrying a `task_scheduled_id`
    pub with_task_scheduled_id: bool,
}

impl HistoryQuery {
    /// Every row of one instance
    pub fn for_instance(instance_id: impl Into<String>) -> Self {
        Self {
            partition_key: Some(instance_id.into()),
            ..Self::default()
        }
    }

    /// Completion rows of one instance, keyed for correlation
    pub fn correlated(instance_id: impl Into<String>) -> Self {
        Self {
            with_task_scheduled_id: true,
            ..Self::for_instance(instance_id)
        }
    }

    pub fn of_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    pub fn for_child(mut self, child_instance_id: impl Into<String>) -> Self {
        self.child_instance_id = Some(child_instance_id.into());
        self
    }

    pub fn between(mut self, from: DateTime<Utc>, till: DateTime<Utc>) -> Self {
        self.timestamp_from = Some(from);
        self.timestamp_till = Some(till);
        self
    }

    pub fn matches(&self, row: &RawHistoryEntity) -> bool {
        self.partition_key
            .as_ref()
            .map_or(true, |key| &row.partition_key == key)
            && self
                .event_type
                .as_ref()
                .map_or(true, |event_type| &row.event_type == event_type)
            && self
                .child_instance_id
                .as_ref()
                .map_or(true, |child| row.instance_id.as_ref() == Some(child))
            && self.timestamp_from.map_or(true, |from| row.timestamp >= from)
            && self.timestamp_till.map_or(true, |till| row.timestamp <= till)
            && (!self.with_task_scheduled_id || row.task_scheduled_id.is_some())
    }
}

/// Read-only access to the orchestration tables of one storage connection
#[async_trait]
pub trait DurableStorage: Send + Sync {
    /// One page of instances, natively filtered by `query`
    async fn list_instances_page(
        &self,
        hub_name: &str,
        query: &InstanceQuery,
        continuation_token: Option<String>,
    ) -> Result<InstancePage>;

    /// Status of one instance. With `show_history` the runtime-API style
    /// inline history is attached.
    async fn get_status(
        &self,
        hub_name: &str,
        instance_id: &str,
        show_history: bool,
    ) -> Result<Option<OrchestrationStatus>>;

    /// History rows matching `query`, in table order
    async fn query_history(
        &self,
        hub_name: &str,
        query: &HistoryQuery,
    ) -> Result<Vec<RawHistoryEntity>>;

    /// Every table name on the connection
    async fn list_table_names(&self) -> Result<Vec<String>>;

    /// Tab template file names kept in storage
    async fn list_template_blobs(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// A validated hub bound to the connection it lives on
#[derive(Clone)]
pub struct HubContext {
    pub storage: Arc<dyn DurableStorage>,
    pub connection_name: String,
    pub hub_name: String,
}

impl fmt::Debug for HubContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HubContext")
            .field("connection_name", &self.connection_name)
            .field("hub_name", &self.hub_name)
            .finish()
    }
}

/// The default storage connection plus named alternatives
#[derive(Clone)]
pub struct StorageConnections {
    default: Arc<dyn DurableStorage>,
    alternatives: BTreeMap<String, Arc<dyn DurableStorage>>,
}

impl StorageConnections {
    pub fn new(default: Arc<dyn DurableStorage>) -> Self {
        Self {
            default,
            alternatives: BTreeMap::new(),
        }
    }

    pub fn with_alternative(
        mut self,
        connection_name: impl Into<String>,
        storage: Arc<dyn DurableStorage>,
    ) -> Self {
        self.alternatives.insert(connection_name.into(), storage);
        self
    }

    pub fn default_storage(&self) -> &Arc<dyn DurableStorage> {
        &self.default
    }

    pub fn alternatives(&self) -> impl Iterator<Item = (&str, &Arc<dyn DurableStorage>)> {
        self.alternatives
            .iter()
            .map(|(name, storage)| (name.as_str(), storage))
    }

    /// Route a client-facing hub name to its connection.
    ///
    /// `<connName>-<hub>` goes to the alternative named `connName`
    /// (case-insensitive); everything else goes to the default connection.
    pub fn resolve(&self, hub_name: &str) -> HubContext {
        if let Some((prefix, rest)) = hub_name.split_once('-') {
            let alternative = self
                .alternatives
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(prefix));
            if let Some((name, storage)) = alternative {
                if !rest.is_empty() {
                    return HubContext {
                        storage: Arc::clone(storage),
                        connection_name: name.clone(),
                        hub_name: rest.to_string(),
                    };
                }
            }
        }

        HubContext {
            storage: Arc::clone(&self.default),
            connection_name: DEFAULT_CONNECTION_NAME.to_string(),
            hub_name: hub_name.to_string(),
        }
    }
}

impl fmt::Debug for StorageConnections {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConnections")
            .field("alternatives", &self.alternatives.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_resolve_routes_alternative_prefix() {
        let connections = StorageConnections::new(Arc::new(InMemoryStorage::new()))
            .with_alternative("Secondary", Arc::new(InMemoryStorage::new()));

        let hub = connections.resolve("secondary-OrdersHub");
        assert_eq!(hub.connection_name, "Secondary");
        assert_eq!(hub.hub_name, "OrdersHub");

        let hub = connections.resolve("my-hub");
        assert_eq!(hub.connection_name, DEFAULT_CONNECTION_NAME);
        assert_eq!(hub.hub_name, "my-hub");

        let hub = connections.resolve("Secondary-");
        assert_eq!(hub.connection_name, DEFAULT_CONNECTION_NAME);
    }

    #[test]
    fn test_history_query_matching() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 10).unwrap();
        let row = RawHistoryEntity::new("parent", "SubOrchestrationInstanceCreated", at)
            .with_child_instance("child");

        assert!(HistoryQuery::default().matches(&row));
        assert!(HistoryQuery::default()
            .of_type("SubOrchestrationInstanceCreated")
            .for_child("child")
            .between(at - chrono::Duration::seconds(5), at + chrono::Duration::seconds(5))
            .matches(&row));
        assert!(!HistoryQuery::for_instance("other").matches(&row));
        assert!(!HistoryQuery::correlated("parent").matches(&row));
        assert!(HistoryQuery::correlated("parent").matches(&row.clone().with_task_scheduled_id(1)));
    }

    #[test]
    fn test_instance_query_matching() {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let status = OrchestrationStatus::new("Orch", "i", created, RuntimeStatus::Failed);

        assert!(InstanceQuery::default().matches(&status));
        let query = InstanceQuery {
            runtime_statuses: Some(vec![RuntimeStatus::Running]),
            ..InstanceQuery::default()
        };
        assert!(!query.matches(&status));
        let query = InstanceQuery {
            created_time_from: Some(created),
            created_time_till: Some(created),
            ..InstanceQuery::default()
        };
        assert!(query.matches(&status));
    }
}
