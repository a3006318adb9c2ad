//! # Task Hub Allow-List
//!
//! Sources, first match wins:
//!
//! 1. explicit hub names from configuration (`DFM_HUB_NAME`), enforced strictly
//! 2. `extensions.durableTask.hubName` from the function app's `host.json`
//! 3. a scan of the default connection for `<X>Instances` + `<X>History` pairs
//!
//! For 2 and 3 the hubs of every alternative connection are appended as
//! `<connName>-<hub>`. A failed scan of the default connection makes the list
//! [`AllowList::Unknown`]; a failed alternative scan is skipped.

use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::constants::{HISTORY_TABLE_SUFFIX, INSTANCES_TABLE_SUFFIX};
use crate::error::{MonitorError, Result};
use crate::storage::{DurableStorage, StorageConnections};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownHubs {
    /// Names as discovered, sorted
    names: Vec<String>,
    lookup: HashSet<String>,
    strict: bool,
}

impl KnownHubs {
    fn new<I, S>(names: I, strict: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        // Dedup case-insensitively, keeping the first spelling
        let mut by_key: BTreeMap<String, String> = BTreeMap::new();
        for name in names {
            let name: String = name.into();
            let name = name.trim().to_string();
            if name.is_empty() {
                continue;
            }
            by_key.entry(name.to_ascii_lowercase()).or_insert(name);
        }

        Self {
            lookup: by_key.keys().cloned().collect(),
            names: by_key.into_values().collect(),
            strict,
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, hub_name: &str) -> bool {
        self.lookup.contains(&hub_name.to_ascii_lowercase())
    }

    /// Came from explicit configuration
    pub fn is_strict(&self) -> bool {
        self.strict
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowList {
    Known(Arc<KnownHubs>),
    /// Storage could not be scanned
    Unknown,
}

impl AllowList {
    pub fn explicit<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AllowList::Known(Arc::new(KnownHubs::new(names, true)))
    }

    pub fn discovered<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AllowList::Known(Arc::new(KnownHubs::new(names, false)))
    }

    pub fn contains(&self, hub_name: &str) -> bool {
        match self {
            AllowList::Known(hubs) => hubs.contains(hub_name),
            AllowList::Unknown => false,
        }
    }

    pub fn names(&self) -> Option<Vec<String>> {
        match self {
            AllowList::Known(hubs) => Some(hubs.names().to_vec()),
            AllowList::Unknown => None,
        }
    }
}

/// Hub names on a connection, from its table names
pub fn hubs_from_table_names(table_names: &[String]) -> Vec<String> {
    let lowered: HashSet<String> = table_names.iter().map(|t| t.to_ascii_lowercase()).collect();

    table_names
        .iter()
        .filter_map(|table| strip_suffix_ignore_case(table, INSTANCES_TABLE_SUFFIX))
        .filter(|hub| !hub.is_empty())
        .filter(|hub| {
            lowered.contains(&format!("{hub}{HISTORY_TABLE_SUFFIX}").to_ascii_lowercase())
        })
        .map(String::from)
        .collect()
}

fn strip_suffix_ignore_case<'a>(value: &'a str, suffix: &str) -> Option<&'a str> {
    let split = value.len().checked_sub(suffix.len())?;
    let tail = value.get(split..)?;
    tail.eq_ignore_ascii_case(suffix).then(|| &value[..split])
}

/// Hub name from a `host.json` document. `%NAME%` is read from the environment.
pub fn hub_name_from_host_json(host_json: &str) -> Option<String> {
    let document: Value = serde_json::from_str(host_json).ok()?;
    let hub_name = document
        .get("extensions")?
        .get("durableTask")?
        .get("hubName")?
        .as_str()?
        .trim();

    let resolved = match hub_name
        .strip_prefix('%')
        .and_then(|rest| rest.strip_suffix('%'))
    {
        Some(variable) => std::env::var(variable).ok()?,
        None => hub_name.to_string(),
    };

    Some(resolved).filter(|name| !name.is_empty())
}

#[derive(Clone)]
pub struct AllowListLoader {
    explicit_hub_names: Option<Vec<String>>,
    host_json_path: Option<PathBuf>,
    connections: StorageConnections,
}

impl std::fmt::Debug for AllowListLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AllowListLoader")
            .field("explicit_hub_names", &self.explicit_hub_names)
            .field("host_json_path", &self.host_json_path)
            .finish_non_exhaustive()
    }
}

impl AllowListLoader {
    pub fn new(
        explicit_hub_names: Option<Vec<String>>,
        host_json_path: Option<PathBuf>,
        connections: StorageConnections,
    ) -> Self {
        Self {
            explicit_hub_names,
            host_json_path,
            connections,
        }
    }

    pub async fn load(&self) -> AllowList {
        if let Some(names) = &self.explicit_hub_names {
            debug!(count = names.len(), "Using explicit task hub names");
            return AllowList::explicit(names.iter().cloned());
        }

        let mut hubs = match self.hub_from_host_json().await {
            Some(hub) => vec![hub],
            None => match scan(self.connections.default_storage().as_ref()).await {
                Ok(hubs) => hubs,
                Err(e) => {
                    warn!(error = %e, "Task hub scan failed, allow-list unknown");
                    return AllowList::Unknown;
                }
            },
        };

        for (connection_name, storage) in self.connections.alternatives() {
            match scan(storage.as_ref()).await {
                Ok(alternative_hubs) => hubs.extend(
                    alternative_hubs
                        .into_iter()
                        .map(|hub| format!("{connection_name}-{hub}")),
                ),
                Err(e) => warn!(
                    connection = %connection_name,
                    error = %e,
                    "Skipping task hubs of alternative connection"
                ),
            }
        }

        debug!(count = hubs.len(), "Discovered task hubs");
        AllowList::discovered(hubs)
    }

    async fn hub_from_host_json(&self) -> Option<String> {
        let path = self.host_json_path.as_ref()?;
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => hub_name_from_host_json(&contents),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "host.json not readable");
                None
            }
        }
    }
}

async fn scan(storage: &dyn DurableStorage) -> Result<Vec<String>> {
    let tables = storage
        .list_table_names()
        .await
        .map_err(|e| MonitorError::storage(format!("Listing tables failed: {e}")))?;
    Ok(hubs_from_table_names(&tables))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStorage;

    #[test]
    fn test_hubs_need_both_tables() {
        let tables: Vec<String> = [
            "OrdersInstances",
            "ordershistory",
            "LonelyInstances",
            "BillingHistory",
            "Instances",
            "Unrelated",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        assert_eq!(hubs_from_table_names(&tables), vec!["Orders"]);
    }

    #[test]
    fn test_host_json_hub_name() {
        let json = r#"{"version":"2.0","extensions":{"durableTask":{"hubName":"MyHub"}}}"#;
        assert_eq!(hub_name_from_host_json(json).as_deref(), Some("MyHub"));
        assert_eq!(hub_name_from_host_json(r#"{"version":"2.0"}"#), None);
        assert_eq!(hub_name_from_host_json("not json"), None);
    }

    #[test]
    fn test_known_hubs_dedup_case_insensitively() {
        let list = AllowList::discovered(["Hub1", "HUB1", "hub2"]);
        assert_eq!(list.names(), Some(vec!["Hub1".to_string(), "hub2".to_string()]));
        assert!(list.contains("hub1"));
        assert!(!AllowList::Unknown.contains("hub1"));
    }

    #[tokio::test]
    async fn test_load_appends_alternative_connections() {
        let default = Arc::new(InMemoryStorage::new());
        default.create_hub("Main");
        let secondary = Arc::new(InMemoryStorage::new());
        secondary.create_hub("Other");
        let broken = Arc::new(InMemoryStorage::new());
        broken.set_table_scan_failure(true);

        let connections = StorageConnections::new(default)
            .with_alternative("second", secondary)
            .with_alternative("broken", broken);
        let list = AllowListLoader::new(None, None, connections).load().await;

        assert!(list.contains("Main"));
        assert!(list.contains("second-other"));
        assert_eq!(list.names().map(|n| n.len()), Some(2));
    }

    #[tokio::test]
    async fn test_failed_default_scan_is_unknown() {
        let default = Arc::new(InMemoryStorage::new());
        default.set_table_scan_failure(true);
        let list = AllowListLoader::new(None, None, StorageConnections::new(default))
            .load()
            .await;
        assert_eq!(list, AllowList::Unknown);
    }

    #[tokio::test]
    async fn test_host_json_skips_default_scan() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("host.json");
        std::fs::write(&path, r#"{"extensions":{"durableTask":{"hubName":"FromHost"}}}"#).unwrap();

        let default = Arc::new(InMemoryStorage::new());
        default.set_table_scan_failure(true);
        let list = AllowListLoader::new(None, Some(path), StorageConnections::new(default.clone()))
            .load()
            .await;

        assert_eq!(list.names(), Some(vec!["FromHost".to_string()]));
        assert_eq!(default.table_scan_count(), 0);
    }
}
