//! History loading extension point.
//!
//! [`StorageHistoryProvider`] reads the history table and the correlated
//! completion rows concurrently, then reconstructs lazily. When either query
//! fails it falls back to the inline history returned with the instance
//! status, which lacks correlation but keeps the timeline visible.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use super::reconstruction::{index_correlated, Reconstruction};
use crate::error::Result;
use crate::models::HistoryEvent;
use crate::storage::{DurableStorage, HistoryQuery};

/// Lazily produced timeline of one instance
pub type HistorySequence = Box<dyn Iterator<Item = HistoryEvent> + Send>;

#[async_trait]
pub trait HistoryProvider: Send + Sync {
    async fn load_history(
        &self,
        storage: Arc<dyn DurableStorage>,
        connection_name: &str,
        hub_name: &str,
        instance_id: &str,
    ) -> Result<HistorySequence>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StorageHistoryProvider;

impl StorageHistoryProvider {
    async fn from_inline_history(
        storage: &dyn DurableStorage,
        hub_name: &str,
        instance_id: &str,
    ) -> Result<HistorySequence> {
        let history = storage
            .get_status(hub_name, instance_id, true)
            .await?
            .and_then(|status| status.history)
            .unwrap_or_default();

        Ok(Box::new(
            history
                .into_iter()
                .filter_map(|value| HistoryEvent::from_runtime_json(&value)),
        ))
    }
}

#[async_trait]
impl HistoryProvider for StorageHistoryProvider {
    async fn load_history(
        &self,
        storage: Arc<dyn DurableStorage>,
        connection_name: &str,
        hub_name: &str,
        instance_id: &str,
    ) -> Result<HistorySequence> {
        let start = Instant::now();
        let history_query = HistoryQuery::for_instance(instance_id);
        let correlated_query = HistoryQuery::correlated(instance_id);

        let (rows, correlated) = tokio::join!(
            storage.query_history(hub_name, &history_query),
            storage.query_history(hub_name, &correlated_query),
        );

        match (rows, correlated) {
            (Ok(rows), Ok(correlated)) => {
                debug!(
                    connection = %connection_name,
                    hub = %hub_name,
                    instance_id = %instance_id,
                    rows = rows.len(),
                    correlated = correlated.len(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Loaded history rows"
                );
                Ok(Box::new(Reconstruction::new(rows, index_correlated(correlated))))
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!(
                    connection = %connection_name,
                    hub = %hub_name,
                    instance_id = %instance_id,
                    error = %e,
                    "History table query failed, falling back to inline history"
                );
                Self::from_inline_history(storage.as_ref(), hub_name, instance_id).await
            }
        }
    }
}
