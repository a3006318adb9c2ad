//! Shared fixtures for integration tests.
#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;

use durable_monitor::config::MonitorConfig;
use durable_monitor::history::StorageHistoryProvider;
use durable_monitor::listing::InstanceLister;
use durable_monitor::models::{OrchestrationStatus, RawHistoryEntity};
use durable_monitor::status::{StatusAggregator, StorageParentResolver};
use durable_monitor::storage::{InMemoryStorage, StorageConnections};
use durable_monitor::templates::TabTemplates;
use durable_monitor::web::AppState;
use durable_monitor::RuntimeStatus;

pub const HUB: &str = "TestHub";

/// Fixed base time plus an offset in milliseconds
pub fn at(ms: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap() + Duration::milliseconds(ms)
}

pub fn instance(name: &str, id: &str, created_ms: i64, status: RuntimeStatus) -> OrchestrationStatus {
    let mut instance = OrchestrationStatus::new(name, id, at(created_ms), status);
    instance.last_updated_time = at(created_ms + 1000);
    instance
}

pub fn history_row(instance_id: &str, event_type: &str, ms: i64) -> RawHistoryEntity {
    RawHistoryEntity::new(instance_id, event_type, at(ms))
}

/// Hub with a mix of orchestrations and entities:
///
/// | id | name | status |
/// |---|---|---|
/// | order-1 | ProcessOrder | Completed |
/// | order-2 | ProcessOrder | Failed |
/// | ship-1 | ShipOrder | Running |
/// | @counter@k1 | counter | Running |
/// | @cart@k2 | cart | Running |
pub fn seeded_storage() -> Arc<InMemoryStorage> {
    let storage = Arc::new(InMemoryStorage::new());
    storage.add_instance(HUB, instance("ProcessOrder", "order-1", 0, RuntimeStatus::Completed));
    storage.add_instance(HUB, instance("ProcessOrder", "order-2", 1000, RuntimeStatus::Failed));
    storage.add_instance(HUB, instance("ShipOrder", "ship-1", 2000, RuntimeStatus::Running));
    storage.add_instance(HUB, instance("@counter@k1", "@counter@k1", 3000, RuntimeStatus::Running));
    storage.add_instance(HUB, instance("@cart@k2", "@cart@k2", 4000, RuntimeStatus::Running));

    storage.add_history(
        HUB,
        [
            history_row("order-1", "ExecutionStarted", 0).with_name("ProcessOrder"),
            history_row("order-1", "TaskScheduled", 10).with_name("Validate").with_event_id(0),
            history_row("order-1", "TaskCompleted", 210).with_task_scheduled_id(0),
            history_row("order-1", "ExecutionCompleted", 500),
            history_row("order-2", "ExecutionStarted", 1000).with_name("ProcessOrder"),
            history_row("order-2", "TaskScheduled", 1010).with_name("Charge").with_event_id(0),
            history_row("order-2", "TaskFailed", 1100)
                .with_task_scheduled_id(0)
                .with_details("card declined"),
        ],
    );
    storage
}

pub fn aggregator() -> Arc<StatusAggregator> {
    Arc::new(StatusAggregator::new(
        Arc::new(StorageHistoryProvider),
        Arc::new(StorageParentResolver::default()),
        Arc::new(TabTemplates::disabled()),
    ))
}

pub fn lister(page_size: usize) -> InstanceLister {
    InstanceLister::new(aggregator(), page_size)
}

pub fn connections(storage: Arc<InMemoryStorage>) -> StorageConnections {
    StorageConnections::new(storage)
}

/// Application state over `storage` with an explicit hub allow-list
pub fn app_state(storage: Arc<InMemoryStorage>, config: MonitorConfig) -> AppState {
    AppState::new(Arc::new(config), connections(storage))
}
