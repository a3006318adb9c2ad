//! Instance listing and history pipelines over the in-memory backend.

mod common;

use common::{connections, instance, lister, seeded_storage, HUB};
use durable_monitor::listing::{HistoryRequest, ListRequest};
use durable_monitor::models::EntityType;
use durable_monitor::storage::InMemoryStorage;
use durable_monitor::{MonitorError, RuntimeStatus};
use std::sync::Arc;

fn request(filter: &str, order_by: Option<&str>, top: Option<&str>) -> ListRequest {
    ListRequest::from_query(Some(filter), order_by, None, top, Some("parentInstanceId")).unwrap()
}

fn ids(items: &[durable_monitor::ExpandedOrchestrationStatus]) -> Vec<&str> {
    items.iter().map(|i| i.instance_id.as_str()).collect()
}

#[tokio::test]
async fn test_lists_everything_without_filter() {
    let storage = seeded_storage();
    let hub = connections(storage).resolve(HUB);
    let items = lister(500).list(&hub, &request("", None, None)).await.unwrap();
    assert_eq!(items.len(), 5);
}

#[tokio::test]
async fn test_durable_entities_status_selects_entities_only() {
    let storage = seeded_storage();
    let hub = connections(storage).resolve(HUB);
    let items = lister(500)
        .list(&hub, &request("runtimeStatus in ('DurableEntities')", None, None))
        .await
        .unwrap();

    assert_eq!(ids(&items), ["@counter@k1", "@cart@k2"]);
    assert!(items.iter().all(|i| i.entity_type == EntityType::DurableEntity));
}

#[tokio::test]
async fn test_entities_and_running_orchestrations_together() {
    let storage = seeded_storage();
    let hub = connections(storage).resolve(HUB);
    let items = lister(500)
        .list(&hub, &request("runtimeStatus in ('DurableEntities','Running')", None, None))
        .await
        .unwrap();
    assert_eq!(ids(&items), ["ship-1", "@counter@k1", "@cart@k2"]);
}

#[tokio::test]
async fn test_status_and_field_predicate_combine() {
    let storage = seeded_storage();
    let hub = connections(storage).resolve(HUB);
    let items = lister(500)
        .list(
            &hub,
            &request("runtimeStatus in ('Failed','Completed') and name eq 'ProcessOrder'", None, None),
        )
        .await
        .unwrap();
    assert_eq!(ids(&items), ["order-1", "order-2"]);
}

#[tokio::test]
async fn test_order_by_created_time_desc_then_window() {
    let storage = seeded_storage();
    let hub = connections(storage).resolve(HUB);
    let request =
        ListRequest::from_query(None, Some("createdTime desc"), Some("1"), Some("2"), None).unwrap();
    let items = lister(500).list(&hub, &request).await.unwrap();
    assert_eq!(ids(&items), ["@counter@k1", "ship-1"]);
}

#[tokio::test]
async fn test_order_by_unknown_field_keeps_storage_order() {
    let storage = seeded_storage();
    let hub = connections(storage).resolve(HUB);
    let items = lister(500)
        .list(&hub, &request("", Some("noSuchColumn desc"), None))
        .await
        .unwrap();
    assert_eq!(ids(&items), ["order-1", "order-2", "ship-1", "@counter@k1", "@cart@k2"]);
}

#[tokio::test]
async fn test_top_stops_paging_early() {
    let storage = Arc::new(InMemoryStorage::new());
    for i in 0..10 {
        storage.add_instance(HUB, instance("Orch", &format!("i{i}"), i * 1000, RuntimeStatus::Completed));
    }
    let hub = connections(Arc::clone(&storage)).resolve(HUB);

    let items = lister(2).list(&hub, &request("", None, Some("3"))).await.unwrap();

    assert_eq!(ids(&items), ["i0", "i1", "i2"]);
    assert_eq!(storage.page_request_count(), 2);
}

#[tokio::test]
async fn test_skip_and_top_without_order() {
    let storage = Arc::new(InMemoryStorage::new());
    for i in 0..7 {
        storage.add_instance(HUB, instance("Orch", &format!("i{i}"), i * 1000, RuntimeStatus::Completed));
    }
    let hub = connections(Arc::clone(&storage)).resolve(HUB);
    let request = ListRequest::from_query(None, None, Some("4"), Some("10"), None).unwrap();

    let items = lister(3).list(&hub, &request).await.unwrap();
    assert_eq!(ids(&items), ["i4", "i5", "i6"]);
}

#[tokio::test]
async fn test_last_event_filter_fetches_every_candidate() {
    let storage = seeded_storage();
    let hub = connections(Arc::clone(&storage)).resolve(HUB);
    let items = lister(500)
        .list(&hub, &request("lastEvent eq 'TaskFailed'", None, None))
        .await
        .unwrap();

    assert_eq!(ids(&items), ["order-2"]);
    assert_eq!(items[0].last_event.as_deref(), Some("TaskFailed"));
    assert_eq!(storage.status_request_count(), 5);
}

#[tokio::test]
async fn test_order_by_last_event_fetches_it() {
    let storage = seeded_storage();
    let hub = connections(Arc::clone(&storage)).resolve(HUB);
    let items = lister(500)
        .list(&hub, &request("", Some("lastEvent desc"), None))
        .await
        .unwrap();

    assert_eq!(items.len(), 5);
    assert_eq!(items[0].instance_id, "order-2");
    assert_eq!(items[0].last_event.as_deref(), Some("TaskFailed"));
    assert_eq!(items[1].instance_id, "order-1");
    assert_eq!(items[1].last_event.as_deref(), Some("ExecutionCompleted"));
    assert_eq!(storage.status_request_count(), 5);
}

#[tokio::test]
async fn test_last_event_not_fetched_for_other_filters() {
    let storage = seeded_storage();
    let hub = connections(Arc::clone(&storage)).resolve(HUB);
    let items = lister(500)
        .list(&hub, &request("name eq 'ShipOrder'", None, None))
        .await
        .unwrap();
    assert_eq!(items[0].last_event, None);
    assert_eq!(storage.status_request_count(), 0);
}

#[tokio::test]
async fn test_hidden_columns_are_nulled() {
    let storage = Arc::new(InMemoryStorage::new());
    let mut status = instance("Orch", "i1", 0, RuntimeStatus::Completed);
    status.input = Some(serde_json::json!({"order": 42}));
    status.output = Some(serde_json::json!("ok"));
    storage.add_instance(HUB, status);
    let hub = connections(storage).resolve(HUB);

    let request =
        ListRequest::from_query(None, None, None, None, Some("input|parentInstanceId")).unwrap();
    let items = lister(500).list(&hub, &request).await.unwrap();

    assert_eq!(items[0].input, None);
    assert_eq!(items[0].output, Some(serde_json::json!("ok")));
    assert_eq!(items[0].parent_instance_id.peek(), "");
    assert!(!items[0].parent_instance_id.is_pending());
}

#[tokio::test]
async fn test_unknown_hub_lists_nothing() {
    let storage = seeded_storage();
    let hub = connections(storage).resolve("OtherHub");
    let items = lister(500).list(&hub, &request("", None, None)).await.unwrap();
    assert!(items.is_empty());
}

#[tokio::test]
async fn test_get_instance_detail() {
    let storage = seeded_storage();
    let hub = connections(storage).resolve(HUB);
    let detail = lister(500).get_instance(&hub, "order-1").await.unwrap();

    assert_eq!(detail.status.name, "ProcessOrder");
    assert_eq!(detail.entity_type, EntityType::Orchestration);
    assert_eq!(detail.parent_instance_id, None);
    assert!(detail.history.is_none());
    assert!(detail.tab_template_names.is_empty());
}

#[tokio::test]
async fn test_get_missing_instance_is_not_found() {
    let storage = seeded_storage();
    let hub = connections(storage).resolve(HUB);
    let result = lister(500).get_instance(&hub, "nope").await;
    assert!(matches!(result, Err(MonitorError::NotFound(_))));
}

#[tokio::test]
async fn test_history_filter_order_and_window() {
    let storage = seeded_storage();
    let hub = connections(storage).resolve(HUB);
    let lister = lister(500);

    let all = lister
        .history(&hub, "order-1", &HistoryRequest::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 3);

    let request = HistoryRequest::from_query(
        Some("timestamp ge '2024-05-01T08:00:00.100Z'"),
        None,
        None,
        None,
    )
    .unwrap();
    let late = lister.history(&hub, "order-1", &request).await.unwrap();
    assert_eq!(late.len(), 2);
    assert_eq!(late[0].event_type, "TaskCompleted");

    let request =
        HistoryRequest::from_query(None, Some("durationInMs desc"), None, Some("1")).unwrap();
    let longest = lister.history(&hub, "order-1", &request).await.unwrap();
    assert_eq!(longest.len(), 1);
    assert_eq!(longest[0].event_type, "ExecutionCompleted");
    assert_eq!(longest[0].duration_in_ms, 500);
}
