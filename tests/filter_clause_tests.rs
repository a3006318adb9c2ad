//! Filter parsing and application against list records.

mod common;

use chrono::{TimeZone, Utc};
use common::{instance, HUB};
use durable_monitor::models::HiddenColumns;
use durable_monitor::query_builder::{FilterClause, OrderBy, PredicateKind};
use durable_monitor::storage::{InMemoryStorage, StorageConnections};
use durable_monitor::RuntimeStatus;
use std::sync::Arc;

#[test]
fn test_full_clause_with_every_stage() {
    let clause = FilterClause::parse(
        "createdTime ge '2021-11-01T00:00:00.000Z' and createdTime le '2021-11-03T01:02:03.000Z' \
         and runtimeStatus in ('Running','Completed') and contains(name,'Order')",
    );

    assert_eq!(clause.time_from, Some(Utc.with_ymd_and_hms(2021, 11, 1, 0, 0, 0).unwrap()));
    assert_eq!(clause.time_till, Some(Utc.with_ymd_and_hms(2021, 11, 3, 1, 2, 3).unwrap()));
    assert_eq!(
        clause.runtime_statuses,
        Some(vec!["Running".to_string(), "Completed".to_string()])
    );
    assert_eq!(clause.field_name.as_deref(), Some("name"));
    assert_eq!(
        clause.predicate.as_ref().map(|p| &p.kind),
        Some(&PredicateKind::Contains("Order".into()))
    );
}

#[test]
fn test_empty_and_garbage_filters_are_unconstrained() {
    for raw in ["", "   ", "not a filter", "name gt 5"] {
        let clause = FilterClause::parse(raw);
        assert_eq!(clause, FilterClause::default(), "filter {raw:?}");
        assert!(clause.matches_value("anything"));
    }
}

#[test]
fn test_in_list_keeps_commas_inside_quotes() {
    let clause = FilterClause::parse("name in ('a,b', 'c')");
    assert_eq!(
        clause.predicate.map(|p| p.kind),
        Some(PredicateKind::In(vec!["a,b".into(), "c".into()]))
    );
}

#[test]
fn test_negated_in_list() {
    let clause = FilterClause::parse("instanceId in ('x','y') eq false");
    assert!(!clause.matches_value("x"));
    assert!(clause.matches_value("z"));
}

#[tokio::test]
async fn test_predicate_applies_to_expanded_records() {
    let storage = Arc::new(InMemoryStorage::new());
    let hub = StorageConnections::new(storage).resolve(HUB);
    let aggregator = common::aggregator();
    let hidden: HiddenColumns = ["parentInstanceId"].into_iter().collect();

    let order = aggregator.expand_for_list(
        &hub,
        instance("ProcessOrder", "order-1", 0, RuntimeStatus::Completed),
        &hidden,
        Utc::now(),
    );
    let entity = aggregator.expand_for_list(
        &hub,
        instance("@counter@k1", "@counter@k1", 0, RuntimeStatus::Running),
        &hidden,
        Utc::now(),
    );

    assert!(FilterClause::parse("startswith(name,'Process')").matches(&order));
    assert!(!FilterClause::parse("startswith(name,'Process')").matches(&entity));
    assert!(FilterClause::parse("entityType eq 'DurableEntity'").matches(&entity));
    assert!(FilterClause::parse("duration eq '1000'").matches(&order));
    // Unknown fields match nothing
    assert!(!FilterClause::parse("bogus eq 'x'").matches(&order));
    // No predicate matches everything
    assert!(FilterClause::parse("runtimeStatus in ('Failed')").matches(&order));
}

#[test]
fn test_order_by_parsing() {
    let order = OrderBy::parse("createdTime desc").unwrap();
    assert_eq!(order.field_name, "createdTime");
    assert!(order.descending);
    assert!(!OrderBy::parse("name").unwrap().descending);
    assert!(!OrderBy::parse("name asc").unwrap().descending);
    assert!(OrderBy::parse("  ").is_none());
}
