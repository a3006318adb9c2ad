//! Task hub validation against scanned, explicit and host.json allow-lists.

mod common;

use common::{seeded_storage, HUB};
use durable_monitor::storage::{InMemoryStorage, StorageConnections};
use durable_monitor::task_hubs::{AllowListLoader, TaskHubValidator};
use durable_monitor::MonitorError;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

const REFRESH: Duration = Duration::from_secs(300);

fn validator(connections: StorageConnections, explicit: Option<Vec<String>>) -> TaskHubValidator {
    TaskHubValidator::new(AllowListLoader::new(explicit, None, connections), REFRESH)
}

#[tokio::test]
async fn test_scanned_hubs_validate_case_insensitively() {
    let storage = seeded_storage();
    let validator = validator(StorageConnections::new(storage), None);

    assert!(validator.validate(HUB).await.is_ok());
    assert!(validator.validate("TESTHUB").await.is_ok());
    assert_eq!(validator.task_hub_names().await, Some(vec![HUB.to_string()]));
}

#[tokio::test]
async fn test_malformed_names_never_reach_storage() {
    let storage = seeded_storage();
    let validator = validator(StorageConnections::new(storage.clone()), None);

    for name in ["ab", "has space", "semi;colon", ""] {
        assert!(matches!(
            validator.validate(name).await,
            Err(MonitorError::InvalidTaskHubName(_))
        ));
    }
    assert_eq!(storage.table_scan_count(), 0);
}

#[tokio::test]
async fn test_alternative_connection_hubs_are_prefixed() {
    let default = seeded_storage();
    let secondary = Arc::new(InMemoryStorage::new());
    secondary.create_hub("Billing");
    let connections = StorageConnections::new(default).with_alternative("Secondary", secondary);
    let validator = validator(connections, None);

    assert!(validator.validate("Secondary-Billing").await.is_ok());
    assert!(validator.validate("secondary-billing").await.is_ok());
    let names = validator.task_hub_names().await.unwrap();
    assert!(names.contains(&"Secondary-Billing".to_string()));
    assert!(names.contains(&HUB.to_string()));
}

#[tokio::test]
async fn test_failed_scan_fails_open() {
    let storage = Arc::new(InMemoryStorage::new());
    storage.set_table_scan_failure(true);
    let validator = validator(StorageConnections::new(storage.clone()), None);

    assert!(validator.validate("AnyHub").await.is_ok());
    assert_eq!(validator.task_hub_names().await, None);
    assert!(validator.validate("OtherHub").await.is_ok());
    // Unknown lists are not reloaded on a miss
    assert_eq!(storage.table_scan_count(), 1);
}

#[tokio::test]
async fn test_explicit_list_is_strict() {
    let storage = seeded_storage();
    let validator = validator(
        StorageConnections::new(storage.clone()),
        Some(vec!["Configured".to_string()]),
    );

    assert!(validator.validate("configured").await.is_ok());
    assert!(matches!(
        validator.validate(HUB).await,
        Err(MonitorError::TaskHubNotAllowed(_))
    ));
    assert_eq!(storage.table_scan_count(), 0);
}

#[tokio::test]
async fn test_host_json_names_the_hub() {
    let mut host_json = tempfile::NamedTempFile::new().unwrap();
    write!(
        host_json,
        r#"{{"version":"2.0","extensions":{{"durableTask":{{"hubName":"FromHostJson"}}}}}}"#
    )
    .unwrap();

    let storage = seeded_storage();
    let validator = TaskHubValidator::new(
        AllowListLoader::new(
            None,
            Some(host_json.path().to_path_buf()),
            StorageConnections::new(storage.clone()),
        ),
        REFRESH,
    );

    assert_eq!(
        validator.task_hub_names().await,
        Some(vec!["FromHostJson".to_string()])
    );
    assert_eq!(storage.table_scan_count(), 0);
}
