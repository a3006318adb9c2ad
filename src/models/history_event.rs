//! # History Event Models
//!
//! Two shapes of the same timeline:
//!
//! - [`RawHistoryEntity`] is one row of the append-only history table, exactly
//!   as the orchestration runtime wrote it. This crate only ever reads it.
//! - [`HistoryEvent`] is the semantic record returned to clients, where a
//!   scheduling row and its completion row have been merged into one entry.
//!
//! ## Correlation Columns
//!
//! - `event_id` identifies a scheduling row (`TaskScheduled`,
//!   `SubOrchestrationInstanceCreated`) within its instance.
//! - `task_scheduled_id` on a completion row points back at that `event_id`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single row from the history table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RawHistoryEntity {
    /// Owning instance id
    pub partition_key: String,
    pub event_type: String,
    pub name: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub result: Option<String>,
    pub details: Option<String>,
    pub event_id: Option<i32>,
    /// Correlation key of a completion row
    pub task_scheduled_id: Option<i32>,
    /// Child instance id on `SubOrchestrationInstanceCreated` rows
    pub instance_id: Option<String>,
    /// Parent instance recorded on `ExecutionStarted`, when the runtime provides it
    pub parent_instance_id: Option<String>,
}

impl RawHistoryEntity {
    pub fn new(
        partition_key: impl Into<String>,
        event_type: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            partition_key: partition_key.into(),
            event_type: event_type.into(),
            name: None,
            timestamp,
            result: None,
            details: None,
            event_id: None,
            task_scheduled_id: None,
            instance_id: None,
            parent_instance_id: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_event_id(mut self, event_id: i32) -> Self {
        self.event_id = Some(event_id);
        self
    }

    pub fn with_task_scheduled_id(mut self, task_scheduled_id: i32) -> Self {
        self.task_scheduled_id = Some(task_scheduled_id);
        self
    }

    pub fn with_result(mut self, result: impl Into<String>) -> Self {
        self.result = Some(result.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_child_instance(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = Some(instance_id.into());
        self
    }

    pub fn with_parent_instance(mut self, parent_instance_id: impl Into<String>) -> Self {
        self.parent_instance_id = Some(parent_instance_id.into());
        self
    }

    /// Runtime-API style JSON for this row, as returned with inline history
    pub fn to_runtime_json(&self) -> Value {
        let mut map = serde_json::Map::new();
        map.insert("EventType".into(), Value::String(self.event_type.clone()));
        map.insert(
            "Timestamp".into(),
            Value::String(super::format_timestamp(&self.timestamp)),
        );
        if let Some(event_id) = self.event_id {
            map.insert("EventId".into(), Value::from(event_id));
        }
        if let Some(name) = &self.name {
            map.insert("FunctionName".into(), Value::String(name.clone()));
        }
        if let Some(result) = &self.result {
            map.insert("Result".into(), Value::String(result.clone()));
        }
        if let Some(details) = &self.details {
            map.insert("Details".into(), Value::String(details.clone()));
        }
        if let Some(instance_id) = &self.instance_id {
            map.insert("InstanceId".into(), Value::String(instance_id.clone()));
        }
        Value::Object(map)
    }
}

/// One entry of a reconstructed instance timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HistoryEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub event_id: Option<i32>,
    pub name: Option<String>,
    /// Only set on merged pairs and on execution-terminal events
    pub scheduled_time: Option<DateTime<Utc>>,
    pub duration_in_ms: i64,
    pub sub_orchestration_id: Option<String>,
    pub result: Option<String>,
    pub details: Option<String>,
}

impl HistoryEvent {
    /// Copy a raw row without correlation
    pub fn from_raw(raw: &RawHistoryEntity) -> Self {
        Self {
            timestamp: raw.timestamp,
            event_type: raw.event_type.clone(),
            event_id: raw.event_id,
            name: raw.name.clone(),
            scheduled_time: None,
            duration_in_ms: 0,
            sub_orchestration_id: raw.instance_id.clone(),
            result: raw.result.clone(),
            details: raw.details.clone(),
        }
    }

    /// Convert an inline-history element from the orchestration runtime API.
    ///
    /// Returns `None` for elements without a parseable timestamp.
    pub fn from_runtime_json(value: &Value) -> Option<Self> {
        let text = |key: &str| -> Option<String> {
            match value.get(key)? {
                Value::Null => None,
                Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            }
        };
        let time = |key: &str| -> Option<DateTime<Utc>> {
            value
                .get(key)
                .and_then(Value::as_str)
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|t| t.with_timezone(&Utc))
        };

        let timestamp = time("Timestamp")?;
        let scheduled_time = time("ScheduledTime");
        let duration_in_ms = scheduled_time
            .map(|scheduled| (timestamp - scheduled).num_milliseconds())
            .unwrap_or(0);

        Some(Self {
            timestamp,
            event_type: text("EventType").unwrap_or_default(),
            event_id: value
                .get("EventId")
                .and_then(Value::as_i64)
                .and_then(|id| i32::try_from(id).ok()),
            name: text("FunctionName").or_else(|| text("Name")),
            scheduled_time,
            duration_in_ms,
            sub_orchestration_id: text("InstanceId"),
            result: text("Result"),
            details: text("Details"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_history_event_serializes_pascal_case() {
        let event = HistoryEvent::from_raw(
            &RawHistoryEntity::new("inst", "TimerFired", Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
                .with_event_id(3),
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["EventType"], "TimerFired");
        assert_eq!(json["EventId"], 3);
        assert_eq!(json["DurationInMs"], 0);
        assert!(json["ScheduledTime"].is_null());
    }

    #[test]
    fn test_from_runtime_json_computes_duration() {
        let value = json!({
            "EventType": "TaskCompleted",
            "FunctionName": "SayHello",
            "Timestamp": "2024-01-01T00:00:02.500Z",
            "ScheduledTime": "2024-01-01T00:00:01.000Z",
            "Result": "Hello"
        });
        let event = HistoryEvent::from_runtime_json(&value).unwrap();
        assert_eq!(event.name.as_deref(), Some("SayHello"));
        assert_eq!(event.duration_in_ms, 1500);
        assert_eq!(event.result.as_deref(), Some("Hello"));
    }

    #[test]
    fn test_from_runtime_json_requires_timestamp() {
        assert!(HistoryEvent::from_runtime_json(&json!({"EventType": "TimerFired"})).is_none());
    }

    #[test]
    fn test_runtime_json_round_trip_keeps_names() {
        let raw = RawHistoryEntity::new("inst", "TaskScheduled", Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
            .with_name("Activity")
            .with_event_id(0);
        let event = HistoryEvent::from_runtime_json(&raw.to_runtime_json()).unwrap();
        assert_eq!(event.name.as_deref(), Some("Activity"));
        assert_eq!(event.event_id, Some(0));
        assert_eq!(event.timestamp, raw.timestamp);
    }
}
