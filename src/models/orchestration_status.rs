//! Base orchestration status record as returned by the storage backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::RuntimeStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrationStatus {
    pub name: String,
    pub instance_id: String,
    pub created_time: DateTime<Utc>,
    pub last_updated_time: DateTime<Utc>,
    pub runtime_status: RuntimeStatus,
    pub input: Option<Value>,
    pub output: Option<Value>,
    pub custom_status: Option<Value>,
    /// Inline runtime-API history, only present when explicitly requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<Value>>,
}

impl OrchestrationStatus {
    pub fn new(
        name: impl Into<String>,
        instance_id: impl Into<String>,
        created_time: DateTime<Utc>,
        runtime_status: RuntimeStatus,
    ) -> Self {
        Self {
            name: name.into(),
            instance_id: instance_id.into(),
            created_time,
            last_updated_time: created_time,
            runtime_status,
            input: None,
            output: None,
            custom_status: None,
            history: None,
        }
    }

    /// Run time in milliseconds; active instances are measured against `now`
    pub fn duration_ms(&self, now: DateTime<Utc>) -> i64 {
        let end = if self.runtime_status.is_active() {
            now
        } else {
            self.last_updated_time
        };
        (end - self.created_time).num_milliseconds()
    }

    /// Name (or function name) of the last inline history event, falling back
    /// to its event type
    pub fn last_event_name(&self) -> Option<String> {
        let last = self.history.as_ref()?.last()?;
        ["Name", "FunctionName", "EventType"]
            .iter()
            .find_map(|key| last.get(*key).and_then(Value::as_str))
            .map(String::from)
    }
}
