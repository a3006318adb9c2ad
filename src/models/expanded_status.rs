//! # Expanded Orchestration Status
//!
//! Lightweight per-instance view used by list endpoints. Adds the computed
//! duration, entity classification, an optional last event and a parent
//! instance id that is resolved in the background.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;

use super::entity::{EntityId, EntityType};
use super::orchestration_status::OrchestrationStatus;
use crate::constants::RuntimeStatus;
use crate::status::BackgroundValue;

/// Column names a client asked to omit, parsed from `a|b|c`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HiddenColumns(HashSet<String>);

impl HiddenColumns {
    pub fn parse(raw: Option<&str>) -> Self {
        Self(
            raw.unwrap_or_default()
                .split('|')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_ascii_lowercase)
                .collect(),
        )
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.0.contains(&column.to_ascii_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for HiddenColumns {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|c| c.as_ref().trim().to_ascii_lowercase())
                .filter(|c| !c.is_empty())
                .collect(),
        )
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandedOrchestrationStatus {
    pub name: String,
    pub instance_id: String,
    pub created_time: DateTime<Utc>,
    pub last_updated_time: DateTime<Utc>,
    pub runtime_status: RuntimeStatus,
    pub input: Option<Value>,
    pub output: Option<Value>,
    pub custom_status: Option<Value>,
    /// Milliseconds
    pub duration: i64,
    pub entity_type: EntityType,
    pub entity_id: Option<EntityId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_event: Option<String>,
    pub parent_instance_id: BackgroundValue,
}

impl ExpandedOrchestrationStatus {
    pub fn new(
        status: OrchestrationStatus,
        hidden_columns: &HiddenColumns,
        parent_instance_id: BackgroundValue,
        now: DateTime<Utc>,
    ) -> Self {
        let duration = status.duration_ms(now);
        let (entity_type, entity_id) = EntityId::detect(&status.instance_id);

        let OrchestrationStatus {
            name,
            instance_id,
            created_time,
            last_updated_time,
            runtime_status,
            input,
            output,
            custom_status,
            ..
        } = status;

        Self {
            name,
            instance_id,
            created_time,
            last_updated_time,
            runtime_status,
            input: input.filter(|_| !hidden_columns.contains("input")),
            output: output.filter(|_| !hidden_columns.contains("output")),
            custom_status: custom_status.filter(|_| !hidden_columns.contains("customStatus")),
            duration,
            entity_type,
            entity_id,
            last_event: None,
            parent_instance_id,
        }
    }

    pub fn is_entity(&self) -> bool {
        self.entity_type == EntityType::DurableEntity
    }

    /// Orchestrator function name, or entity name for entities
    pub fn type_name(&self) -> &str {
        match &self.entity_id {
            Some(id) => &id.name,
            None => &self.name,
        }
    }

    /// Best currently-available parent id; never blocks
    pub fn parent_instance_id(&self) -> String {
        self.parent_instance_id.peek()
    }
}
