//! # Field Registry
//!
//! Name-addressed access to record fields for filtering and ordering.
//!
//! Each record type registers typed accessor functions under its JSON field
//! names once, at first use. Lookups are case-insensitive; an unknown name
//! yields `None`, which the filter treats as "matches nothing" and the
//! ordering treats as a no-op.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::models::{format_timestamp, ExpandedOrchestrationStatus, HistoryEvent};

/// Field value as seen by filters and sorts
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Text(String),
    Integer(i64),
    Timestamp(DateTime<Utc>),
    /// Non-primitive values; compared by their string representation
    Json(Value),
}

impl FieldValue {
    /// String form used by filter predicates
    pub fn as_filter_string(&self) -> String {
        match self {
            FieldValue::Null => String::new(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Integer(i) => i.to_string(),
            FieldValue::Timestamp(t) => format_timestamp(t),
            FieldValue::Json(Value::String(s)) => s.clone(),
            FieldValue::Json(v) => v.to_string(),
        }
    }

    /// Total order used by `$orderby`; nulls sort first
    pub fn sort_cmp(&self, other: &FieldValue) -> Ordering {
        match (self, other) {
            (FieldValue::Null, FieldValue::Null) => Ordering::Equal,
            (FieldValue::Null, _) => Ordering::Less,
            (_, FieldValue::Null) => Ordering::Greater,
            (FieldValue::Integer(a), FieldValue::Integer(b)) => a.cmp(b),
            (FieldValue::Timestamp(a), FieldValue::Timestamp(b)) => a.cmp(b),
            (FieldValue::Text(a), FieldValue::Text(b)) => a.cmp(b),
            (a, b) => a.as_filter_string().cmp(&b.as_filter_string()),
        }
    }

    fn text(value: Option<&str>) -> Self {
        value.map_or(FieldValue::Null, |s| FieldValue::Text(s.to_string()))
    }

    fn json(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => FieldValue::Null,
            Some(v) => FieldValue::Json(v.clone()),
        }
    }
}

pub type FieldAccessor<T> = fn(&T) -> FieldValue;

/// Case-insensitive map of field names to accessors for one record type
pub struct FieldRegistry<T> {
    accessors: HashMap<String, FieldAccessor<T>>,
}

impl<T> FieldRegistry<T> {
    pub fn new(entries: &[(&str, FieldAccessor<T>)]) -> Self {
        Self {
            accessors: entries
                .iter()
                .map(|(name, accessor)| (name.to_ascii_lowercase(), *accessor))
                .collect(),
        }
    }

    pub fn accessor(&self, field_name: &str) -> Option<FieldAccessor<T>> {
        self.accessors.get(&field_name.to_ascii_lowercase()).copied()
    }

    pub fn contains(&self, field_name: &str) -> bool {
        self.accessor(field_name).is_some()
    }
}

/// Records addressable by field name
pub trait FieldAccess: Sized + 'static {
    fn field_registry() -> &'static FieldRegistry<Self>;

    fn field(&self, field_name: &str) -> Option<FieldValue> {
        Self::field_registry()
            .accessor(field_name)
            .map(|accessor| accessor(self))
    }
}

static EXPANDED_STATUS_FIELDS: LazyLock<FieldRegistry<ExpandedOrchestrationStatus>> =
    LazyLock::new(|| {
        FieldRegistry::<ExpandedOrchestrationStatus>::new(&[
            ("name", |s| FieldValue::Text(s.name.clone())),
            ("instanceId", |s| FieldValue::Text(s.instance_id.clone())),
            ("createdTime", |s| FieldValue::Timestamp(s.created_time)),
            ("lastUpdatedTime", |s| FieldValue::Timestamp(s.last_updated_time)),
            ("runtimeStatus", |s| {
                FieldValue::Text(s.runtime_status.as_str().to_string())
            }),
            ("input", |s| FieldValue::json(s.input.as_ref())),
            ("output", |s| FieldValue::json(s.output.as_ref())),
            ("customStatus", |s| FieldValue::json(s.custom_status.as_ref())),
            ("duration", |s| FieldValue::Integer(s.duration)),
            ("entityType", |s| FieldValue::Text(s.entity_type.as_str().to_string())),
            ("entityId", |s| {
                FieldValue::text(s.entity_id.as_ref().map(|id| id.to_string()).as_deref())
            }),
            ("lastEvent", |s| FieldValue::text(s.last_event.as_deref())),
            ("parentInstanceId", |s| FieldValue::Text(s.parent_instance_id())),
        ])
    });

impl FieldAccess for ExpandedOrchestrationStatus {
    fn field_registry() -> &'static FieldRegistry<Self> {
        &EXPANDED_STATUS_FIELDS
    }
}

static HISTORY_EVENT_FIELDS: LazyLock<FieldRegistry<HistoryEvent>> = LazyLock::new(|| {
    FieldRegistry::<HistoryEvent>::new(&[
        ("timestamp", |e| FieldValue::Timestamp(e.timestamp)),
        ("eventType", |e| FieldValue::Text(e.event_type.clone())),
        ("eventId", |e| e.event_id.map_or(FieldValue::Null, |id| FieldValue::Integer(id.into()))),
        ("name", |e| FieldValue::text(e.name.as_deref())),
        ("scheduledTime", |e| {
            e.scheduled_time.map_or(FieldValue::Null, FieldValue::Timestamp)
        }),
        ("durationInMs", |e| FieldValue::Integer(e.duration_in_ms)),
        ("subOrchestrationId", |e| FieldValue::text(e.sub_orchestration_id.as_deref())),
        ("result", |e| FieldValue::text(e.result.as_deref())),
        ("details", |e| FieldValue::text(e.details.as_deref())),
    ])
});

impl FieldAccess for HistoryEvent {
    fn field_registry() -> &'static FieldRegistry<Self> {
        &HISTORY_EVENT_FIELDS
    }
}
