//! # Monitoring Data Model
//!
//! - [`history_event`] - raw history rows and reconstructed timeline entries
//! - [`orchestration_status`] - base status record from the backend
//! - [`entity`] - Durable Entity detection
//! - [`expanded_status`] - list view record and hidden-column handling
//! - [`detailed_status`] - single-instance detail record

pub mod detailed_status;
pub mod entity;
pub mod expanded_status;
pub mod history_event;
pub mod orchestration_status;

pub use detailed_status::DetailedOrchestrationStatus;
pub use entity::{EntityId, EntityType};
pub use expanded_status::{ExpandedOrchestrationStatus, HiddenColumns};
pub use history_event::{HistoryEvent, RawHistoryEntity};
pub use orchestration_status::OrchestrationStatus;

use chrono::{DateTime, SecondsFormat, Utc};

/// ISO 8601 UTC with millisecond precision, the format used in filters and JSON
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}
