//! # System Constants
//!
//! Runtime statuses, history event type names and the operational limits of
//! the monitoring engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Synthetic runtime status used by clients to ask for Durable Entities.
///
/// The backend reports entities as `Running`, so this status never reaches it.
pub const DURABLE_ENTITIES_STATUS: &str = "DurableEntities";

/// Backend page size used when enumerating instances.
pub const DEFAULT_INSTANCE_PAGE_SIZE: usize = 500;

/// Window around an instance's creation time searched for its parent.
pub const PARENT_SEARCH_WINDOW: Duration = Duration::from_secs(5);

/// Hard limit for the parent-instance table scan.
pub const PARENT_SEARCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Name reported for the default storage connection.
pub const DEFAULT_CONNECTION_NAME: &str = "default";

/// Table name suffixes that mark a task hub in storage.
pub const INSTANCES_TABLE_SUFFIX: &str = "Instances";
pub const HISTORY_TABLE_SUFFIX: &str = "History";

/// Field name that triggers the per-instance last-event expansion.
pub const LAST_EVENT_FIELD: &str = "lastEvent";

/// History event type names as written by the orchestration runtime
pub mod event_types {
    pub const EXECUTION_STARTED: &str = "ExecutionStarted";
    pub const EXECUTION_COMPLETED: &str = "ExecutionCompleted";
    pub const EXECUTION_FAILED: &str = "ExecutionFailed";
    pub const EXECUTION_TERMINATED: &str = "ExecutionTerminated";
    pub const TASK_SCHEDULED: &str = "TaskScheduled";
    pub const TASK_COMPLETED: &str = "TaskCompleted";
    pub const TASK_FAILED: &str = "TaskFailed";
    pub const SUB_ORCHESTRATION_CREATED: &str = "SubOrchestrationInstanceCreated";
    pub const SUB_ORCHESTRATION_COMPLETED: &str = "SubOrchestrationInstanceCompleted";
    pub const SUB_ORCHESTRATION_FAILED: &str = "SubOrchestrationInstanceFailed";
    pub const CONTINUE_AS_NEW: &str = "ContinueAsNew";
    pub const TIMER_CREATED: &str = "TimerCreated";
    pub const TIMER_FIRED: &str = "TimerFired";
    pub const EVENT_RAISED: &str = "EventRaised";
    pub const EVENT_SENT: &str = "EventSent";
    pub const GENERIC_EVENT: &str = "GenericEvent";
    pub const ORCHESTRATOR_STARTED: &str = "OrchestratorStarted";
    pub const ORCHESTRATOR_COMPLETED: &str = "OrchestratorCompleted";
}

/// Orchestration runtime status as reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RuntimeStatus {
    Running,
    Completed,
    ContinuedAsNew,
    Failed,
    Canceled,
    Terminated,
    Pending,
    Unknown,
}

impl RuntimeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuntimeStatus::Running => "Running",
            RuntimeStatus::Completed => "Completed",
            RuntimeStatus::ContinuedAsNew => "ContinuedAsNew",
            RuntimeStatus::Failed => "Failed",
            RuntimeStatus::Canceled => "Canceled",
            RuntimeStatus::Terminated => "Terminated",
            RuntimeStatus::Pending => "Pending",
            RuntimeStatus::Unknown => "Unknown",
        }
    }

    /// Whether the instance is still accumulating run time
    pub fn is_active(&self) -> bool {
        matches!(self, RuntimeStatus::Running | RuntimeStatus::Pending)
    }
}

impl fmt::Display for RuntimeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuntimeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "running" => Ok(RuntimeStatus::Running),
            "completed" => Ok(RuntimeStatus::Completed),
            "continuedasnew" => Ok(RuntimeStatus::ContinuedAsNew),
            "failed" => Ok(RuntimeStatus::Failed),
            "canceled" => Ok(RuntimeStatus::Canceled),
            "terminated" => Ok(RuntimeStatus::Terminated),
            "pending" => Ok(RuntimeStatus::Pending),
            "unknown" => Ok(RuntimeStatus::Unknown),
            other => Err(format!("Unknown runtime status: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_status_parsing_is_case_insensitive() {
        assert_eq!("failed".parse::<RuntimeStatus>(), Ok(RuntimeStatus::Failed));
        assert_eq!(
            " ContinuedAsNew ".parse::<RuntimeStatus>(),
            Ok(RuntimeStatus::ContinuedAsNew)
        );
        assert!("DurableEntities".parse::<RuntimeStatus>().is_err());
    }

    #[test]
    fn test_runtime_status_serializes_as_pascal_case() {
        let json = serde_json::to_string(&RuntimeStatus::ContinuedAsNew).unwrap();
        assert_eq!(json, "\"ContinuedAsNew\"");
        assert!(RuntimeStatus::Pending.is_active());
        assert!(!RuntimeStatus::Terminated.is_active());
    }
}
