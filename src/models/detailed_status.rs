//! Detailed view of a single instance, built per request and never persisted.

use serde::Serialize;

use super::entity::{EntityId, EntityType};
use super::history_event::HistoryEvent;
use super::orchestration_status::OrchestrationStatus;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedOrchestrationStatus {
    #[serde(flatten)]
    pub status: OrchestrationStatus,
    pub entity_type: EntityType,
    pub entity_id: Option<EntityId>,
    pub parent_instance_id: Option<String>,
    pub tab_template_names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<HistoryEvent>>,
}

impl DetailedOrchestrationStatus {
    /// Classify the instance; parent, templates and history are filled in by
    /// the aggregator
    pub fn new(mut status: OrchestrationStatus) -> Self {
        let (entity_type, entity_id) = EntityId::detect(&status.instance_id);
        // Inline runtime history is superseded by the reconstructed one
        status.history = None;

        Self {
            status,
            entity_type,
            entity_id,
            parent_instance_id: None,
            tab_template_names: Vec::new(),
            history: None,
        }
    }

    pub fn type_name(&self) -> &str {
        match &self.entity_id {
            Some(id) => &id.name,
            None => &self.status.name,
        }
    }
}
