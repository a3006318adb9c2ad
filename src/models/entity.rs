//! Durable Entity detection from the reserved `@name@key` instance id form.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static ENTITY_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@([^@]+)@(.+)$").expect("entity id pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Orchestration,
    DurableEntity,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Orchestration => "Orchestration",
            EntityType::DurableEntity => "DurableEntity",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityId {
    pub name: String,
    pub key: String,
}

impl EntityId {
    /// Classify an instance id. Entities come back with their parsed id.
    pub fn detect(instance_id: &str) -> (EntityType, Option<EntityId>) {
        match ENTITY_ID_REGEX.captures(instance_id) {
            Some(caps) => (
                EntityType::DurableEntity,
                Some(EntityId {
                    name: caps[1].to_string(),
                    key: caps[2].to_string(),
                }),
            ),
            None => (EntityType::Orchestration, None),
        }
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "@{}@{}", self.name, self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_entities() {
        let (kind, id) = EntityId::detect("@counter@my-key");
        assert_eq!(kind, EntityType::DurableEntity);
        let id = id.unwrap();
        assert_eq!(id.name, "counter");
        assert_eq!(id.key, "my-key");
        assert_eq!(id.to_string(), "@counter@my-key");
    }

    #[test]
    fn test_key_may_contain_at_sign() {
        let (_, id) = EntityId::detect("@mailbox@user@example.com");
        assert_eq!(id.unwrap().key, "user@example.com");
    }

    #[test]
    fn test_regular_instances_are_orchestrations() {
        assert_eq!(EntityId::detect("abc123").0, EntityType::Orchestration);
        assert_eq!(EntityId::detect("@only-name").0, EntityType::Orchestration);
        assert_eq!(EntityId::detect("x@counter@key").0, EntityType::Orchestration);
    }
}
