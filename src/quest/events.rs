//! Quest Event Types
//!
//! Gameplay events that can advance quest objectives, parsed from the JSON
//! payloads raised on the event bus.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::event_bus::topics;

/// Events that can trigger quest progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestEvent {
    /// Something died
    EntityDeath {
        /// Entity type (e.g., "orc", "slime"), absent for untyped deaths
        entity_type: Option<String>,
    },

    /// A resource was picked up
    ResourceCollected {
        /// Resource type (e.g., "wood", "iron_ore")
        resource_type: String,
        /// Quantity collected
        amount: u32,
    },

    /// The player reached an area
    AreaReached {
        /// Area identifier, absent when the emitter did not name one
        area_id: Option<String>,
    },
}

impl QuestEvent {
    /// Parse a bus event into a quest event. Returns `None` for topics that
    /// cannot advance objectives and for malformed payloads.
    pub fn from_topic(topic: &str, data: &Value) -> Option<Self> {
        match topic {
            topics::ENTITY_DEATH => Some(QuestEvent::EntityDeath {
                entity_type: string_field(data, "entityType"),
            }),
            topics::RESOURCE_COLLECTED => {
                let resource_type = string_field(data, "resourceType")?;
                let amount = match data.get("amount") {
                    None | Some(Value::Null) => 1,
                    Some(v) => amount_value(v)?,
                };
                Some(QuestEvent::ResourceCollected {
                    resource_type,
                    amount,
                })
            }
            topics::AREA_REACHED => Some(QuestEvent::AreaReached {
                area_id: string_field(data, "areaId"),
            }),
            _ => None,
        }
    }

    /// Bus topic this event travels on
    pub fn topic(&self) -> &'static str {
        match self {
            QuestEvent::EntityDeath { .. } => topics::ENTITY_DEATH,
            QuestEvent::ResourceCollected { .. } => topics::RESOURCE_COLLECTED,
            QuestEvent::AreaReached { .. } => topics::AREA_REACHED,
        }
    }

    /// JSON payload as emitted on the bus
    pub fn to_payload(&self) -> Value {
        match self {
            QuestEvent::EntityDeath { entity_type } => json!({ "entityType": entity_type }),
            QuestEvent::ResourceCollected {
                resource_type,
                amount,
            } => json!({ "resourceType": resource_type, "amount": amount }),
            QuestEvent::AreaReached { area_id } => json!({ "areaId": area_id }),
        }
    }
}

// Whole non-negative numbers, including `2.0` from float-only emitters
fn amount_value(v: &Value) -> Option<u32> {
    if let Some(n) = v.as_u64() {
        return u32::try_from(n).ok();
    }
    let f = v.as_f64()?;
    if f < 0.0 || f.fract() != 0.0 || f > u32::MAX as f64 {
        return None;
    }
    Some(f as u32)
}

fn string_field(data: &Value, key: &str) -> Option<String> {
    data.get(key).and_then(Value::as_str).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entity_death() {
        let event = QuestEvent::from_topic("entity:death", &json!({ "entityType": "orc" }));
        assert_eq!(
            event,
            Some(QuestEvent::EntityDeath {
                entity_type: Some("orc".to_string())
            })
        );

        let untyped = QuestEvent::from_topic("entity:death", &json!({}));
        assert_eq!(untyped, Some(QuestEvent::EntityDeath { entity_type: None }));
    }

    #[test]
    fn test_parse_resource_collected() {
        let event = QuestEvent::from_topic(
            "resource:collected",
            &json!({ "resourceType": "wood", "amount": 5 }),
        );
        assert_eq!(
            event,
            Some(QuestEvent::ResourceCollected {
                resource_type: "wood".to_string(),
                amount: 5
            })
        );

        // Missing amount counts as one
        let single = QuestEvent::from_topic("resource:collected", &json!({ "resourceType": "wood" }));
        assert!(matches!(single, Some(QuestEvent::ResourceCollected { amount: 1, .. })));
    }

    #[test]
    fn test_malformed_payloads_are_rejected() {
        assert_eq!(QuestEvent::from_topic("resource:collected", &json!({ "amount": 2 })), None);
        assert_eq!(
            QuestEvent::from_topic("resource:collected", &json!({ "resourceType": "wood", "amount": -3 })),
            None
        );
        assert_eq!(
            QuestEvent::from_topic("resource:collected", &json!({ "resourceType": "wood", "amount": 1.5 })),
            None
        );
        assert_eq!(QuestEvent::from_topic("update", &json!({ "deltaTime": 0.016 })), None);
    }

    #[test]
    fn test_whole_float_amount_counts() {
        let event = QuestEvent::from_topic(
            "resource:collected",
            &json!({ "resourceType": "wood", "amount": 2.0 }),
        );
        assert!(matches!(event, Some(QuestEvent::ResourceCollected { amount: 2, .. })));

        let negative = QuestEvent::from_topic(
            "resource:collected",
            &json!({ "resourceType": "wood", "amount": -2.0 }),
        );
        assert_eq!(negative, None);
    }

    #[test]
    fn test_payload_matches_topic_parser() {
        let event = QuestEvent::AreaReached {
            area_id: Some("old_mill".to_string()),
        };
        assert_eq!(QuestEvent::from_topic(event.topic(), &event.to_payload()), Some(event));
    }
}
