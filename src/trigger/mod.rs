//! Condition/action triggers
//!
//! Triggers are content: authored lists of [`TriggerCondition`]s and
//! [`TriggerAction`]s evaluated by the [`TriggerSystem`] against watched bus
//! events.

pub mod action;
pub mod condition;
pub mod rule;
pub mod system;

pub use action::TriggerAction;
pub use condition::TriggerCondition;
pub use rule::{RawTriggerFile, Trigger};
pub use system::TriggerSystem;

use serde_json::Value;

use crate::campaign::CampaignManager;
use crate::dialogue::DialogueManager;
use crate::event_bus::EventBus;
use crate::quest::QuestManager;

/// Managers that conditions read and actions drive. Any of them may be absent;
/// conditions that need a missing manager evaluate to false.
#[derive(Clone, Default)]
pub struct TriggerServices {
    pub quests: Option<QuestManager>,
    pub campaign: Option<CampaignManager>,
    pub dialogue: Option<DialogueManager>,
}

/// What a trigger sees while being evaluated
pub struct TriggerContext<'a> {
    pub trigger_id: &'a str,
    /// Topic of the event being evaluated (`update`, `quest:completed`, ...)
    pub event_type: &'a str,
    pub data: &'a Value,
    pub bus: &'a EventBus,
    pub services: &'a TriggerServices,
}

impl<'a> TriggerContext<'a> {
    pub fn new(
        trigger_id: &'a str,
        event_type: &'a str,
        data: &'a Value,
        bus: &'a EventBus,
        services: &'a TriggerServices,
    ) -> Self {
        Self {
            trigger_id,
            event_type,
            data,
            bus,
            services,
        }
    }

    /// Event payload merged with its `type`, the shape gameplay scripts expect
    pub fn payload(&self) -> Value {
        let mut merged = serde_json::Map::new();
        merged.insert("type".to_string(), Value::String(self.event_type.to_string()));
        if let Value::Object(fields) = self.data {
            for (k, v) in fields {
                merged.insert(k.clone(), v.clone());
            }
        }
        Value::Object(merged)
    }
}
