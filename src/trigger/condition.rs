//! Trigger conditions
//!
//! Conditions only read state. They never emit events or mutate managers.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::TriggerContext;
use crate::quest::QuestStatus;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriggerCondition {
    /// Holds on every evaluation
    Always,
    /// The event being evaluated is `event`
    EventIs { event: String },
    /// A field of the event payload (or `type`) equals `value`
    PayloadEquals { field: String, value: Value },
    /// A quest known to the quest manager is in `status`
    QuestStatus { quest_id: String, status: QuestStatus },
    /// A campaign variable equals `value`
    VariableEquals { key: String, value: Value },
    ScenarioCompleted { scenario_id: String },
    All { conditions: Vec<TriggerCondition> },
    Any { conditions: Vec<TriggerCondition> },
    Not { condition: Box<TriggerCondition> },
}

impl TriggerCondition {
    pub fn quest_status(quest_id: &str, status: QuestStatus) -> Self {
        TriggerCondition::QuestStatus {
            quest_id: quest_id.to_string(),
            status,
        }
    }

    pub fn event_is(event: &str) -> Self {
        TriggerCondition::EventIs {
            event: event.to_string(),
        }
    }

    pub fn evaluate(&self, ctx: &TriggerContext<'_>) -> bool {
        match self {
            TriggerCondition::Always => true,
            TriggerCondition::EventIs { event } => ctx.event_type == event,
            TriggerCondition::PayloadEquals { field, value } => {
                ctx.payload().get(field) == Some(value)
            }
            TriggerCondition::QuestStatus { quest_id, status } => match ctx.services.quests.as_ref() {
                Some(quests) => quests.quest_status(quest_id) == Some(*status),
                None => {
                    debug!("Trigger '{}' checks quest status without a quest manager", ctx.trigger_id);
                    false
                }
            },
            TriggerCondition::VariableEquals { key, value } => ctx
                .services
                .campaign
                .as_ref()
                .and_then(|campaign| campaign.get_variable(key))
                .is_some_and(|current| current == *value),
            TriggerCondition::ScenarioCompleted { scenario_id } => ctx
                .services
                .campaign
                .as_ref()
                .is_some_and(|campaign| campaign.is_scenario_completed(scenario_id)),
            TriggerCondition::All { conditions } => conditions.iter().all(|c| c.evaluate(ctx)),
            TriggerCondition::Any { conditions } => conditions.iter().any(|c| c.evaluate(ctx)),
            TriggerCondition::Not { condition } => !condition.evaluate(ctx),
        }
    }
}
