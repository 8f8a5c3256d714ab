//! Trigger actions

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use super::TriggerContext;
use crate::event_bus::topics;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriggerAction {
    /// Diagnostic only
    Log { message: String },
    Emit {
        topic: String,
        #[serde(default)]
        data: Value,
    },
    SetVariable { key: String, value: Value },
    AcceptQuest { quest_id: String },
    FailQuest { quest_id: String, reason: String },
    StartDialogue { dialogue_id: String },
    CompleteScenario { scenario_id: String },
}

impl TriggerAction {
    pub fn log(message: &str) -> Self {
        TriggerAction::Log {
            message: message.to_string(),
        }
    }

    pub fn execute(&self, ctx: &TriggerContext<'_>) {
        match self {
            TriggerAction::Log { message } => {
                info!("[trigger {}] {} (on {})", ctx.trigger_id, message, ctx.event_type);
            }
            TriggerAction::Emit { topic, data } => ctx.bus.emit(topic, data.clone()),
            TriggerAction::SetVariable { key, value } => match ctx.services.campaign.as_ref() {
                Some(campaign) => campaign.set_variable(key, value.clone()),
                None => ctx.bus.emit(
                    topics::CAMPAIGN_SET_VARIABLE,
                    json!({ "key": key, "value": value }),
                ),
            },
            TriggerAction::AcceptQuest { quest_id } => match ctx.services.quests.as_ref() {
                Some(quests) => {
                    quests.accept_from_catalogue(quest_id);
                }
                None => ctx
                    .bus
                    .emit(topics::QUEST_ACCEPT, json!({ "questId": quest_id })),
            },
            TriggerAction::FailQuest { quest_id, reason } => match ctx.services.quests.as_ref() {
                Some(quests) => {
                    quests.fail_quest(quest_id, reason);
                }
                None => warn!(
                    "Trigger '{}' cannot fail quest '{}' without a quest manager",
                    ctx.trigger_id, quest_id
                ),
            },
            TriggerAction::StartDialogue { dialogue_id } => match ctx.services.dialogue.as_ref() {
                Some(dialogue) => {
                    dialogue.start_dialogue(dialogue_id);
                }
                None => warn!(
                    "Trigger '{}' cannot start dialogue '{}' without a dialogue manager",
                    ctx.trigger_id, dialogue_id
                ),
            },
            TriggerAction::CompleteScenario { scenario_id } => match ctx.services.campaign.as_ref() {
                Some(campaign) => campaign.complete_scenario(scenario_id),
                None => warn!(
                    "Trigger '{}' cannot complete scenario '{}' without a campaign manager",
                    ctx.trigger_id, scenario_id
                ),
            },
        }
    }
}
