//! Dialogue Node Structures
//!
//! Nodes are authored in TOML (or built in code) and registered with the
//! [`super::DialogueManager`]. Choices link to other nodes by id.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::event_bus::{EventBus, topics};

/// Application callback run as a dialogue side effect
#[derive(Clone)]
pub struct EffectFn(pub Rc<dyn Fn(&EventBus)>);

impl fmt::Debug for EffectFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EffectFn(..)")
    }
}

/// Side effect attached to a node (`on_start`) or a choice (`action`)
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DialogueEffect {
    /// Raise an arbitrary bus event
    Emit {
        topic: String,
        #[serde(default)]
        data: Value,
    },
    /// Ask the quest manager to accept a catalogue quest
    AcceptQuest { quest_id: String },
    /// Ask the campaign manager to store a global variable
    SetVariable { key: String, value: Value },
    #[serde(skip_deserializing)]
    Callback(EffectFn),
}

impl DialogueEffect {
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(&EventBus) + 'static,
    {
        DialogueEffect::Callback(EffectFn(Rc::new(f)))
    }

    pub fn apply(&self, bus: &EventBus) {
        match self {
            DialogueEffect::Emit { topic, data } => bus.emit(topic, data.clone()),
            DialogueEffect::AcceptQuest { quest_id } => {
                bus.emit(topics::QUEST_ACCEPT, json!({ "questId": quest_id }))
            }
            DialogueEffect::SetVariable { key, value } => bus.emit(
                topics::CAMPAIGN_SET_VARIABLE,
                json!({ "key": key, "value": value }),
            ),
            DialogueEffect::Callback(EffectFn(f)) => f(bus),
        }
    }
}

/// A selectable answer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueChoice {
    pub text: String,
    /// Node to continue with; `None` ends the dialogue
    #[serde(default, alias = "next_id")]
    pub next_id: Option<String>,
    /// Runs before branching
    #[serde(default, skip_serializing)]
    pub action: Option<DialogueEffect>,
}

impl DialogueChoice {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            next_id: None,
            action: None,
        }
    }

    pub fn goto(mut self, next_id: &str) -> Self {
        self.next_id = Some(next_id.to_string());
        self
    }

    pub fn with_action(mut self, action: DialogueEffect) -> Self {
        self.action = Some(action);
        self
    }
}

/// One line of dialogue and the answers it offers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueNode {
    pub id: String,
    pub speaker: String,
    pub text: String,
    #[serde(default)]
    pub choices: Vec<DialogueChoice>,
    #[serde(default, alias = "on_start", skip_serializing)]
    pub on_start: Option<DialogueEffect>,
}

impl DialogueNode {
    pub fn new(id: &str, speaker: &str, text: &str) -> Self {
        Self {
            id: id.to_string(),
            speaker: speaker.to_string(),
            text: text.to_string(),
            choices: Vec::new(),
            on_start: None,
        }
    }

    pub fn choice(mut self, choice: DialogueChoice) -> Self {
        self.choices.push(choice);
        self
    }

    pub fn on_start(mut self, effect: DialogueEffect) -> Self {
        self.on_start = Some(effect);
        self
    }

    /// JSON payload carried by `dialogue:started` / `dialogue:ended`
    pub fn to_payload(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// TOML file holding `[[node]]` entries
#[derive(Debug, Clone, Deserialize)]
pub struct RawDialogueFile {
    #[serde(rename = "node", default)]
    pub nodes: Vec<DialogueNode>,
}
