//! Narrative runtime for the isometric game: quests, dialogue, triggers and
//! campaign progress, all talking through one [`EventBus`].

pub mod campaign;
pub mod config;
pub mod content;
pub mod dialogue;
pub mod error;
pub mod event_bus;
pub mod narrative;
pub mod quest;
pub mod storage;
pub mod trigger;

pub use campaign::{CampaignManager, CampaignState};
pub use config::NarrativeConfig;
pub use content::{ContentLoader, LoadReport};
pub use dialogue::{DialogueChoice, DialogueEffect, DialogueManager, DialogueNode, DialogueView};
pub use error::{ContentError, NarrativeError, StorageError};
pub use event_bus::{EventBus, ListenerId, topics};
pub use narrative::Narrative;
pub use quest::{Objective, Quest, QuestManager, QuestStatus};
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use trigger::{Trigger, TriggerAction, TriggerCondition, TriggerSystem};
