//! Narrative composition root
//!
//! Builds one event bus and every manager on top of it, wired the way the
//! game expects: triggers see quests, campaign and dialogue; the campaign
//! follows quest lifecycle events.

use serde_json::json;
use tracing::info;

use crate::campaign::CampaignManager;
use crate::config::NarrativeConfig;
use crate::dialogue::DialogueManager;
use crate::event_bus::{EventBus, topics};
use crate::quest::QuestManager;
use crate::storage::{MemoryStorage, Storage};
use crate::trigger::{TriggerServices, TriggerSystem};

#[derive(Clone)]
pub struct Narrative {
    bus: EventBus,
    quests: QuestManager,
    dialogue: DialogueManager,
    campaign: CampaignManager,
    triggers: TriggerSystem,
}

impl Narrative {
    pub fn new(config: &NarrativeConfig, storage: Box<dyn Storage>) -> Self {
        let bus = EventBus::with_max_cascade(config.max_cascade);
        let quests = QuestManager::new(&bus);
        let dialogue = DialogueManager::with_max_hops(&bus, config.max_dialogue_hops);
        let campaign = CampaignManager::with_key(&bus, storage, &config.storage_key);
        let triggers = TriggerSystem::new(
            &bus,
            TriggerServices {
                quests: Some(quests.clone()),
                campaign: Some(campaign.clone()),
                dialogue: Some(dialogue.clone()),
            },
        );

        info!(
            "Narrative ready (storage key '{}', {} variables restored)",
            config.storage_key,
            campaign.variables().len()
        );

        Self {
            bus,
            quests,
            dialogue,
            campaign,
            triggers,
        }
    }

    /// Default config over a fresh in-memory store
    pub fn in_memory() -> Self {
        Self::new(&NarrativeConfig::default(), Box::new(MemoryStorage::new()))
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn quests(&self) -> &QuestManager {
        &self.quests
    }

    pub fn dialogue(&self) -> &DialogueManager {
        &self.dialogue
    }

    pub fn campaign(&self) -> &CampaignManager {
        &self.campaign
    }

    pub fn triggers(&self) -> &TriggerSystem {
        &self.triggers
    }

    /// Emit the per-frame `update` event
    pub fn update(&self, delta_time: f64) {
        self.bus.emit(topics::UPDATE, json!({ "deltaTime": delta_time }));
    }

    /// Drop session progress and zero the campaign. Loaded content stays.
    pub fn new_game(&self) {
        self.dialogue.end_dialogue();
        self.quests.reset();
        self.triggers.reset_all();
        self.campaign.reset();
        info!("New game started");
    }
}
