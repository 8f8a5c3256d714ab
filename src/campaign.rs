//! Campaign Manager
//!
//! Durable cross-scenario progress: global variables, completed scenarios and
//! the quests currently running. Every mutation is written through the
//! [`Storage`] port straight away. Storage failures are logged and the
//! in-memory state stays authoritative for the session.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, error, info, warn};

use crate::event_bus::{EventBus, topics};
use crate::storage::Storage;

/// Storage key used when none is configured
pub const DEFAULT_STORAGE_KEY: &str = "campaign_data";

/// Persisted campaign progress
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CampaignState {
    pub last_scenario_id: String,
    pub completed_scenarios: Vec<String>,
    pub global_variables: BTreeMap<String, Value>,
    pub current_quest_ids: Vec<String>,
}

impl CampaignState {
    /// Variable recorded automatically when a quest completes
    pub fn quest_completed_key(quest_id: &str) -> String {
        format!("quest_{quest_id}_completed")
    }
}

struct Inner {
    bus: EventBus,
    storage: Box<dyn Storage>,
    storage_key: String,
    state: RefCell<CampaignState>,
}

/// Shared handle to the campaign manager
#[derive(Clone)]
pub struct CampaignManager {
    inner: Rc<Inner>,
}

impl CampaignManager {
    pub fn new(bus: &EventBus, storage: impl Storage + 'static) -> Self {
        Self::with_key(bus, Box::new(storage), DEFAULT_STORAGE_KEY)
    }

    /// Load state from `storage` under `storage_key` and start listening for
    /// quest lifecycle events.
    pub fn with_key(bus: &EventBus, storage: Box<dyn Storage>, storage_key: &str) -> Self {
        let manager = Self {
            inner: Rc::new(Inner {
                bus: bus.clone(),
                storage,
                storage_key: storage_key.to_string(),
                state: RefCell::new(CampaignState::default()),
            }),
        };
        manager.load();

        manager.listen(bus, topics::QUEST_STARTED, |campaign, data| {
            if let Some(quest_id) = quest_id(data) {
                campaign.track_quest(quest_id);
            }
        });
        manager.listen(bus, topics::QUEST_COMPLETED, |campaign, data| {
            if let Some(quest_id) = quest_id(data) {
                campaign.record_quest_completed(quest_id);
            }
        });
        manager.listen(bus, topics::QUEST_FAILED, |campaign, data| {
            if let Some(quest_id) = quest_id(data) {
                campaign.untrack_quest(quest_id);
            }
        });
        manager.listen(bus, topics::CAMPAIGN_SET_VARIABLE, |campaign, data| {
            match data.get("key").and_then(Value::as_str) {
                Some(key) => {
                    let value = data.get("value").cloned().unwrap_or(Value::Null);
                    campaign.set_variable(key, value);
                }
                None => warn!("campaign:set_variable without a key: {}", data),
            }
        });

        manager
    }

    fn listen(&self, bus: &EventBus, topic: &str, f: fn(&CampaignManager, &Value)) {
        let weak: Weak<Inner> = Rc::downgrade(&self.inner);
        bus.on(topic, move |data| {
            if let Some(inner) = weak.upgrade() {
                f(&CampaignManager { inner }, data);
            }
        });
    }

    /// Store a global variable
    pub fn set_variable(&self, key: &str, value: Value) {
        self.inner
            .state
            .borrow_mut()
            .global_variables
            .insert(key.to_string(), value.clone());
        self.save();
        self.inner.bus.emit(
            topics::CAMPAIGN_VARIABLE_CHANGED,
            json!({ "key": key, "value": value }),
        );
    }

    pub fn get_variable(&self, key: &str) -> Option<Value> {
        self.inner.state.borrow().global_variables.get(key).cloned()
    }

    pub fn get_variable_or(&self, key: &str, default: Value) -> Value {
        self.get_variable(key).unwrap_or(default)
    }

    /// Record a finished scenario. Completing the same scenario twice keeps a
    /// single entry but still updates `last_scenario_id`.
    pub fn complete_scenario(&self, scenario_id: &str) {
        {
            let mut state = self.inner.state.borrow_mut();
            if !state.completed_scenarios.iter().any(|s| s == scenario_id) {
                state.completed_scenarios.push(scenario_id.to_string());
            }
            state.last_scenario_id = scenario_id.to_string();
        }
        info!("Scenario completed: {}", scenario_id);
        self.save();
        self.inner.bus.emit(
            topics::CAMPAIGN_SCENARIO_COMPLETED,
            json!({ "scenarioId": scenario_id }),
        );
    }

    pub fn is_scenario_completed(&self, scenario_id: &str) -> bool {
        self.inner
            .state
            .borrow()
            .completed_scenarios
            .iter()
            .any(|s| s == scenario_id)
    }

    /// Start a new game: zero state, persisted
    pub fn reset(&self) {
        *self.inner.state.borrow_mut() = CampaignState::default();
        info!("Campaign reset");
        self.save();
        self.inner.bus.emit(topics::CAMPAIGN_RESET, json!({}));
    }

    /// Write the current state to storage. Returns false (and logs) on failure.
    pub fn save(&self) -> bool {
        let serialized = serde_json::to_string(&*self.inner.state.borrow());
        let json = match serialized {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize campaign state: {}", e);
                return false;
            }
        };

        match self.inner.storage.set_item(&self.inner.storage_key, &json) {
            Ok(()) => {
                debug!("Campaign saved under '{}'", self.inner.storage_key);
                true
            }
            Err(e) => {
                error!("Failed to save campaign: {}", e);
                false
            }
        }
    }

    /// Reload state from storage. A missing save or malformed data yields the
    /// zero state; a storage failure keeps the current in-memory state.
    pub fn load(&self) -> bool {
        let raw = match self.inner.storage.get_item(&self.inner.storage_key) {
            Ok(raw) => raw,
            Err(e) => {
                error!("Failed to load campaign: {}", e);
                return false;
            }
        };

        let state = match raw {
            None => {
                info!("No campaign save under '{}', starting fresh", self.inner.storage_key);
                CampaignState::default()
            }
            Some(json) => match serde_json::from_str::<CampaignState>(&json) {
                Ok(state) => {
                    info!(
                        "Loaded campaign: {} scenarios, {} variables",
                        state.completed_scenarios.len(),
                        state.global_variables.len()
                    );
                    state
                }
                Err(e) => {
                    error!("Malformed campaign save, starting fresh: {}", e);
                    *self.inner.state.borrow_mut() = CampaignState::default();
                    return false;
                }
            },
        };

        *self.inner.state.borrow_mut() = state;
        true
    }

    pub fn state(&self) -> CampaignState {
        self.inner.state.borrow().clone()
    }

    pub fn variables(&self) -> BTreeMap<String, Value> {
        self.inner.state.borrow().global_variables.clone()
    }

    pub fn current_quest_ids(&self) -> Vec<String> {
        self.inner.state.borrow().current_quest_ids.clone()
    }

    fn track_quest(&self, quest_id: &str) {
        {
            let mut state = self.inner.state.borrow_mut();
            if state.current_quest_ids.iter().any(|id| id == quest_id) {
                return;
            }
            state.current_quest_ids.push(quest_id.to_string());
        }
        self.save();
    }

    fn untrack_quest(&self, quest_id: &str) {
        {
            let mut state = self.inner.state.borrow_mut();
            let before = state.current_quest_ids.len();
            state.current_quest_ids.retain(|id| id != quest_id);
            if state.current_quest_ids.len() == before {
                return;
            }
        }
        self.save();
    }

    fn record_quest_completed(&self, quest_id: &str) {
        self.inner
            .state
            .borrow_mut()
            .current_quest_ids
            .retain(|id| id != quest_id);
        self.set_variable(&CampaignState::quest_completed_key(quest_id), Value::Bool(true));
    }
}

fn quest_id(data: &Value) -> Option<&str> {
    let id = data.get("questId").and_then(Value::as_str);
    if id.is_none() {
        warn!("Quest event without a questId: {}", data);
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn recorder(bus: &EventBus, topic: &str) -> Rc<RefCell<Vec<Value>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        bus.on(topic, move |data| sink.borrow_mut().push(data.clone()));
        seen
    }

    #[test]
    fn test_variable_survives_reload() {
        let storage = MemoryStorage::new();
        let bus = EventBus::new();
        let changed = recorder(&bus, topics::CAMPAIGN_VARIABLE_CHANGED);

        let campaign = CampaignManager::new(&bus, storage.clone());
        campaign.set_variable("gold", json!(120));
        assert_eq!(*changed.borrow(), vec![json!({ "key": "gold", "value": 120 })]);

        let fresh = CampaignManager::new(&EventBus::new(), storage.clone());
        assert_eq!(fresh.get_variable("gold"), Some(json!(120)));
        assert_eq!(fresh.get_variable_or("missing", json!("none")), json!("none"));
    }

    #[test]
    fn test_complete_scenario_is_idempotent() {
        let bus = EventBus::new();
        let completed = recorder(&bus, topics::CAMPAIGN_SCENARIO_COMPLETED);
        let campaign = CampaignManager::new(&bus, MemoryStorage::new());

        campaign.complete_scenario("act_1");
        campaign.complete_scenario("act_2");
        campaign.complete_scenario("act_1");

        let state = campaign.state();
        assert_eq!(state.completed_scenarios, vec!["act_1", "act_2"]);
        assert_eq!(state.last_scenario_id, "act_1");
        assert!(campaign.is_scenario_completed("act_2"));
        assert_eq!(completed.borrow().len(), 3);
    }

    #[test]
    fn test_saved_json_uses_camel_case() {
        let storage = MemoryStorage::new();
        let campaign = CampaignManager::new(&EventBus::new(), storage.clone());
        campaign.complete_scenario("prologue");

        let saved: Value = serde_json::from_str(&storage.raw(DEFAULT_STORAGE_KEY).unwrap()).unwrap();
        assert_eq!(saved["lastScenarioId"], "prologue");
        assert_eq!(saved["completedScenarios"], json!(["prologue"]));
        assert!(saved["globalVariables"].is_object());
        assert!(saved["currentQuestIds"].is_array());
    }

    #[test]
    fn test_malformed_save_falls_back_to_zero_state() {
        let storage = MemoryStorage::new();
        storage.set_item(DEFAULT_STORAGE_KEY, "{not json").unwrap();

        let campaign = CampaignManager::new(&EventBus::new(), storage);
        assert_eq!(campaign.state(), CampaignState::default());
    }

    #[test]
    fn test_storage_failure_keeps_memory_state() {
        let storage = MemoryStorage::new();
        let campaign = CampaignManager::new(&EventBus::new(), storage.clone());
        campaign.set_variable("a", json!(1));

        storage.set_offline(true);
        campaign.set_variable("b", json!(2));
        assert!(!campaign.save());
        assert!(!campaign.load());
        assert_eq!(campaign.get_variable("b"), Some(json!(2)));

        // The persisted copy diverged until the next successful write
        storage.set_offline(false);
        let reloaded = CampaignManager::new(&EventBus::new(), storage.clone());
        assert_eq!(reloaded.get_variable("b"), None);
        assert!(campaign.save());
        assert!(reloaded.load());
        assert_eq!(reloaded.get_variable("b"), Some(json!(2)));
    }

    #[test]
    fn test_quest_events_are_recorded() {
        let storage = MemoryStorage::new();
        let bus = EventBus::new();
        let campaign = CampaignManager::new(&bus, storage.clone());

        bus.emit(topics::QUEST_STARTED, json!({ "questId": "kill_orcs", "title": "Orc Trouble" }));
        bus.emit(topics::QUEST_STARTED, json!({ "questId": "escort", "title": "Escort" }));
        assert_eq!(campaign.current_quest_ids(), vec!["kill_orcs", "escort"]);

        bus.emit(topics::QUEST_COMPLETED, json!({ "questId": "kill_orcs" }));
        bus.emit(topics::QUEST_FAILED, json!({ "questId": "escort", "reason": "ambush" }));

        assert_eq!(campaign.get_variable("quest_kill_orcs_completed"), Some(json!(true)));
        assert_eq!(campaign.get_variable("quest_escort_completed"), None);
        assert!(campaign.current_quest_ids().is_empty());

        let reloaded = CampaignManager::new(&EventBus::new(), storage);
        assert_eq!(reloaded.get_variable("quest_kill_orcs_completed"), Some(json!(true)));
    }

    #[test]
    fn test_set_variable_over_bus() {
        let bus = EventBus::new();
        let campaign = CampaignManager::new(&bus, MemoryStorage::new());
        bus.emit(topics::CAMPAIGN_SET_VARIABLE, json!({ "key": "met_elder", "value": true }));
        bus.emit(topics::CAMPAIGN_SET_VARIABLE, json!({ "value": 3 }));
        assert_eq!(campaign.variables().len(), 1);
        assert_eq!(campaign.get_variable("met_elder"), Some(json!(true)));
    }

    #[test]
    fn test_reset_persists_zero_state() {
        let storage = MemoryStorage::new();
        let bus = EventBus::new();
        let resets = recorder(&bus, topics::CAMPAIGN_RESET);
        let campaign = CampaignManager::new(&bus, storage.clone());
        campaign.set_variable("gold", json!(5));
        campaign.complete_scenario("act_1");

        campaign.reset();
        assert_eq!(campaign.state(), CampaignState::default());
        assert_eq!(resets.borrow().len(), 1);

        let reloaded = CampaignManager::new(&EventBus::new(), storage);
        assert_eq!(reloaded.state(), CampaignState::default());
    }
}
