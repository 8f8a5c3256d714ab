//! Trigger System
//!
//! Holds every registered trigger and checks them whenever a watched event is
//! emitted (`update` and `quest:completed` by default).

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde_json::{Value, json};
use tracing::{debug, info};

use super::{Trigger, TriggerContext, TriggerServices};
use crate::event_bus::{EventBus, topics};

struct Inner {
    bus: EventBus,
    services: TriggerServices,
    triggers: RefCell<Vec<Trigger>>,
}

/// Shared handle to the trigger system
#[derive(Clone)]
pub struct TriggerSystem {
    inner: Rc<Inner>,
}

impl TriggerSystem {
    pub fn new(bus: &EventBus, services: TriggerServices) -> Self {
        let system = Self {
            inner: Rc::new(Inner {
                bus: bus.clone(),
                services,
                triggers: RefCell::new(Vec::new()),
            }),
        };
        system.watch(topics::UPDATE);
        system.watch(topics::QUEST_COMPLETED);
        system
    }

    /// Also evaluate triggers when `topic` is emitted
    pub fn watch(&self, topic: &str) {
        let weak: Weak<Inner> = Rc::downgrade(&self.inner);
        let event_type = topic.to_string();
        self.inner.bus.on(topic, move |data| {
            if let Some(inner) = weak.upgrade() {
                TriggerSystem { inner }.check_all(&event_type, data);
            }
        });
    }

    /// Append a trigger. Duplicate ids are allowed and evaluated independently.
    pub fn add_trigger(&self, mut trigger: Trigger) {
        trigger.normalize();
        debug!("Registered trigger {}", trigger.id);
        self.inner.triggers.borrow_mut().push(trigger);
    }

    /// Check every trigger against one event. Returns how many fired.
    pub fn check_all(&self, event_type: &str, data: &Value) -> usize {
        let services = &self.inner.services;
        let count = self.inner.triggers.borrow().len();
        let mut fired = 0;

        for slot in 0..count {
            // Evaluate and count under the borrow, run actions outside it so
            // they may touch other managers freely.
            let firing = {
                let mut triggers = self.inner.triggers.borrow_mut();
                let Some(trigger) = triggers.get_mut(slot) else {
                    break;
                };
                let ctx = TriggerContext::new(&trigger.id, event_type, data, &self.inner.bus, services);
                if !trigger.evaluate(&ctx) {
                    continue;
                }
                trigger.record_firing();
                (trigger.id.clone(), trigger.actions.clone(), trigger.repeat_count())
            };

            let (trigger_id, actions, repeat_count) = firing;
            info!("Trigger fired: {} (#{} on {})", trigger_id, repeat_count, event_type);
            let ctx = TriggerContext::new(&trigger_id, event_type, data, &self.inner.bus, services);
            for action in &actions {
                action.execute(&ctx);
            }
            self.inner.bus.emit(
                topics::TRIGGER_FIRED,
                json!({ "triggerId": trigger_id, "repeatCount": repeat_count }),
            );
            fired += 1;
        }

        fired
    }

    /// Snapshot of the first trigger registered under `id`
    pub fn get(&self, id: &str) -> Option<Trigger> {
        self.inner
            .triggers
            .borrow()
            .iter()
            .find(|t| t.id == id)
            .cloned()
    }

    pub fn triggers(&self) -> Vec<Trigger> {
        self.inner.triggers.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.triggers.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Re-arm every trigger (new game)
    pub fn reset_all(&self) {
        for trigger in self.inner.triggers.borrow_mut().iter_mut() {
            trigger.rearm();
        }
    }

    pub fn clear(&self) {
        self.inner.triggers.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quest::{Objective, Quest, QuestManager, QuestStatus};
    use crate::trigger::{TriggerAction, TriggerCondition};
    use std::cell::Cell;

    fn counter(bus: &EventBus, topic: &str) -> Rc<Cell<u32>> {
        let hits = Rc::new(Cell::new(0));
        let sink = Rc::clone(&hits);
        bus.on(topic, move |_| sink.set(sink.get() + 1));
        hits
    }

    #[test]
    fn test_update_events_drive_triggers() {
        let bus = EventBus::new();
        let system = TriggerSystem::new(&bus, TriggerServices::default());
        let pings = counter(&bus, "ping");

        system.add_trigger(Trigger::new(
            "tick",
            vec![TriggerCondition::event_is("update")],
            vec![TriggerAction::Emit {
                topic: "ping".to_string(),
                data: json!({}),
            }],
            2,
        ));

        for _ in 0..5 {
            bus.emit(topics::UPDATE, json!({ "deltaTime": 0.016 }));
        }
        bus.emit("unwatched", json!({}));

        assert_eq!(pings.get(), 2);
        let trigger = system.get("tick").unwrap();
        assert!(trigger.is_fired());
        assert_eq!(trigger.repeat_count(), 2);
    }

    #[test]
    fn test_watch_adds_topic() {
        let bus = EventBus::new();
        let system = TriggerSystem::new(&bus, TriggerServices::default());
        let fired = counter(&bus, topics::TRIGGER_FIRED);

        system.add_trigger(Trigger::new(
            "at_camp",
            vec![
                TriggerCondition::event_is(topics::AREA_REACHED),
                TriggerCondition::PayloadEquals {
                    field: "areaId".to_string(),
                    value: json!("orc_camp"),
                },
            ],
            vec![TriggerAction::log("camp found")],
            1,
        ));

        bus.emit(topics::AREA_REACHED, json!({ "areaId": "orc_camp" }));
        assert_eq!(fired.get(), 0);

        system.watch(topics::AREA_REACHED);
        bus.emit(topics::AREA_REACHED, json!({ "areaId": "river" }));
        assert_eq!(fired.get(), 0);
        bus.emit(topics::AREA_REACHED, json!({ "areaId": "orc_camp" }));
        assert_eq!(fired.get(), 1);
        assert!(system.get("at_camp").unwrap().is_fired());
    }

    #[test]
    fn test_duplicate_ids_fire_independently() {
        let bus = EventBus::new();
        let system = TriggerSystem::new(&bus, TriggerServices::default());
        let fired = counter(&bus, topics::TRIGGER_FIRED);

        for _ in 0..2 {
            system.add_trigger(Trigger::new("same", Vec::new(), vec![TriggerAction::log("hi")], 1));
        }
        assert_eq!(system.check_all("update", &json!({})), 2);
        assert_eq!(system.check_all("update", &json!({})), 0);
        assert_eq!(fired.get(), 2);
    }

    #[test]
    fn test_quest_completion_fires_watcher_once() {
        let bus = EventBus::new();
        let quests = QuestManager::new(&bus);
        let system = TriggerSystem::new(
            &bus,
            TriggerServices {
                quests: Some(quests.clone()),
                ..TriggerServices::default()
            },
        );
        let fired = counter(&bus, topics::TRIGGER_FIRED);

        system.add_trigger(Trigger::new(
            "hunt_done",
            vec![TriggerCondition::quest_status("hunt", QuestStatus::Completed)],
            vec![TriggerAction::log("hunt finished")],
            1,
        ));
        quests.accept_quest(Quest::new(
            "hunt",
            "Hunt",
            "",
            vec![Objective::kill("wolves", "", 2, Some("wolf"))],
        ));

        for _ in 0..3 {
            bus.emit(topics::ENTITY_DEATH, json!({ "entityType": "wolf" }));
            bus.emit(topics::UPDATE, json!({ "deltaTime": 0.016 }));
        }
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn test_actions_can_reach_other_managers() {
        let bus = EventBus::new();
        let quests = QuestManager::new(&bus);
        quests.register_template(Quest::new(
            "follow_up",
            "Follow Up",
            "",
            vec![Objective::reach("town", "", Some("town"))],
        ));
        let system = TriggerSystem::new(
            &bus,
            TriggerServices {
                quests: Some(quests.clone()),
                ..TriggerServices::default()
            },
        );

        // Accepting a quest from inside the check loop, outside any dispatch
        system.add_trigger(Trigger::new(
            "chain",
            Vec::new(),
            vec![TriggerAction::AcceptQuest {
                quest_id: "follow_up".to_string(),
            }],
            1,
        ));
        assert_eq!(system.check_all("update", &json!({})), 1);
        assert_eq!(quests.quest_status("follow_up"), Some(QuestStatus::InProgress));
    }

    #[test]
    fn test_reset_all_rearms() {
        let bus = EventBus::new();
        let system = TriggerSystem::new(&bus, TriggerServices::default());
        system.add_trigger(Trigger::new("once", Vec::new(), Vec::new(), 1));

        assert_eq!(system.check_all("update", &json!({})), 1);
        assert_eq!(system.check_all("update", &json!({})), 0);
        system.reset_all();
        assert_eq!(system.check_all("update", &json!({})), 1);

        system.clear();
        assert!(system.is_empty());
    }
}
