//! Quest Manager
//!
//! Owns every accepted quest and routes gameplay events to the ones in
//! progress. Also keeps a catalogue of quest templates that can be accepted by
//! id, which is how dialogue and triggers hand out quests over the bus.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::events::QuestEvent;
use super::state::{Quest, QuestStatus, QuestUpdate};
use crate::event_bus::{EventBus, topics};

#[derive(Default)]
struct QuestBook {
    /// Accepted quests in acceptance order
    quests: Vec<Quest>,
    /// quest_id -> index into `quests`
    index: HashMap<String, usize>,
    /// Templates that have not been accepted yet
    catalogue: HashMap<String, Quest>,
}

struct Inner {
    bus: EventBus,
    book: RefCell<QuestBook>,
}

/// Shared handle to the quest manager
#[derive(Clone)]
pub struct QuestManager {
    inner: Rc<Inner>,
}

impl QuestManager {
    /// Create the manager and subscribe it to the gameplay topics
    pub fn new(bus: &EventBus) -> Self {
        let manager = Self {
            inner: Rc::new(Inner {
                bus: bus.clone(),
                book: RefCell::new(QuestBook::default()),
            }),
        };

        for topic in [topics::ENTITY_DEATH, topics::RESOURCE_COLLECTED, topics::AREA_REACHED] {
            let weak = Rc::downgrade(&manager.inner);
            bus.on(topic, move |data| {
                if let Some(manager) = upgrade(&weak) {
                    manager.handle_event(topic, data);
                }
            });
        }

        let weak = Rc::downgrade(&manager.inner);
        bus.on(topics::QUEST_ACCEPT, move |data| {
            let Some(manager) = upgrade(&weak) else {
                return;
            };
            match data.get("questId").and_then(Value::as_str) {
                Some(quest_id) => {
                    manager.accept_from_catalogue(quest_id);
                }
                None => warn!("quest:accept without a questId: {}", data),
            }
        });

        manager
    }

    /// Register and start a quest. Re-accepting an id that is already
    /// registered is a warning and leaves the existing quest untouched.
    pub fn accept_quest(&self, mut quest: Quest) -> bool {
        let quest_id = quest.id.clone();
        let title = quest.title.clone();

        let update = {
            let mut book = self.inner.book.borrow_mut();
            if book.index.contains_key(&quest_id) {
                warn!("Quest '{}' already accepted, ignoring", quest_id);
                return false;
            }

            let update = quest.start();
            let status = quest.status();
            let slot = book.quests.len();
            book.quests.push(quest);
            book.index.insert(quest_id.clone(), slot);

            if update == QuestUpdate::Unchanged {
                warn!(
                    "Quest '{}' registered in status {} and was not restarted",
                    quest_id,
                    status.as_str()
                );
                return true;
            }
            update
        };

        info!("Quest accepted: {} ({})", title, quest_id);
        self.inner.bus.emit(
            topics::QUEST_STARTED,
            json!({ "questId": quest_id, "title": title }),
        );
        if update == QuestUpdate::Completed {
            self.emit_completed(&quest_id, &title);
        }
        true
    }

    /// Add a quest definition that can later be accepted by id
    pub fn register_template(&self, quest: Quest) {
        let mut book = self.inner.book.borrow_mut();
        if book.catalogue.contains_key(&quest.id) {
            warn!("Duplicate quest template '{}', overwriting", quest.id);
        }
        book.catalogue.insert(quest.id.clone(), quest);
    }

    /// Accept a fresh copy of a catalogue template
    pub fn accept_from_catalogue(&self, quest_id: &str) -> bool {
        let template = self.inner.book.borrow().catalogue.get(quest_id).cloned();
        match template {
            Some(quest) => self.accept_quest(quest),
            None => {
                warn!("Quest template '{}' not found", quest_id);
                false
            }
        }
    }

    /// Fail an in-progress (or not yet started) quest. Unknown ids and
    /// terminal quests are logged and ignored.
    pub fn fail_quest(&self, quest_id: &str, reason: &str) -> bool {
        {
            let mut book = self.inner.book.borrow_mut();
            let Some(&slot) = book.index.get(quest_id) else {
                warn!("Cannot fail unknown quest '{}'", quest_id);
                return false;
            };
            let quest = &mut book.quests[slot];
            if !quest.fail(reason) {
                warn!(
                    "Cannot fail quest '{}' in terminal status {}",
                    quest_id,
                    quest.status().as_str()
                );
                return false;
            }
        }

        info!("Quest failed: {} ({})", quest_id, reason);
        self.inner.bus.emit(
            topics::QUEST_FAILED,
            json!({ "questId": quest_id, "reason": reason }),
        );
        true
    }

    /// Route a bus event to every in-progress quest
    fn handle_event(&self, topic: &str, data: &Value) {
        let Some(event) = QuestEvent::from_topic(topic, data) else {
            debug!("Ignoring malformed {} payload: {}", topic, data);
            return;
        };

        let completed: Vec<(String, String)> = {
            let mut book = self.inner.book.borrow_mut();
            book.quests
                .iter_mut()
                .filter(|q| q.status() == QuestStatus::InProgress)
                .filter_map(|q| {
                    (q.update(&event) == QuestUpdate::Completed)
                        .then(|| (q.id.clone(), q.title.clone()))
                })
                .collect()
        };

        for (quest_id, title) in completed {
            self.emit_completed(&quest_id, &title);
        }
    }

    fn emit_completed(&self, quest_id: &str, title: &str) {
        info!("Quest completed: {} ({})", title, quest_id);
        self.inner.bus.emit(
            topics::QUEST_COMPLETED,
            json!({ "questId": quest_id, "title": title }),
        );
    }

    /// Get a snapshot of a quest by ID
    pub fn get_quest(&self, quest_id: &str) -> Option<Quest> {
        let book = self.inner.book.borrow();
        book.index.get(quest_id).map(|&slot| book.quests[slot].clone())
    }

    pub fn quest_status(&self, quest_id: &str) -> Option<QuestStatus> {
        let book = self.inner.book.borrow();
        book.index.get(quest_id).map(|&slot| book.quests[slot].status())
    }

    pub fn get_all_quests(&self) -> Vec<Quest> {
        self.inner.book.borrow().quests.clone()
    }

    pub fn get_active_quests(&self) -> Vec<Quest> {
        self.inner
            .book
            .borrow()
            .quests
            .iter()
            .filter(|q| q.status() == QuestStatus::InProgress)
            .cloned()
            .collect()
    }

    pub fn template_ids(&self) -> Vec<String> {
        self.inner.book.borrow().catalogue.keys().cloned().collect()
    }

    /// Forget every accepted quest. Templates are kept.
    pub fn reset(&self) {
        let mut book = self.inner.book.borrow_mut();
        book.quests.clear();
        book.index.clear();
    }
}

fn upgrade(weak: &Weak<Inner>) -> Option<QuestManager> {
    weak.upgrade().map(|inner| QuestManager { inner })
}
