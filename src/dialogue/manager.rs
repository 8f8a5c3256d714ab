//! Dialogue Manager
//!
//! Holds the registered dialogue graph and the currently open node.
//! `CLOSED -> start_dialogue -> OPEN(node) -> select_choice -> OPEN(next) | CLOSED`.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::node::DialogueNode;
use crate::event_bus::{EventBus, topics};

/// Default limit on dialogue transitions without player input
pub const DEFAULT_MAX_HOPS: u32 = 64;

/// Rendering collaborator notified when dialogue opens, changes or closes.
pub trait DialogueView {
    fn show(&mut self, node: &DialogueNode);
    fn hide(&mut self);
}

/// Authoring problem found by [`DialogueManager::validate`]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum DialogueIssue {
    DanglingNext {
        node_id: String,
        choice_index: usize,
        next_id: String,
    },
}

#[derive(Default)]
struct Session {
    nodes: HashMap<String, DialogueNode>,
    current: Option<String>,
}

struct Inner {
    bus: EventBus,
    session: RefCell<Session>,
    view: RefCell<Option<Box<dyn DialogueView>>>,
    /// Transitions currently on the call stack
    depth: Cell<u32>,
    /// Transitions since the last direct entry
    hops: Cell<u32>,
    max_hops: u32,
}

/// Shared handle to the dialogue manager
#[derive(Clone)]
pub struct DialogueManager {
    inner: Rc<Inner>,
}

impl DialogueManager {
    pub fn new(bus: &EventBus) -> Self {
        Self::with_max_hops(bus, DEFAULT_MAX_HOPS)
    }

    pub fn with_max_hops(bus: &EventBus, max_hops: u32) -> Self {
        Self {
            inner: Rc::new(Inner {
                bus: bus.clone(),
                session: RefCell::new(Session::default()),
                view: RefCell::new(None),
                depth: Cell::new(0),
                hops: Cell::new(0),
                max_hops: max_hops.max(1),
            }),
        }
    }

    pub fn set_view(&self, view: Box<dyn DialogueView>) {
        *self.inner.view.borrow_mut() = Some(view);
    }

    /// Register dialogue nodes. A node id that already exists is replaced.
    pub fn register_dialogues(&self, nodes: impl IntoIterator<Item = DialogueNode>) {
        let mut session = self.inner.session.borrow_mut();
        for node in nodes {
            debug!("Registered dialogue node {}", node.id);
            session.nodes.insert(node.id.clone(), node);
        }
    }

    /// Open the dialogue at `id`. Unknown ids are logged and leave the current
    /// state untouched.
    pub fn start_dialogue(&self, id: &str) -> bool {
        self.begin_entry();
        let depth = self.inner.depth.get();
        self.inner.depth.set(depth + 1);
        let started = self.enter_node(id);
        self.inner.depth.set(depth);
        started
    }

    // Hops restart when the player or UI acts directly (no transition on the
    // stack, no event being dispatched) or when nothing is open.
    fn begin_entry(&self) {
        let direct = self.inner.depth.get() == 0 && !self.inner.bus.is_dispatching();
        if direct || !self.is_open() {
            self.inner.hops.set(0);
        }
    }

    fn enter_node(&self, id: &str) -> bool {
        let hops = self.inner.hops.get() + 1;
        if hops > self.inner.max_hops {
            error!(
                "Dialogue '{}' exceeded {} transitions without player input, likely a cycle; closing dialogue",
                id, self.inner.max_hops
            );
            self.end_dialogue();
            return false;
        }
        self.inner.hops.set(hops);

        let node = {
            let mut session = self.inner.session.borrow_mut();
            let Some(node) = session.nodes.get(id).cloned() else {
                warn!("Dialogue node '{}' not found", id);
                return false;
            };
            session.current = Some(node.id.clone());
            node
        };

        info!("Dialogue started: {} ({})", node.id, node.speaker);
        if let Some(effect) = &node.on_start {
            effect.apply(&self.inner.bus);
            // on_start may have moved the dialogue on or closed it
            if self.inner.session.borrow().current.as_deref() != Some(node.id.as_str()) {
                debug!("Dialogue node '{}' superseded during on_start", node.id);
                return true;
            }
        }
        self.with_view(|view| view.show(&node));
        self.inner.bus.emit(topics::DIALOGUE_STARTED, node.to_payload());
        true
    }

    /// Pick an answer on the open node. Out-of-range indices and closed
    /// dialogue are ignored.
    pub fn select_choice(&self, index: usize) -> bool {
        let choice = {
            let session = self.inner.session.borrow();
            let Some(current) = session.current.as_deref() else {
                debug!("select_choice({}) with no open dialogue", index);
                return false;
            };
            let Some(node) = session.nodes.get(current) else {
                warn!("Open dialogue node '{}' disappeared", current);
                return false;
            };
            match node.choices.get(index) {
                Some(choice) => choice.clone(),
                None => {
                    warn!(
                        "Choice {} out of range for dialogue node '{}' ({} choices)",
                        index,
                        node.id,
                        node.choices.len()
                    );
                    return false;
                }
            }
        };

        if let Some(action) = &choice.action {
            action.apply(&self.inner.bus);
        }

        match choice.next_id.as_deref() {
            Some(next_id) => {
                self.start_dialogue(next_id);
            }
            None => self.end_dialogue(),
        }
        true
    }

    /// Close the open dialogue. Does nothing when no dialogue is open.
    pub fn end_dialogue(&self) {
        let previous = {
            let mut session = self.inner.session.borrow_mut();
            let Some(previous_id) = session.current.take() else {
                debug!("end_dialogue with no open dialogue");
                return;
            };
            session.nodes.get(&previous_id).cloned()
        };

        info!(
            "Dialogue ended: {}",
            previous.as_ref().map_or("<unknown>", |n| n.id.as_str())
        );
        self.with_view(|view| view.hide());
        let payload = previous.as_ref().map_or(Value::Null, DialogueNode::to_payload);
        self.inner.bus.emit(topics::DIALOGUE_ENDED, payload);
    }

    pub fn is_open(&self) -> bool {
        self.inner.session.borrow().current.is_some()
    }

    pub fn current_node(&self) -> Option<DialogueNode> {
        let session = self.inner.session.borrow();
        session
            .current
            .as_ref()
            .and_then(|id| session.nodes.get(id))
            .cloned()
    }

    pub fn node(&self, id: &str) -> Option<DialogueNode> {
        self.inner.session.borrow().nodes.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.session.borrow().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Report choices that point at nodes that were never registered
    pub fn validate(&self) -> Vec<DialogueIssue> {
        let session = self.inner.session.borrow();
        let mut issues: Vec<DialogueIssue> = session
            .nodes
            .values()
            .flat_map(|node| {
                node.choices.iter().enumerate().filter_map(|(i, choice)| {
                    let next_id = choice.next_id.as_ref()?;
                    (!session.nodes.contains_key(next_id)).then(|| DialogueIssue::DanglingNext {
                        node_id: node.id.clone(),
                        choice_index: i,
                        next_id: next_id.clone(),
                    })
                })
            })
            .collect();
        issues.sort();
        issues
    }

    /// Close any open dialogue silently and forget every node.
    pub fn reset(&self) {
        let mut session = self.inner.session.borrow_mut();
        session.nodes.clear();
        session.current = None;
    }

    // The view is taken out while it runs so a re-entrant transition cannot
    // double-borrow it.
    fn with_view(&self, f: impl FnOnce(&mut dyn DialogueView)) {
        let taken = self.inner.view.borrow_mut().take();
        if let Some(mut view) = taken {
            f(view.as_mut());
            let mut slot = self.inner.view.borrow_mut();
            if slot.is_none() {
                *slot = Some(view);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::{DialogueChoice, DialogueEffect};
    use serde_json::json;

    fn recorder(bus: &EventBus, topic: &str) -> Rc<RefCell<Vec<Value>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        bus.on(topic, move |data| sink.borrow_mut().push(data.clone()));
        seen
    }

    fn guard_dialogue() -> Vec<DialogueNode> {
        vec![
            DialogueNode::new("gate", "Guard", "Who goes there?")
                .choice(DialogueChoice::new("A friend.").goto("friend"))
                .choice(DialogueChoice::new("None of your business.")),
            DialogueNode::new("friend", "Guard", "Pass, friend.")
                .choice(DialogueChoice::new("Thanks.")),
        ]
    }

    #[test]
    fn test_start_unknown_dialogue_is_noop() {
        let bus = EventBus::new();
        let dialogue = DialogueManager::new(&bus);
        let started = recorder(&bus, topics::DIALOGUE_STARTED);
        dialogue.register_dialogues(guard_dialogue());

        assert!(dialogue.start_dialogue("gate"));
        assert!(!dialogue.start_dialogue("nowhere"));

        assert!(dialogue.is_open());
        assert_eq!(dialogue.current_node().unwrap().id, "gate");
        assert_eq!(started.borrow().len(), 1);
    }

    #[test]
    fn test_choice_with_next_branches() {
        let bus = EventBus::new();
        let dialogue = DialogueManager::new(&bus);
        dialogue.register_dialogues(guard_dialogue());
        dialogue.start_dialogue("gate");

        let started = recorder(&bus, topics::DIALOGUE_STARTED);
        assert!(dialogue.select_choice(0));

        assert_eq!(dialogue.current_node().unwrap().id, "friend");
        assert_eq!(started.borrow().len(), 1);
        assert_eq!(started.borrow()[0]["id"], "friend");
    }

    #[test]
    fn test_choice_without_next_ends_dialogue() {
        let bus = EventBus::new();
        let dialogue = DialogueManager::new(&bus);
        let ended = recorder(&bus, topics::DIALOGUE_ENDED);
        dialogue.register_dialogues(guard_dialogue());
        dialogue.start_dialogue("gate");

        assert!(dialogue.select_choice(1));
        assert!(!dialogue.is_open());
        assert!(dialogue.current_node().is_none());
        assert_eq!(ended.borrow().len(), 1);
        assert_eq!(ended.borrow()[0]["id"], "gate");

        // Nothing further to end or select
        dialogue.end_dialogue();
        assert!(!dialogue.select_choice(0));
        assert_eq!(ended.borrow().len(), 1);
    }

    #[test]
    fn test_out_of_range_choice_is_ignored() {
        let bus = EventBus::new();
        let dialogue = DialogueManager::new(&bus);
        dialogue.register_dialogues(guard_dialogue());
        dialogue.start_dialogue("gate");

        assert!(!dialogue.select_choice(7));
        assert_eq!(dialogue.current_node().unwrap().id, "gate");
    }

    #[test]
    fn test_action_runs_before_branching() {
        let bus = EventBus::new();
        let dialogue = DialogueManager::new(&bus);
        let order = Rc::new(RefCell::new(Vec::new()));

        {
            let order = Rc::clone(&order);
            bus.on("bribe", move |_| order.borrow_mut().push("action"));
        }
        {
            let order = Rc::clone(&order);
            bus.on(topics::DIALOGUE_ENDED, move |_| order.borrow_mut().push("ended"));
        }

        dialogue.register_dialogues(vec![DialogueNode::new("gate", "Guard", "Well?").choice(
            DialogueChoice::new("Here's gold.").with_action(DialogueEffect::Emit {
                topic: "bribe".to_string(),
                data: json!({ "gold": 5 }),
            }),
        )]);
        dialogue.start_dialogue("gate");
        dialogue.select_choice(0);

        assert_eq!(*order.borrow(), vec!["action", "ended"]);
    }

    #[test]
    fn test_on_start_runs_and_reregistering_overwrites() {
        let bus = EventBus::new();
        let dialogue = DialogueManager::new(&bus);
        let hits = Rc::new(Cell::new(0));

        dialogue.register_dialogues(vec![DialogueNode::new("a", "X", "old")]);
        let counter = Rc::clone(&hits);
        dialogue.register_dialogues(vec![DialogueNode::new("a", "X", "new")
            .on_start(DialogueEffect::callback(move |_| counter.set(counter.get() + 1)))]);

        dialogue.start_dialogue("a");
        assert_eq!(hits.get(), 1);
        assert_eq!(dialogue.current_node().unwrap().text, "new");
        assert_eq!(dialogue.len(), 1);
    }

    #[test]
    fn test_reentrant_cycle_is_cut_off() {
        let bus = EventBus::new();
        let dialogue = DialogueManager::with_max_hops(&bus, 8);
        let ended = recorder(&bus, topics::DIALOGUE_ENDED);

        // Each node immediately re-enters the other one
        let again = dialogue.clone();
        let back = dialogue.clone();
        dialogue.register_dialogues(vec![
            DialogueNode::new("ping", "A", "ping")
                .on_start(DialogueEffect::callback(move |_| {
                    again.start_dialogue("pong");
                })),
            DialogueNode::new("pong", "B", "pong")
                .on_start(DialogueEffect::callback(move |_| {
                    back.start_dialogue("ping");
                })),
        ]);

        dialogue.start_dialogue("ping");
        assert!(!dialogue.is_open());
        assert_eq!(ended.borrow().len(), 1);
    }

    fn looping_pair() -> Vec<DialogueNode> {
        vec![
            DialogueNode::new("a", "X", "a").choice(DialogueChoice::new("on").goto("b")),
            DialogueNode::new("b", "X", "b").choice(DialogueChoice::new("back").goto("a")),
        ]
    }

    #[test]
    fn test_auto_advancing_listener_is_cut_off() {
        let bus = EventBus::new();
        let dialogue = DialogueManager::with_max_hops(&bus, 8);
        let started = recorder(&bus, topics::DIALOGUE_STARTED);
        let ended = recorder(&bus, topics::DIALOGUE_ENDED);
        dialogue.register_dialogues(looping_pair());

        // Picks the first answer as soon as any node opens
        let auto = dialogue.clone();
        bus.on(topics::DIALOGUE_STARTED, move |_| {
            auto.select_choice(0);
        });

        dialogue.start_dialogue("a");
        assert_eq!(started.borrow().len(), 8);
        assert_eq!(ended.borrow().len(), 1);
        assert!(!dialogue.is_open());

        // A fresh direct start gets a full allowance again
        dialogue.start_dialogue("b");
        assert_eq!(started.borrow().len(), 16);
        assert_eq!(ended.borrow().len(), 2);
    }

    #[test]
    fn test_player_choices_do_not_count_as_hops() {
        let bus = EventBus::new();
        let dialogue = DialogueManager::with_max_hops(&bus, 2);
        let ended = recorder(&bus, topics::DIALOGUE_ENDED);
        dialogue.register_dialogues(looping_pair());

        dialogue.start_dialogue("a");
        for _ in 0..10 {
            assert!(dialogue.select_choice(0));
        }
        assert!(dialogue.is_open());
        assert_eq!(dialogue.current_node().unwrap().id, "a");
        assert!(ended.borrow().is_empty());
    }

    #[test]
    fn test_validate_reports_dangling_links() {
        let bus = EventBus::new();
        let dialogue = DialogueManager::new(&bus);
        dialogue.register_dialogues(vec![
            DialogueNode::new("a", "X", "hi")
                .choice(DialogueChoice::new("ok").goto("b"))
                .choice(DialogueChoice::new("huh").goto("missing")),
            DialogueNode::new("b", "X", "bye"),
        ]);

        assert_eq!(
            dialogue.validate(),
            vec![DialogueIssue::DanglingNext {
                node_id: "a".to_string(),
                choice_index: 1,
                next_id: "missing".to_string(),
            }]
        );
    }

    #[test]
    fn test_view_is_notified() {
        struct Log(Rc<RefCell<Vec<String>>>);
        impl DialogueView for Log {
            fn show(&mut self, node: &DialogueNode) {
                self.0.borrow_mut().push(format!("show {}", node.id));
            }
            fn hide(&mut self) {
                self.0.borrow_mut().push("hide".to_string());
            }
        }

        let bus = EventBus::new();
        let dialogue = DialogueManager::new(&bus);
        let log = Rc::new(RefCell::new(Vec::new()));
        dialogue.set_view(Box::new(Log(Rc::clone(&log))));
        dialogue.register_dialogues(guard_dialogue());

        dialogue.start_dialogue("gate");
        dialogue.select_choice(0);
        dialogue.select_choice(0);

        assert_eq!(*log.borrow(), vec!["show gate", "show friend", "hide"]);
    }
}
