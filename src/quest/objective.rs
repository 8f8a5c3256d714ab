//! Quest Objectives
//!
//! Each objective variant decides which [`QuestEvent`]s it reacts to and how
//! much progress they are worth. Completion is monotonic: once an objective is
//! complete no further event changes it.

use serde::{Deserialize, Serialize};

use super::events::QuestEvent;

/// Counter shared by every objective variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectiveProgress {
    pub current: u32,
    pub target: u32,
    pub completed: bool,
}

impl ObjectiveProgress {
    pub fn new(target: u32) -> Self {
        Self {
            current: 0,
            target,
            completed: false,
        }
    }

    /// Add progress and return true if newly completed
    pub fn add_progress(&mut self, amount: u32) -> bool {
        if self.completed {
            return false;
        }
        self.current = self.current.saturating_add(amount);
        self.completed = self.current >= self.target;
        self.completed
    }

    pub fn progress_percent(&self) -> f32 {
        if self.target == 0 {
            return 1.0;
        }
        (self.current as f32 / self.target as f32).min(1.0)
    }
}

/// Kill `target` entities, optionally of one type only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillObjective {
    pub id: String,
    pub description: String,
    /// Only deaths of this entity type count; `None` counts every death
    pub entity_type: Option<String>,
    pub progress: ObjectiveProgress,
}

impl KillObjective {
    fn matches(&self, event: &QuestEvent) -> bool {
        match event {
            QuestEvent::EntityDeath { entity_type } => match &self.entity_type {
                None => true,
                Some(wanted) => entity_type.as_deref() == Some(wanted.as_str()),
            },
            _ => false,
        }
    }
}

/// Collect `target` units of a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectObjective {
    pub id: String,
    pub description: String,
    pub resource_type: String,
    pub progress: ObjectiveProgress,
}

impl CollectObjective {
    fn amount_for(&self, event: &QuestEvent) -> Option<u32> {
        match event {
            QuestEvent::ResourceCollected {
                resource_type,
                amount,
            } if *resource_type == self.resource_type => Some(*amount),
            _ => None,
        }
    }
}

/// Reach an area
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReachObjective {
    pub id: String,
    pub description: String,
    /// Only this area counts; `None` accepts any `area:reached`
    pub area_id: Option<String>,
    pub progress: ObjectiveProgress,
}

impl ReachObjective {
    fn matches(&self, event: &QuestEvent) -> bool {
        match event {
            QuestEvent::AreaReached { area_id } => match &self.area_id {
                None => true,
                Some(wanted) => area_id.as_deref() == Some(wanted.as_str()),
            },
            _ => false,
        }
    }
}

/// A single measurable sub-goal of a quest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Objective {
    Kill(KillObjective),
    Collect(CollectObjective),
    Reach(ReachObjective),
}

impl Objective {
    pub fn kill(id: &str, description: &str, target: u32, entity_type: Option<&str>) -> Self {
        Objective::Kill(KillObjective {
            id: id.to_string(),
            description: description.to_string(),
            entity_type: entity_type.map(str::to_string),
            progress: ObjectiveProgress::new(target),
        })
    }

    pub fn collect(id: &str, description: &str, target: u32, resource_type: &str) -> Self {
        Objective::Collect(CollectObjective {
            id: id.to_string(),
            description: description.to_string(),
            resource_type: resource_type.to_string(),
            progress: ObjectiveProgress::new(target),
        })
    }

    pub fn reach(id: &str, description: &str, area_id: Option<&str>) -> Self {
        Objective::Reach(ReachObjective {
            id: id.to_string(),
            description: description.to_string(),
            area_id: area_id.map(str::to_string),
            progress: ObjectiveProgress::new(1),
        })
    }

    /// Feed an event to the objective. Returns true if progress changed.
    pub fn update(&mut self, event: &QuestEvent) -> bool {
        if self.is_completed() {
            return false;
        }

        let amount = match self {
            Objective::Kill(obj) => obj.matches(event).then_some(1),
            Objective::Collect(obj) => obj.amount_for(event),
            Objective::Reach(obj) => obj.matches(event).then_some(1),
        };

        match amount {
            Some(amount) => {
                self.progress_mut().add_progress(amount);
                true
            }
            None => false,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Objective::Kill(obj) => &obj.id,
            Objective::Collect(obj) => &obj.id,
            Objective::Reach(obj) => &obj.id,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Objective::Kill(obj) => &obj.description,
            Objective::Collect(obj) => &obj.description,
            Objective::Reach(obj) => &obj.description,
        }
    }

    pub fn progress(&self) -> &ObjectiveProgress {
        match self {
            Objective::Kill(obj) => &obj.progress,
            Objective::Collect(obj) => &obj.progress,
            Objective::Reach(obj) => &obj.progress,
        }
    }

    fn progress_mut(&mut self) -> &mut ObjectiveProgress {
        match self {
            Objective::Kill(obj) => &mut obj.progress,
            Objective::Collect(obj) => &mut obj.progress,
            Objective::Reach(obj) => &mut obj.progress,
        }
    }

    pub fn current_value(&self) -> u32 {
        self.progress().current
    }

    pub fn target_value(&self) -> u32 {
        self.progress().target
    }

    pub fn is_completed(&self) -> bool {
        self.progress().completed
    }

    pub fn remaining(&self) -> u32 {
        self.target_value().saturating_sub(self.current_value())
    }
}
