//! Quest State
//!
//! A quest owns its objectives and moves through
//! `NOT_STARTED -> IN_PROGRESS -> COMPLETED | FAILED`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::events::QuestEvent;
use super::objective::Objective;

/// Status of a quest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestStatus {
    NotStarted,
    InProgress,
    Completed,
    Failed,
}

impl QuestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestStatus::NotStarted => "NOT_STARTED",
            QuestStatus::InProgress => "IN_PROGRESS",
            QuestStatus::Completed => "COMPLETED",
            QuestStatus::Failed => "FAILED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "NOT_STARTED" => Some(QuestStatus::NotStarted),
            "IN_PROGRESS" => Some(QuestStatus::InProgress),
            "COMPLETED" => Some(QuestStatus::Completed),
            "FAILED" => Some(QuestStatus::Failed),
            _ => None,
        }
    }

    /// Completed and failed quests never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, QuestStatus::Completed | QuestStatus::Failed)
    }
}

/// Outcome of feeding something to a quest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestUpdate {
    /// Nothing changed
    Unchanged,
    /// At least one objective advanced
    Progressed,
    /// The quest just became COMPLETED
    Completed,
}

/// An aggregate of objectives with an overall lifecycle status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quest {
    pub id: String,
    pub title: String,
    pub description: String,
    status: QuestStatus,
    objectives: Vec<Objective>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    failure_reason: Option<String>,
}

impl Quest {
    pub fn new(id: &str, title: &str, description: &str, objectives: Vec<Objective>) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            status: QuestStatus::NotStarted,
            objectives,
            started_at: None,
            finished_at: None,
            failure_reason: None,
        }
    }

    /// Move a fresh quest to IN_PROGRESS. A quest without objectives completes
    /// immediately. Quests that were already started are left alone.
    pub fn start(&mut self) -> QuestUpdate {
        if self.status != QuestStatus::NotStarted {
            return QuestUpdate::Unchanged;
        }
        self.status = QuestStatus::InProgress;
        self.started_at = Some(Utc::now());

        if self.objectives.is_empty() {
            self.finish(QuestStatus::Completed);
            return QuestUpdate::Completed;
        }
        QuestUpdate::Progressed
    }

    /// Forward an event to every objective, completing the quest once all of
    /// them are done. Only IN_PROGRESS quests react.
    pub fn update(&mut self, event: &QuestEvent) -> QuestUpdate {
        if self.status != QuestStatus::InProgress {
            return QuestUpdate::Unchanged;
        }

        let mut progressed = false;
        for objective in &mut self.objectives {
            progressed |= objective.update(event);
        }

        if self.objectives.iter().all(Objective::is_completed) {
            self.finish(QuestStatus::Completed);
            QuestUpdate::Completed
        } else if progressed {
            QuestUpdate::Progressed
        } else {
            QuestUpdate::Unchanged
        }
    }

    /// Mark the quest as failed. Returns false for terminal quests.
    pub fn fail(&mut self, reason: &str) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.failure_reason = Some(reason.to_string());
        self.finish(QuestStatus::Failed);
        true
    }

    fn finish(&mut self, status: QuestStatus) {
        self.status = status;
        self.finished_at = Some(Utc::now());
    }

    pub fn status(&self) -> QuestStatus {
        self.status
    }

    pub fn objectives(&self) -> &[Objective] {
        &self.objectives
    }

    /// Get objective by ID
    pub fn get_objective(&self, id: &str) -> Option<&Objective> {
        self.objectives.iter().find(|o| o.id() == id)
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    /// Get duration in seconds (if started)
    pub fn duration_secs(&self) -> Option<i64> {
        self.started_at.map(|start| {
            let end = self.finished_at.unwrap_or_else(Utc::now);
            (end - start).num_seconds()
        })
    }
}
