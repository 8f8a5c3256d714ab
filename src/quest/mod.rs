//! Quest System Module
//!
//! Quests are aggregates of typed objectives. The [`QuestManager`] listens on
//! the event bus and advances every quest in progress.

pub mod definition;
pub mod events;
pub mod manager;
pub mod objective;
pub mod state;

pub use definition::{ObjectiveKind, RawQuest, RawQuestFile};
pub use events::QuestEvent;
pub use manager::QuestManager;
pub use objective::{CollectObjective, KillObjective, Objective, ObjectiveProgress, ReachObjective};
pub use state::{Quest, QuestStatus, QuestUpdate};
