//! Branching dialogue
//!
//! A graph of [`DialogueNode`]s linked by choice `next_id`s, walked one
//! choice at a time by the UI through the [`DialogueManager`].

pub mod manager;
pub mod node;

pub use manager::{DEFAULT_MAX_HOPS, DialogueIssue, DialogueManager, DialogueView};
pub use node::{DialogueChoice, DialogueEffect, DialogueNode, EffectFn, RawDialogueFile};
