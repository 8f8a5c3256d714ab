//! A single condition/action rule

use serde::Deserialize;

use super::{TriggerAction, TriggerCondition, TriggerContext};

fn default_max_repeats() -> u32 {
    1
}

/// Standing rule: when every condition holds, run every action. Fires at most
/// `max_repeats` times, then stays inert until re-armed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Trigger {
    pub id: String,
    #[serde(default)]
    pub conditions: Vec<TriggerCondition>,
    #[serde(default)]
    pub actions: Vec<TriggerAction>,
    #[serde(default = "default_max_repeats")]
    max_repeats: u32,
    #[serde(skip)]
    is_fired: bool,
    #[serde(skip)]
    repeat_count: u32,
}

impl Trigger {
    pub fn new(
        id: &str,
        conditions: Vec<TriggerCondition>,
        actions: Vec<TriggerAction>,
        max_repeats: u32,
    ) -> Self {
        Self {
            id: id.to_string(),
            conditions,
            actions,
            max_repeats: max_repeats.max(1),
            is_fired: false,
            repeat_count: 0,
        }
    }

    /// True once the trigger has used up its repeats
    pub fn is_exhausted(&self) -> bool {
        self.is_fired && self.repeat_count >= self.max_repeats
    }

    /// Would `check` fire for this context
    pub fn evaluate(&self, ctx: &TriggerContext<'_>) -> bool {
        !self.is_exhausted() && self.conditions.iter().all(|c| c.evaluate(ctx))
    }

    /// Evaluate and fire when every condition holds. Returns true if it fired.
    pub fn check(&mut self, ctx: &TriggerContext<'_>) -> bool {
        if !self.evaluate(ctx) {
            return false;
        }
        self.fire(ctx);
        true
    }

    /// Run every action in order and count the firing
    pub fn fire(&mut self, ctx: &TriggerContext<'_>) {
        self.record_firing();
        for action in &self.actions {
            action.execute(ctx);
        }
    }

    // Counted before the actions run so a re-entrant evaluation triggered by
    // one of them already sees the new count.
    pub(crate) fn record_firing(&mut self) {
        self.repeat_count += 1;
        if self.repeat_count >= self.max_repeats {
            self.is_fired = true;
        }
    }

    /// Clamp authored values after deserialization
    pub(crate) fn normalize(&mut self) {
        self.max_repeats = self.max_repeats.max(1);
    }

    pub fn rearm(&mut self) {
        self.is_fired = false;
        self.repeat_count = 0;
    }

    pub fn is_fired(&self) -> bool {
        self.is_fired
    }

    pub fn repeat_count(&self) -> u32 {
        self.repeat_count
    }

    pub fn max_repeats(&self) -> u32 {
        self.max_repeats
    }
}

/// TOML file holding `[[trigger]]` entries
#[derive(Debug, Clone, Deserialize)]
pub struct RawTriggerFile {
    #[serde(rename = "trigger", default)]
    pub triggers: Vec<Trigger>,
}
