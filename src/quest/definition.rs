//! Quest Definition Structures
//!
//! These structures are deserialized from TOML quest files and resolved into
//! [`Quest`] values.

use serde::Deserialize;

use super::objective::Objective;
use super::state::Quest;
use crate::error::ContentError;

/// A quest definition loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawQuestFile {
    pub quest: RawQuest,
}

/// Raw quest data as it appears in TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawQuest {
    pub id: String,
    #[serde(alias = "name")]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Quest objectives
    #[serde(default)]
    pub objectives: Vec<RawObjective>,
}

/// Raw objective as it appears in TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawObjective {
    pub id: String,
    #[serde(rename = "type")]
    pub objective_type: String,
    /// Entity type, resource type or area id depending on the objective type
    pub target: Option<String>,
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default)]
    pub description: String,
}

fn default_count() -> u32 {
    1
}

/// Objective types supported by the quest system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveKind {
    /// Kill X entities, optionally of type Y
    Kill,
    /// Collect X units of resource Y
    Collect,
    /// Reach a specific area
    Reach,
}

impl ObjectiveKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "kill" | "kill_monster" => Some(ObjectiveKind::Kill),
            "collect" | "collect_item" | "collect_resource" => Some(ObjectiveKind::Collect),
            "reach" | "reach_location" | "location" => Some(ObjectiveKind::Reach),
            _ => None,
        }
    }
}

impl RawObjective {
    fn resolve(&self, quest_id: &str, index: usize) -> Result<Objective, ContentError> {
        let kind = ObjectiveKind::from_str(&self.objective_type).ok_or_else(|| {
            ContentError::InvalidObjective {
                quest_id: quest_id.to_string(),
                kind: self.objective_type.clone(),
                index,
            }
        })?;

        let objective = match kind {
            ObjectiveKind::Kill => Objective::kill(
                &self.id,
                &self.description,
                self.count,
                self.target.as_deref(),
            ),
            ObjectiveKind::Collect => {
                let resource = self.target.as_deref().ok_or_else(|| ContentError::MissingTarget {
                    quest_id: quest_id.to_string(),
                    objective_id: self.id.clone(),
                })?;
                Objective::collect(&self.id, &self.description, self.count, resource)
            }
            ObjectiveKind::Reach => {
                Objective::reach(&self.id, &self.description, self.target.as_deref())
            }
        };
        Ok(objective)
    }
}

impl RawQuest {
    /// Create a Quest from raw TOML data
    pub fn to_quest(&self) -> Result<Quest, ContentError> {
        let objectives = self
            .objectives
            .iter()
            .enumerate()
            .map(|(i, o)| o.resolve(&self.id, i))
            .collect::<Result<Vec<_>, _>>()?;

        if objectives.is_empty() {
            return Err(ContentError::EmptyQuest(self.id.clone()));
        }

        Ok(Quest::new(&self.id, &self.title, &self.description, objectives))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quest::QuestStatus;

    const KILL_ORCS: &str = r#"
[quest]
id = "kill_orcs"
title = "Orc Trouble"
description = "Thin out the orc camp"

[[quest.objectives]]
id = "orcs"
type = "kill"
target = "orc"
count = 3
description = "Kill 3 orcs"

[[quest.objectives]]
id = "camp"
type = "reach"
target = "orc_camp"
"#;

    #[test]
    fn test_objective_kind_parsing() {
        assert_eq!(ObjectiveKind::from_str("kill_monster"), Some(ObjectiveKind::Kill));
        assert_eq!(ObjectiveKind::from_str("Collect"), Some(ObjectiveKind::Collect));
        assert_eq!(ObjectiveKind::from_str("reach_location"), Some(ObjectiveKind::Reach));
        assert_eq!(ObjectiveKind::from_str("talk_to"), None);
    }

    #[test]
    fn test_quest_from_toml() {
        let raw: RawQuestFile = toml::from_str(KILL_ORCS).unwrap();
        let quest = raw.quest.to_quest().unwrap();

        assert_eq!(quest.title, "Orc Trouble");
        assert_eq!(quest.status(), QuestStatus::NotStarted);
        assert_eq!(quest.objectives().len(), 2);
        assert_eq!(quest.objectives()[0].target_value(), 3);
        assert_eq!(quest.get_objective("camp").map(|o| o.target_value()), Some(1));
    }

    #[test]
    fn test_invalid_quests_are_rejected() {
        let raw: RawQuestFile = toml::from_str(
            r#"
[quest]
id = "empty"
title = "Nothing to do"
"#,
        )
        .unwrap();
        assert!(matches!(raw.quest.to_quest(), Err(ContentError::EmptyQuest(_))));

        let raw: RawQuestFile = toml::from_str(
            r#"
[quest]
id = "chat"
title = "Chat"

[[quest.objectives]]
id = "talk"
type = "talk_to"
"#,
        )
        .unwrap();
        assert!(matches!(
            raw.quest.to_quest(),
            Err(ContentError::InvalidObjective { index: 0, .. })
        ));

        let raw: RawQuestFile = toml::from_str(
            r#"
[quest]
id = "gather"
title = "Gather"

[[quest.objectives]]
id = "stuff"
type = "collect"
count = 4
"#,
        )
        .unwrap();
        assert!(matches!(raw.quest.to_quest(), Err(ContentError::MissingTarget { .. })));
    }
}
