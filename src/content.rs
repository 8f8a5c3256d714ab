//! Content Loader
//!
//! Reads authored TOML from the data directory:
//!
//! ```text
//! data/
//!   quests/*.toml     [quest] + [[quest.objectives]]
//!   dialogues/*.toml  [[node]] + [[node.choices]]
//!   triggers/*.toml   [[trigger]]
//! ```
//!
//! Subdirectories are walked recursively. A file that fails to read, parse or
//! resolve is skipped with a warning; the rest still load.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::dialogue::{DialogueNode, RawDialogueFile};
use crate::error::ContentError;
use crate::narrative::Narrative;
use crate::quest::{Quest, RawQuestFile};
use crate::trigger::{RawTriggerFile, Trigger};

/// How much content was registered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub quests: usize,
    pub dialogue_nodes: usize,
    pub triggers: usize,
    /// Files skipped because they failed to load
    pub skipped_files: usize,
}

pub struct ContentLoader {
    data_dir: PathBuf,
}

impl ContentLoader {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Register every quest template, dialogue node and trigger found
    pub fn load_into(&self, narrative: &Narrative) -> Result<LoadReport, ContentError> {
        info!("Loading narrative content from {:?}", self.data_dir());
        let mut report = LoadReport::default();

        let (quests, skipped) = self.load_quests()?;
        report.quests = quests.len();
        report.skipped_files += skipped;
        for quest in quests {
            narrative.quests().register_template(quest);
        }

        let (nodes, skipped) = self.load_dialogues()?;
        report.dialogue_nodes = nodes.len();
        report.skipped_files += skipped;
        narrative.dialogue().register_dialogues(nodes);
        for issue in narrative.dialogue().validate() {
            warn!("Dialogue issue: {:?}", issue);
        }

        let (triggers, skipped) = self.load_triggers()?;
        report.triggers = triggers.len();
        report.skipped_files += skipped;
        for trigger in triggers {
            narrative.triggers().add_trigger(trigger);
        }

        info!(
            "Loaded {} quests, {} dialogue nodes, {} triggers ({} files skipped)",
            report.quests, report.dialogue_nodes, report.triggers, report.skipped_files
        );
        Ok(report)
    }

    pub fn load_quests(&self) -> Result<(Vec<Quest>, usize), ContentError> {
        self.load_section("quests", |path| {
            let raw: RawQuestFile = parse_file(path)?;
            let quest = raw.quest.to_quest()?;
            info!("Loaded quest: {} ({})", quest.title, quest.id);
            Ok(vec![quest])
        })
    }

    pub fn load_dialogues(&self) -> Result<(Vec<DialogueNode>, usize), ContentError> {
        self.load_section("dialogues", |path| {
            let raw: RawDialogueFile = parse_file(path)?;
            Ok(raw.nodes)
        })
    }

    pub fn load_triggers(&self) -> Result<(Vec<Trigger>, usize), ContentError> {
        self.load_section("triggers", |path| {
            let raw: RawTriggerFile = parse_file(path)?;
            Ok(raw.triggers)
        })
    }

    /// Load every TOML file under `data_dir/section`. Returns the items and
    /// the number of files skipped.
    fn load_section<T>(
        &self,
        section: &str,
        load_file: impl Fn(&Path) -> Result<Vec<T>, ContentError>,
    ) -> Result<(Vec<T>, usize), ContentError> {
        let dir = self.data_dir.join(section);
        if !dir.exists() {
            warn!("Content directory does not exist: {:?}", dir);
            return Ok((Vec::new(), 0));
        }

        let mut paths = Vec::new();
        collect_toml_files(&dir, &mut paths)?;
        // Stable registration order regardless of the filesystem
        paths.sort();

        let mut items = Vec::new();
        let mut skipped = 0;
        for path in paths {
            match load_file(&path) {
                Ok(mut loaded) => items.append(&mut loaded),
                Err(e) => {
                    warn!("Skipping {:?}: {}", path, e);
                    skipped += 1;
                }
            }
        }
        Ok((items, skipped))
    }
}

fn collect_toml_files(dir: &Path, paths: &mut Vec<PathBuf>) -> Result<(), ContentError> {
    let io_error = |source| ContentError::Io {
        path: dir.to_path_buf(),
        source,
    };

    for entry in std::fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        if path.is_dir() {
            collect_toml_files(&path, paths)?;
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            paths.push(path);
        }
    }
    Ok(())
}

fn parse_file<T: DeserializeOwned>(path: &Path) -> Result<T, ContentError> {
    let content = std::fs::read_to_string(path).map_err(|source| ContentError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ContentError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
