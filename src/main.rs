use std::io::{self, BufRead};
use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info, warn};
use tracing_subscriber::filter::Directive;

use isometric_narrative::{
    ContentLoader, DialogueNode, DialogueView, FileStorage, Narrative, NarrativeConfig,
};

/// One line of a replay script
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Command {
    Emit {
        emit: String,
        #[serde(default)]
        data: Value,
    },
    Update {
        update: f64,
    },
    Dialogue {
        dialogue: String,
    },
    Choose {
        choose: usize,
    },
    Fail {
        fail: String,
        #[serde(default)]
        reason: String,
    },
    NewGame {
        new_game: Value,
    },
    Status {
        status: Value,
    },
}

/// Prints dialogue to stdout
struct ConsoleView;

impl DialogueView for ConsoleView {
    fn show(&mut self, node: &DialogueNode) {
        println!("[{}] {}", node.speaker, node.text);
        for (i, choice) in node.choices.iter().enumerate() {
            println!("  {}) {}", i, choice.text);
        }
    }

    fn hide(&mut self) {
        println!("-- dialogue closed --");
    }
}

fn print_status(narrative: &Narrative) {
    println!("== quests ==");
    for quest in narrative.quests().get_all_quests() {
        match quest.duration_secs() {
            Some(secs) => println!(
                "{} [{}] {} ({}s)",
                quest.id,
                quest.status().as_str(),
                quest.title,
                secs
            ),
            None => println!("{} [{}] {}", quest.id, quest.status().as_str(), quest.title),
        }
        for objective in quest.objectives() {
            println!(
                "  - {} {}/{}{}",
                objective.id(),
                objective.current_value(),
                objective.target_value(),
                if objective.is_completed() { " (done)" } else { "" }
            );
        }
        if let Some(reason) = quest.failure_reason() {
            println!("  failed: {}", reason);
        }
    }

    println!("== dialogue ==");
    match narrative.dialogue().current_node() {
        Some(node) => println!("open at '{}'", node.id),
        None => println!("closed"),
    }

    let state = narrative.campaign().state();
    println!("== campaign ==");
    println!("last scenario: {}", state.last_scenario_id);
    println!("completed: {:?}", state.completed_scenarios);
    for (key, value) in &state.global_variables {
        println!("  {} = {}", key, value);
    }
}

fn run_command(narrative: &Narrative, command: Command) {
    match command {
        Command::Emit { emit, data } => narrative.bus().emit(&emit, data),
        Command::Update { update } => narrative.update(update),
        Command::Dialogue { dialogue } => {
            if !narrative.dialogue().start_dialogue(&dialogue) {
                warn!("Dialogue '{}' did not start", dialogue);
            }
        }
        Command::Choose { choose } => {
            if !narrative.dialogue().select_choice(choose) {
                warn!("Choice {} is not available", choose);
            }
        }
        Command::Fail { fail, reason } => {
            if !narrative.quests().fail_quest(&fail, &reason) {
                warn!("Quest '{}' could not be failed", fail);
            }
        }
        Command::NewGame { .. } => narrative.new_game(),
        Command::Status { .. } => print_status(narrative),
    }
}

fn main() {
    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::from_default_env();
    let filter = match "isometric_narrative=info".parse::<Directive>() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("narrative.toml"));
    let config = match NarrativeConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let storage = FileStorage::new(config.save_dir.clone());
    info!("Campaign saves live in {:?}", storage.dir());
    let narrative = Narrative::new(&config, Box::new(storage));
    narrative.dialogue().set_view(Box::new(ConsoleView));

    let loader = ContentLoader::new(&config.data_dir);
    if let Err(e) = loader.load_into(&narrative) {
        error!("Failed to load content from {:?}: {}", loader.data_dir(), e);
        std::process::exit(1);
    }

    info!("Reading commands from stdin");
    for (line_no, line) in io::stdin().lock().lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to read stdin: {}", e);
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match serde_json::from_str::<Command>(line) {
            Ok(command) => run_command(&narrative, command),
            Err(e) => warn!("Line {}: unrecognised command ({}): {}", line_no + 1, e, line),
        }
    }

    narrative.campaign().save();
}
