//! Table operator CLI
//!
//! Drives tables through plain-JSON state files: start a game, apply actions,
//! replay scripts, and move states in and out of the binary save slots.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tycoon_core::save::current_timestamp;
use tycoon_core::state::io::{export_state_json, import_state_json};
use tycoon_core::{apply_action, Action, GameSettings, GameState, SaveManager};

#[derive(Parser)]
#[command(name = "tycoon_cli")]
#[command(about = "Operate property-trading tables from the shell", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new table and write its state file
    New {
        /// Player names, comma separated (2 to 8)
        #[arg(long, value_delimiter = ',')]
        players: Vec<String>,

        /// Deck shuffle seed; defaults to the wall clock
        #[arg(long)]
        seed: Option<u64>,

        /// Output state file
        #[arg(long)]
        out: PathBuf,
    },

    /// Apply one action to a state file
    Apply {
        /// Input state file
        #[arg(long)]
        state: PathBuf,

        /// Action as JSON, e.g. '{"type":"ROLL_DICE"}'
        #[arg(long)]
        action: String,

        /// Dice and draw seed; defaults to the wall clock
        #[arg(long)]
        seed: Option<u64>,

        /// Output state file; defaults to overwriting --state
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Replay a JSON array of actions, stopping at the first rejection
    Run {
        /// Input state file
        #[arg(long)]
        state: PathBuf,

        /// Script file holding a JSON array of actions
        #[arg(long)]
        script: PathBuf,

        /// Dice and draw seed; defaults to the wall clock
        #[arg(long)]
        seed: Option<u64>,

        /// Output state file; defaults to overwriting --state
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Print balances, deeds, and the recent log of a state file
    Show {
        /// Input state file
        #[arg(long)]
        state: PathBuf,

        /// How many log entries to print
        #[arg(long, default_value = "8")]
        log: usize,
    },

    /// Write a state file into a binary save slot
    SaveSlot {
        /// Input state file
        #[arg(long)]
        state: PathBuf,

        /// Slot number (0 to 2)
        #[arg(long)]
        slot: u8,

        /// Save directory; defaults to ./saves
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Read a binary save slot back out to a state file
    LoadSlot {
        /// Slot number (0 to 2)
        #[arg(long)]
        slot: u8,

        /// Save directory; defaults to ./saves
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Output state file
        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::New { players, seed, out } => {
            let seed = seed.unwrap_or_else(current_timestamp);
            let state = GameState::new_game(&players, GameSettings::default(), seed)?;
            export_state_json(&state, &out)
                .with_context(|| format!("Failed to write state file: {}", out.display()))?;

            println!(
                "✅ New table {} with {} players (seed {seed})",
                state.id,
                state.players.len()
            );
            println!("   State: {}", out.display());
        }

        Commands::Apply {
            state,
            action,
            seed,
            out,
        } => {
            let table = load_state(&state)?;
            let action: Action =
                serde_json::from_str(&action).context("Failed to parse --action JSON")?;

            let seed = seed.unwrap_or_else(current_timestamp);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let next = match apply_action(&table, &action, &mut rng) {
                Ok(next) => next,
                Err(e) => anyhow::bail!("❌ {} rejected: {e}", action.kind_name()),
            };

            let out = out.unwrap_or(state);
            export_state_json(&next, &out)
                .with_context(|| format!("Failed to write state file: {}", out.display()))?;

            println!("✅ {} applied", action.kind_name());
            print_turn_line(&next);
            print_new_log(&table, &next);
            println!("   State: {}", out.display());
        }

        Commands::Run {
            state,
            script,
            seed,
            out,
        } => {
            let table = load_state(&state)?;
            let data = std::fs::read_to_string(&script)
                .with_context(|| format!("Failed to read script file: {}", script.display()))?;
            let actions: Vec<Action> = serde_json::from_str(&data)
                .with_context(|| format!("Failed to parse script file: {}", script.display()))?;

            let seed = seed.unwrap_or_else(current_timestamp);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut current = table;
            for (i, action) in actions.iter().enumerate() {
                match apply_action(&current, action, &mut rng) {
                    Ok(next) => {
                        println!("[{i:>3}] {:<24} ok", action.kind_name());
                        current = next;
                    }
                    Err(e) => anyhow::bail!("❌ step {i} ({}) rejected: {e}", action.kind_name()),
                }
            }

            let out = out.unwrap_or(state);
            export_state_json(&current, &out)
                .with_context(|| format!("Failed to write state file: {}", out.display()))?;

            println!("✅ {} actions applied", actions.len());
            print_turn_line(&current);
            println!("   State: {}", out.display());
        }

        Commands::Show { state, log } => {
            let table = load_state(&state)?;
            print_table(&table, log);
        }

        Commands::SaveSlot { state, slot, dir } => {
            let table = load_state(&state)?;
            let manager = save_manager(dir);
            manager.save_to_slot(slot, &table)?;

            if let Some(info) = manager.slot_info(slot)? {
                println!("✅ {}", info.get_display_text());
                println!("   Saved: {}", info.format_timestamp());
            }
        }

        Commands::LoadSlot { slot, dir, out } => {
            let manager = save_manager(dir);
            let save = manager.load_from_slot(slot)?;
            export_state_json(&save.state, &out)
                .with_context(|| format!("Failed to write state file: {}", out.display()))?;

            println!(
                "✅ Restored table {} (save version {}, turn {})",
                save.state.id, save.version, save.state.turn_number
            );
            println!("   State: {}", out.display());
        }
    }

    Ok(())
}

fn save_manager(dir: Option<PathBuf>) -> SaveManager {
    match dir {
        Some(dir) => SaveManager::new(dir),
        None => SaveManager::with_default_dir(),
    }
}

fn load_state(path: &PathBuf) -> Result<GameState> {
    import_state_json(path)
        .with_context(|| format!("Failed to read state file: {}", path.display()))
}

fn print_turn_line(state: &GameState) {
    let actor = state
        .current_player()
        .map(|p| p.name.as_str())
        .unwrap_or("?");
    match state.last_dice_roll {
        Some((a, b)) => println!(
            "   Turn {}, phase {}, {} to act (last roll {a}+{b})",
            state.turn_number,
            state.phase.wire_name(),
            actor
        ),
        None => println!(
            "   Turn {}, phase {}, {} to act",
            state.turn_number,
            state.phase.wire_name(),
            actor
        ),
    }
}

/// Print the log rows this apply added. Silent once the log sits at its cap.
fn print_new_log(before: &GameState, after: &GameState) {
    for entry in after.log.iter().skip(before.log.len()) {
        println!("   + {}", entry.note);
    }
}

fn print_table(state: &GameState, log_tail: usize) {
    println!(
        "Table {} - turn {}, phase {}",
        state.id,
        state.turn_number,
        state.phase.wire_name()
    );

    for (i, player) in state.players.iter().enumerate() {
        let marker = if i == state.current_player_index { ">" } else { " " };
        let jail = if player.in_jail { "  [in jail]" } else { "" };
        let gone = if player.is_bankrupt { "  [bankrupt]" } else { "" };
        println!(
            "{marker} {:<12} ${:<6} at {:>2}  {} deeds{jail}{gone}",
            player.name,
            player.balance,
            player.position,
            player.owned_property_ids.len()
        );
    }

    if state.free_parking_pot > 0 {
        println!("Free parking pot: ${}", state.free_parking_pot);
    }

    let mut deeds: Vec<String> = Vec::new();
    for (id, prop) in &state.property_states {
        let Some(owner_id) = &prop.owner_id else {
            continue;
        };
        let owner = state
            .player(owner_id)
            .map(|p| p.name.as_str())
            .unwrap_or("?");
        let mut extras: Vec<String> = Vec::new();
        if prop.hotel {
            extras.push("hotel".to_string());
        } else if prop.houses > 0 {
            extras.push(format!("{} houses", prop.houses));
        }
        if prop.mortgaged {
            extras.push("mortgaged".to_string());
        }
        let suffix = if extras.is_empty() {
            String::new()
        } else {
            format!("  ({})", extras.join(", "))
        };
        deeds.push(format!("  {id:<24} {owner}{suffix}"));
    }
    if !deeds.is_empty() {
        println!("Deeds:");
        for line in deeds {
            println!("{line}");
        }
    }

    if !state.log.is_empty() {
        println!("Recent log:");
        let skip = state.log.len().saturating_sub(log_tail);
        for entry in state.log.iter().skip(skip) {
            println!("  {}", entry.note);
        }
    }
}
