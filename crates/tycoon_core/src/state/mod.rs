//! Table state
//!
//! `GameState` is the whole table: players, property ownership, decks, the
//! audit log and the undo history. It is a plain value; callers own it, hand
//! it to `apply_action`, and receive a new value back. Nothing in this module
//! talks to the filesystem or holds globals.

pub mod io;

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::data;
use crate::engine::phase::GamePhase;
use crate::error::{EngineError, Result};
use crate::models::{DeckType, GameSettings, Player, PropertyData, PropertyState, Transaction};

/// Undo snapshots kept per game; the oldest is evicted first.
pub const HISTORY_CAP: usize = 50;
/// Audit-log entries kept per game; the oldest are evicted first.
pub const LOG_CAP: usize = 500;

pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 8;

// =============================================================================
// Pending Events
// =============================================================================

/// Prize selected by the free-parking lottery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FreeParkingPrize {
    Cash { amount: i64 },
    Property { property_id: String },
}

/// Marker for an unresolved randomized event.
///
/// At most one exists at a time. Triggers set it, resolution actions consume
/// it, and a new trigger while one is pending is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PendingEvent {
    Card { card_id: String, deck: DeckType },
    Train { property_id: String },
    Chance { outcome_id: String },
    FreeParking { prize: FreeParkingPrize },
}

// =============================================================================
// Snapshots
// =============================================================================

/// One undo step: the table as it was before an action, minus its own
/// history so snapshots never nest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GameStateSnapshot {
    pub timestamp: u64,
    pub state: GameState,
}

// =============================================================================
// Game State
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GameState {
    pub id: String,
    pub players: Vec<Player>,
    pub current_player_index: usize,
    pub turn_number: u32,
    pub phase: GamePhase,
    pub settings: GameSettings,
    /// Ownership and improvements keyed by property id.
    pub property_states: BTreeMap<String, PropertyState>,
    /// Catalog copy keyed by property id; prices may be amended per table.
    pub property_data: BTreeMap<String, PropertyData>,
    /// Draw piles hold card ids; the card facts live in the static catalog.
    pub chance_deck: Vec<String>,
    #[serde(default)]
    pub chance_discard: Vec<String>,
    pub chest_deck: Vec<String>,
    #[serde(default)]
    pub chest_discard: Vec<String>,
    #[serde(default)]
    pub free_parking_pot: i64,
    #[serde(default)]
    pub last_dice_roll: Option<(u8, u8)>,
    #[serde(default)]
    pub pending_event: Option<PendingEvent>,
    /// Append-only audit log, capped at [`LOG_CAP`].
    #[serde(default)]
    pub log: Vec<Transaction>,
    /// Undo stack, capped at [`HISTORY_CAP`].
    #[serde(default)]
    pub history: Vec<GameStateSnapshot>,
}

impl GameState {
    // ========================
    // Construction
    // ========================

    /// Start a new table with the given players and house rules.
    ///
    /// The seed drives the initial deck shuffle only; later randomness comes
    /// from the RNG handed to each `apply_action` call.
    pub fn new_game(player_names: &[String], settings: GameSettings, seed: u64) -> Result<Self> {
        if player_names.len() < MIN_PLAYERS || player_names.len() > MAX_PLAYERS {
            return Err(EngineError::BadRequest(format!(
                "player count must be {}..={}, got {}",
                MIN_PLAYERS,
                MAX_PLAYERS,
                player_names.len()
            )));
        }

        let players: Vec<Player> = player_names
            .iter()
            .map(|name| Player::new(name.clone(), settings.starting_cash))
            .collect();

        let mut property_states = BTreeMap::new();
        let mut property_data = BTreeMap::new();
        for id in data::property_ids() {
            property_states.insert(id.to_string(), PropertyState::vacant(id));
            if let Some(catalog) = data::property_data(id) {
                property_data.insert(id.to_string(), catalog.clone());
            }
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut chance_deck: Vec<String> = data::deck_cards(DeckType::Chance)
            .iter()
            .map(|c| c.id.clone())
            .collect();
        chance_deck.shuffle(&mut rng);
        let mut chest_deck: Vec<String> = data::deck_cards(DeckType::CommunityChest)
            .iter()
            .map(|c| c.id.clone())
            .collect();
        chest_deck.shuffle(&mut rng);

        Ok(GameState {
            id: Uuid::new_v4().to_string(),
            players,
            current_player_index: 0,
            turn_number: 1,
            phase: GamePhase::Normal,
            settings,
            property_states,
            property_data,
            chance_deck,
            chance_discard: Vec::new(),
            chest_deck,
            chest_discard: Vec::new(),
            free_parking_pot: 0,
            last_dice_roll: None,
            pending_event: None,
            log: Vec::new(),
            history: Vec::new(),
        })
    }

    // ========================
    // Lookups
    // ========================

    pub fn current_player(&self) -> Option<&Player> {
        self.players.get(self.current_player_index)
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn player_mut(&mut self, player_id: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == player_id)
    }

    pub fn player_index(&self, player_id: &str) -> Option<usize> {
        self.players.iter().position(|p| p.id == player_id)
    }

    pub fn property_state(&self, property_id: &str) -> Option<&PropertyState> {
        self.property_states.get(property_id)
    }

    pub fn property_state_mut(&mut self, property_id: &str) -> Option<&mut PropertyState> {
        self.property_states.get_mut(property_id)
    }

    /// Table-local catalog facts, including any amended price.
    pub fn property_data(&self, property_id: &str) -> Option<&PropertyData> {
        self.property_data.get(property_id)
    }

    pub fn deck_mut(&mut self, deck: DeckType) -> (&mut Vec<String>, &mut Vec<String>) {
        match deck {
            DeckType::Chance => (&mut self.chance_deck, &mut self.chance_discard),
            DeckType::CommunityChest => (&mut self.chest_deck, &mut self.chest_discard),
        }
    }

    pub fn non_bankrupt_count(&self) -> usize {
        self.players.iter().filter(|p| !p.is_bankrupt).count()
    }

    // ========================
    // History & Log
    // ========================

    /// Undo snapshot of the current table. The copy drops its own history so
    /// the stack holds flat states, not a pyramid of nested ones.
    pub fn snapshot(&self) -> GameStateSnapshot {
        let mut copy = self.clone();
        copy.history = Vec::new();
        GameStateSnapshot {
            timestamp: now_ms(),
            state: copy,
        }
    }

    pub fn push_snapshot(&mut self, snapshot: GameStateSnapshot) {
        if self.history.len() >= HISTORY_CAP {
            self.history.remove(0);
        }
        self.history.push(snapshot);
    }

    pub fn push_log(&mut self, transaction: Transaction) {
        self.log.push(transaction);
        if self.log.len() > LOG_CAP {
            let excess = self.log.len() - LOG_CAP;
            self.log.drain(0..excess);
        }
    }
}

fn now_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
