//! # tycoon_core - Turn-Based Property Trading Game Engine
//!
//! This library provides a deterministic rules engine for a property trading
//! board game, with a JSON API for easy integration with host UIs.
//!
//! ## Features
//! - Pure action reducer: `apply_action(state, action, rng) -> new state`
//! - Failed actions never mutate the caller's state
//! - Built-in undo history and append-only audit log
//! - Checksummed, compressed save files with slot management
//! - JSON API for table creation, actions and rent queries

// Large enum variants - boxing would require API changes
#![allow(clippy::large_enum_variant)]

pub mod api;
pub mod data;
pub mod engine;
pub mod error;
pub mod models;
pub mod save;
pub mod state;

// Re-export main API functions
pub use api::{
    apply_action_json, new_game_json, rent_query_json, ApplyRequest, ApplyResponse,
    NewGameRequest, NewPlayer, RentQueryRequest, RentQueryResponse,
};
pub use error::{EngineError, Result};

// Re-export engine entry points
pub use engine::{
    allowed_in_phase, apply_action, rent_due, Action, Creditor, GamePhase, RentAmount,
};

// Re-export core models
pub use models::{
    Card, CardEffect, DeckType, GameSettings, Player, PropertyData, PropertyState, Transaction,
    TransactionKind, BANK,
};

// Re-export save system
pub use save::{SaveError, SaveManager, TableSave};

// Re-export state management
pub use state::{GameState, GameStateSnapshot, PendingEvent};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub use api::SCHEMA_VERSION;
