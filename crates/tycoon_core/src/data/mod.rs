//! Embedded static catalogs: board layout, card decks, chance-event outcomes.
//!
//! All three are YAML files embedded at compile time and parsed once on first
//! access. Game state never copies the card or outcome catalogs; it holds ids
//! into them. The property catalog IS copied per game, because table rules
//! allow amending a price at purchase time.

pub mod board;
pub mod cards;
pub mod outcomes;

pub use board::{
    board, group_members, nearest_railroad, nearest_utility, property_data, property_ids,
    space_at, Board, BoardSpace, PropertyGroup, SpaceKind, BOARD_SIZE, FREE_PARKING_POSITION,
    GO_POSITION, GO_TO_JAIL_POSITION, JAIL_POSITION,
};
pub use cards::{card, deck_cards, jail_card_id};
pub use outcomes::{outcome, outcomes, ChanceOutcome, OutcomeAction, OutcomeKind};
