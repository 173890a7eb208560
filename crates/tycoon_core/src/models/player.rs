use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::card::DeckType;

/// A seated player at the table.
///
/// Owned by `GameState` and mutated only through action handlers. The balance
/// is signed: forced debits (taxes, card penalties) may push it below zero,
/// which parks the table in the bankruptcy-resolution phase until the debt is
/// settled or the player folds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub balance: i64,
    /// Board position, 0..=39, wraps past GO.
    pub position: usize,
    pub in_jail: bool,
    /// Failed escape rolls during the current jail stay (0..=2).
    #[serde(default)]
    pub jail_turns: u8,
    #[serde(default)]
    pub get_out_of_jail_chance: bool,
    #[serde(default)]
    pub get_out_of_jail_chest: bool,
    /// Owned property ids in acquisition order.
    #[serde(default)]
    pub owned_property_ids: Vec<String>,
    #[serde(default)]
    pub is_bankrupt: bool,
}

impl Player {
    pub fn new(name: impl Into<String>, starting_cash: i64) -> Self {
        Player {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            balance: starting_cash,
            position: 0,
            in_jail: false,
            jail_turns: 0,
            get_out_of_jail_chance: false,
            get_out_of_jail_chest: false,
            owned_property_ids: Vec::new(),
            is_bankrupt: false,
        }
    }

    pub fn owns(&self, property_id: &str) -> bool {
        self.owned_property_ids.iter().any(|id| id == property_id)
    }

    pub fn has_jail_card(&self) -> bool {
        self.get_out_of_jail_chance || self.get_out_of_jail_chest
    }

    pub fn holds_jail_card(&self, deck: DeckType) -> bool {
        match deck {
            DeckType::Chance => self.get_out_of_jail_chance,
            DeckType::CommunityChest => self.get_out_of_jail_chest,
        }
    }

    pub fn set_jail_card(&mut self, deck: DeckType, held: bool) {
        match deck {
            DeckType::Chance => self.get_out_of_jail_chance = held,
            DeckType::CommunityChest => self.get_out_of_jail_chest = held,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_player_starts_at_go_with_cash() {
        let p = Player::new("Alice", 1500);
        assert_eq!(p.balance, 1500);
        assert_eq!(p.position, 0);
        assert!(!p.in_jail);
        assert!(!p.is_bankrupt);
        assert!(p.owned_property_ids.is_empty());
        assert!(!p.id.is_empty());
    }

    #[test]
    fn ids_are_unique() {
        let a = Player::new("A", 0);
        let b = Player::new("B", 0);
        assert_ne!(a.id, b.id);
    }
}
