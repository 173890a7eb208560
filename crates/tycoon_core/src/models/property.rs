use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Houses allowed before a hotel replaces them.
pub const MAX_HOUSES: u8 = 4;

/// Catalog facts about one purchasable space.
///
/// Copied from the board catalog into each new game so manual price
/// amendments (negotiated purchases) stay local to that table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PropertyData {
    pub id: String,
    pub name: String,
    pub price: i64,
    /// Base rent with no improvements. Unused for railroads and utilities,
    /// which derive rent from ownership count and dice.
    pub rent: i64,
    /// Rent at 1..=4 houses.
    pub rent_with_houses: Vec<i64>,
    pub rent_with_hotel: i64,
    pub house_cost: i64,
    pub hotel_cost: i64,
    /// Color group id, or `railroad` / `utility`.
    pub group: String,
    pub mortgage_value: i64,
}

impl PropertyData {
    pub fn is_street(&self) -> bool {
        self.group != "railroad" && self.group != "utility"
    }
}

/// Mutable per-game state of one purchasable space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PropertyState {
    pub property_id: String,
    pub owner_id: Option<String>,
    #[serde(default)]
    pub mortgaged: bool,
    #[serde(default)]
    pub houses: u8,
    #[serde(default)]
    pub hotel: bool,
}

impl PropertyState {
    pub fn vacant(property_id: impl Into<String>) -> Self {
        PropertyState {
            property_id: property_id.into(),
            owner_id: None,
            mortgaged: false,
            houses: 0,
            hotel: false,
        }
    }

    /// Improvement level used by the even-building rule: houses count one
    /// each, a hotel counts as five.
    pub fn improvement_level(&self) -> u8 {
        if self.hotel {
            MAX_HOUSES + 1
        } else {
            self.houses
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vacant_state_has_nothing_built() {
        let s = PropertyState::vacant("boardwalk");
        assert_eq!(s.owner_id, None);
        assert!(!s.mortgaged);
        assert_eq!(s.improvement_level(), 0);
    }

    #[test]
    fn hotel_outranks_houses_for_level() {
        let mut s = PropertyState::vacant("boardwalk");
        s.houses = 4;
        assert_eq!(s.improvement_level(), 4);
        s.houses = 0;
        s.hotel = true;
        assert_eq!(s.improvement_level(), 5);
    }
}
