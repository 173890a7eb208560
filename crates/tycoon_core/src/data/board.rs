//! Board catalog loading.
//!
//! The 40-space layout ships inside the binary; `board()` parses it once and
//! every later call hits the cache.

use std::collections::HashMap;
use std::sync::OnceLock;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::models::PropertyData;

// =============================================================================
// Embedded YAML Data
// =============================================================================

/// Board layout (compile-time embedded).
pub const BOARD_YAML: &str = include_str!("../../../../data/board.yaml");

pub const BOARD_SIZE: usize = 40;
pub const GO_POSITION: usize = 0;
pub const JAIL_POSITION: usize = 10;
pub const FREE_PARKING_POSITION: usize = 20;
pub const GO_TO_JAIL_POSITION: usize = 30;

// =============================================================================
// Catalog Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpaceKind {
    Go,
    Property,
    Railroad,
    Utility,
    Tax,
    Chance,
    CommunityChest,
    Jail,
    FreeParking,
    GoToJail,
}

#[derive(Debug, Clone)]
pub struct BoardSpace {
    pub id: String,
    pub name: String,
    pub kind: SpaceKind,
    pub position: usize,
    /// Set only for TAX spaces.
    pub tax: Option<i64>,
    /// Set for PROPERTY, RAILROAD and UTILITY spaces.
    pub property: Option<PropertyData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PropertyGroup {
    pub id: String,
    pub name: String,
    pub property_ids: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Board {
    /// Indexed by position.
    pub spaces: Vec<BoardSpace>,
    pub groups: Vec<PropertyGroup>,
}

// =============================================================================
// YAML Shapes
// =============================================================================

#[derive(Deserialize)]
struct RawBoard {
    spaces: Vec<RawSpace>,
    groups: Vec<PropertyGroup>,
}

#[derive(Deserialize)]
struct RawSpace {
    id: String,
    name: String,
    kind: SpaceKind,
    position: usize,
    #[serde(default)]
    tax: Option<i64>,
    #[serde(default)]
    property: Option<RawProperty>,
}

/// Property block without id/name; those come from the owning space.
#[derive(Deserialize)]
struct RawProperty {
    price: i64,
    rent: i64,
    rent_with_houses: Vec<i64>,
    rent_with_hotel: i64,
    house_cost: i64,
    hotel_cost: i64,
    group: String,
    mortgage_value: i64,
}

// =============================================================================
// Static Caching
// =============================================================================

static BOARD: OnceLock<Board> = OnceLock::new();

/// Position of each purchasable space keyed by property id.
static PROPERTY_INDEX: Lazy<HashMap<&'static str, usize>> = Lazy::new(|| {
    board()
        .spaces
        .iter()
        .filter(|s| s.property.is_some())
        .map(|s| (s.id.as_str(), s.position))
        .collect()
});

// =============================================================================
// Public API
// =============================================================================

/// Load the board catalog.
///
/// # Panics
///
/// Panics if the embedded YAML does not parse or the layout is inconsistent;
/// both indicate a broken build, not a runtime condition.
pub fn board() -> &'static Board {
    BOARD.get_or_init(|| {
        let raw: RawBoard = serde_yaml::from_str(BOARD_YAML).expect("Failed to parse board.yaml");
        let mut spaces: Vec<BoardSpace> = raw
            .spaces
            .into_iter()
            .map(|s| BoardSpace {
                property: s.property.map(|p| PropertyData {
                    id: s.id.clone(),
                    name: s.name.clone(),
                    price: p.price,
                    rent: p.rent,
                    rent_with_houses: p.rent_with_houses,
                    rent_with_hotel: p.rent_with_hotel,
                    house_cost: p.house_cost,
                    hotel_cost: p.hotel_cost,
                    group: p.group,
                    mortgage_value: p.mortgage_value,
                }),
                id: s.id,
                name: s.name,
                kind: s.kind,
                position: s.position,
                tax: s.tax,
            })
            .collect();
        spaces.sort_by_key(|s| s.position);
        assert_eq!(spaces.len(), BOARD_SIZE, "board.yaml must define 40 spaces");
        for (i, s) in spaces.iter().enumerate() {
            assert_eq!(s.position, i, "board.yaml positions must be contiguous");
        }
        Board {
            spaces,
            groups: raw.groups,
        }
    })
}

pub fn space_at(position: usize) -> Option<&'static BoardSpace> {
    board().spaces.get(position)
}

/// Catalog facts for a purchasable space.
pub fn property_data(property_id: &str) -> Option<&'static PropertyData> {
    let position = *PROPERTY_INDEX.get(property_id)?;
    board().spaces[position].property.as_ref()
}

/// Ids of every purchasable space in board order.
pub fn property_ids() -> Vec<&'static str> {
    board()
        .spaces
        .iter()
        .filter(|s| s.property.is_some())
        .map(|s| s.id.as_str())
        .collect()
}

pub fn group(group_id: &str) -> Option<&'static PropertyGroup> {
    board().groups.iter().find(|g| g.id == group_id)
}

pub fn group_members(group_id: &str) -> &'static [String] {
    const EMPTY: &[String] = &[];
    group(group_id).map(|g| g.property_ids.as_slice()).unwrap_or(EMPTY)
}

/// Next railroad strictly ahead of `from`, wrapping past GO.
pub fn nearest_railroad(from: usize) -> usize {
    nearest_of_kind(from, SpaceKind::Railroad)
}

/// Next utility strictly ahead of `from`, wrapping past GO.
pub fn nearest_utility(from: usize) -> usize {
    nearest_of_kind(from, SpaceKind::Utility)
}

fn nearest_of_kind(from: usize, kind: SpaceKind) -> usize {
    let positions: Vec<usize> = board()
        .spaces
        .iter()
        .filter(|s| s.kind == kind)
        .map(|s| s.position)
        .collect();
    positions
        .iter()
        .copied()
        .find(|&p| p > from)
        .or_else(|| positions.first().copied())
        .unwrap_or(from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn board_has_standard_layout() {
        let b = board();
        assert_eq!(b.spaces.len(), 40);
        assert_eq!(b.spaces[GO_POSITION].kind, SpaceKind::Go);
        assert_eq!(b.spaces[JAIL_POSITION].kind, SpaceKind::Jail);
        assert_eq!(b.spaces[FREE_PARKING_POSITION].kind, SpaceKind::FreeParking);
        assert_eq!(b.spaces[GO_TO_JAIL_POSITION].kind, SpaceKind::GoToJail);
        assert_eq!(property_ids().len(), 28);
    }

    #[test]
    fn tax_spaces_carry_amounts() {
        assert_eq!(space_at(4).and_then(|s| s.tax), Some(200));
        assert_eq!(space_at(38).and_then(|s| s.tax), Some(100));
    }

    #[test]
    fn mortgage_is_half_price_everywhere() {
        for id in property_ids() {
            let data = property_data(id).unwrap();
            assert_eq!(data.mortgage_value, data.price / 2, "{}", id);
        }
    }

    #[test]
    fn groups_agree_with_spaces() {
        for g in &board().groups {
            for pid in &g.property_ids {
                let data = property_data(pid).unwrap_or_else(|| panic!("missing {}", pid));
                assert_eq!(&data.group, &g.id, "{}", pid);
            }
        }
        assert_eq!(group_members("railroad").len(), 4);
        assert_eq!(group_members("utility").len(), 2);
        assert_eq!(group_members("brown").len(), 2);
        assert_eq!(group_members("dark-blue").len(), 2);
    }

    #[test]
    fn street_rent_tables_have_four_house_tiers() {
        for id in property_ids() {
            let data = property_data(id).unwrap();
            if data.is_street() {
                assert_eq!(data.rent_with_houses.len(), 4, "{}", id);
                assert!(data.rent_with_hotel > data.rent_with_houses[3], "{}", id);
            }
        }
    }

    #[test]
    fn nearest_lookups_wrap() {
        assert_eq!(nearest_railroad(7), 15);
        assert_eq!(nearest_railroad(22), 25);
        assert_eq!(nearest_railroad(36), 5);
        assert_eq!(nearest_utility(7), 12);
        assert_eq!(nearest_utility(22), 28);
        assert_eq!(nearest_utility(36), 12);
    }
}
