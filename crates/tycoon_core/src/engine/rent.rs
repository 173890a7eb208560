//! Rent math and building eligibility.
//!
//! Pure reads over `GameState`; nothing here mutates. Handlers call these to
//! price a landing or to vet a build, and the JSON boundary exposes
//! [`rent_due`] directly for "what would this cost" queries.

use crate::data;
use crate::error::{EngineError, Result};
use crate::models::MAX_HOUSES;
use crate::state::GameState;

/// Rent multipliers by owned-railroad count (1..=4).
const RAILROAD_RENTS: [i64; 4] = [25, 50, 100, 200];
/// Utility rent is dice-sum times 4 (one owned) or 10 (both owned).
const UTILITY_SINGLE_MULTIPLIER: i64 = 4;
const UTILITY_DOUBLE_MULTIPLIER: i64 = 10;

/// What a landing costs, or the fact that it cannot be priced yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RentAmount {
    Amount(i64),
    /// Utility rent with no dice roll on record.
    RollRequired,
}

impl RentAmount {
    pub fn amount_or_zero(&self) -> i64 {
        match self {
            RentAmount::Amount(v) => *v,
            RentAmount::RollRequired => 0,
        }
    }
}

/// Rent owed for landing on `property_id`.
///
/// Unowned and mortgaged spaces rent for zero. Utilities price off `dice`;
/// without one the answer is [`RentAmount::RollRequired`], never a guess.
pub fn rent_due(
    state: &GameState,
    property_id: &str,
    dice: Option<(u8, u8)>,
) -> Result<RentAmount> {
    let prop_data = state
        .property_data(property_id)
        .ok_or_else(|| EngineError::PropertyNotFound(property_id.to_string()))?;
    let prop_state = state
        .property_state(property_id)
        .ok_or_else(|| EngineError::PropertyNotFound(property_id.to_string()))?;

    let owner_id = match &prop_state.owner_id {
        Some(id) => id.as_str(),
        None => return Ok(RentAmount::Amount(0)),
    };
    if prop_state.mortgaged {
        return Ok(RentAmount::Amount(0));
    }

    match prop_data.group.as_str() {
        "utility" => {
            let owned = owned_in_group(state, owner_id, "utility");
            let multiplier = if owned >= 2 {
                UTILITY_DOUBLE_MULTIPLIER
            } else {
                UTILITY_SINGLE_MULTIPLIER
            };
            match dice {
                Some((a, b)) => Ok(RentAmount::Amount((a as i64 + b as i64) * multiplier)),
                None => Ok(RentAmount::RollRequired),
            }
        }
        "railroad" => {
            let owned = owned_in_group(state, owner_id, "railroad");
            let rent = RAILROAD_RENTS
                .get(owned.saturating_sub(1))
                .copied()
                .unwrap_or(0);
            Ok(RentAmount::Amount(rent))
        }
        _ => {
            if prop_state.hotel {
                Ok(RentAmount::Amount(prop_data.rent_with_hotel))
            } else if prop_state.houses > 0 {
                let rent = prop_data
                    .rent_with_houses
                    .get(prop_state.houses as usize - 1)
                    .copied()
                    .unwrap_or(prop_data.rent);
                Ok(RentAmount::Amount(rent))
            } else {
                Ok(RentAmount::Amount(prop_data.rent))
            }
        }
    }
}

/// How many spaces of `group_id` the player owns.
fn owned_in_group(state: &GameState, player_id: &str, group_id: &str) -> usize {
    data::group_members(group_id)
        .iter()
        .filter(|id| {
            state
                .property_state(id)
                .map(|p| p.owner_id.as_deref() == Some(player_id))
                .unwrap_or(false)
        })
        .count()
}

/// Whether the player owns every space in the color group.
pub fn has_monopoly(state: &GameState, player_id: &str, group_id: &str) -> bool {
    let members = data::group_members(group_id);
    !members.is_empty() && owned_in_group(state, player_id, group_id) == members.len()
}

/// Whether one more house may go on this street.
pub fn can_build_house(state: &GameState, property_id: &str, player_id: &str) -> bool {
    let (Some(prop_data), Some(prop_state)) = (
        state.property_data(property_id),
        state.property_state(property_id),
    ) else {
        return false;
    };
    prop_data.is_street()
        && prop_state.owner_id.as_deref() == Some(player_id)
        && !prop_state.hotel
        && prop_state.houses < MAX_HOUSES
        && has_monopoly(state, player_id, &prop_data.group)
}

/// Whether the street is ready for its hotel.
pub fn can_build_hotel(state: &GameState, property_id: &str, player_id: &str) -> bool {
    let (Some(prop_data), Some(prop_state)) = (
        state.property_data(property_id),
        state.property_state(property_id),
    ) else {
        return false;
    };
    prop_data.is_street()
        && prop_state.owner_id.as_deref() == Some(player_id)
        && !prop_state.hotel
        && prop_state.houses == MAX_HOUSES
        && has_monopoly(state, player_id, &prop_data.group)
}

/// Even-building check: would setting this property to `target_level` leave
/// an improvement gap wider than one anywhere in its group?
pub fn even_build_allows(state: &GameState, property_id: &str, target_level: u8) -> bool {
    let Some(prop_data) = state.property_data(property_id) else {
        return false;
    };
    let mut min = target_level;
    let mut max = target_level;
    for id in data::group_members(&prop_data.group) {
        if id == property_id {
            continue;
        }
        let level = state
            .property_state(id)
            .map(|p| p.improvement_level())
            .unwrap_or(0);
        min = min.min(level);
        max = max.max(level);
    }
    max - min <= 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GameSettings;

    fn game() -> GameState {
        let names = vec!["Ann".to_string(), "Ben".to_string()];
        GameState::new_game(&names, GameSettings::default(), 0).unwrap()
    }

    fn give(state: &mut GameState, player_idx: usize, property_id: &str) {
        let owner = state.players[player_idx].id.clone();
        state.players[player_idx]
            .owned_property_ids
            .push(property_id.to_string());
        state.property_state_mut(property_id).unwrap().owner_id = Some(owner);
    }

    #[test]
    fn unowned_rents_for_zero() {
        let state = game();
        assert_eq!(
            rent_due(&state, "boardwalk", None).unwrap(),
            RentAmount::Amount(0)
        );
    }

    #[test]
    fn base_rent_without_improvements() {
        let mut state = game();
        give(&mut state, 0, "mediterranean");
        assert_eq!(
            rent_due(&state, "mediterranean", None).unwrap(),
            RentAmount::Amount(2)
        );
    }

    #[test]
    fn mortgaged_rents_for_zero() {
        let mut state = game();
        give(&mut state, 0, "boardwalk");
        state.property_state_mut("boardwalk").unwrap().mortgaged = true;
        assert_eq!(
            rent_due(&state, "boardwalk", None).unwrap(),
            RentAmount::Amount(0)
        );
    }

    #[test]
    fn house_tiers_and_hotel() {
        let mut state = game();
        give(&mut state, 0, "boardwalk");
        state.property_state_mut("boardwalk").unwrap().houses = 3;
        assert_eq!(
            rent_due(&state, "boardwalk", None).unwrap(),
            RentAmount::Amount(1400)
        );
        let prop = state.property_state_mut("boardwalk").unwrap();
        prop.houses = 0;
        prop.hotel = true;
        assert_eq!(
            rent_due(&state, "boardwalk", None).unwrap(),
            RentAmount::Amount(2000)
        );
    }

    #[test]
    fn railroad_rent_scales_with_count() {
        let mut state = game();
        give(&mut state, 0, "reading-railroad");
        assert_eq!(
            rent_due(&state, "reading-railroad", None).unwrap(),
            RentAmount::Amount(25)
        );
        give(&mut state, 0, "pennsylvania-railroad");
        give(&mut state, 0, "bno-railroad");
        assert_eq!(
            rent_due(&state, "reading-railroad", None).unwrap(),
            RentAmount::Amount(100)
        );
        give(&mut state, 0, "short-line");
        assert_eq!(
            rent_due(&state, "bno-railroad", None).unwrap(),
            RentAmount::Amount(200)
        );
    }

    #[test]
    fn utility_rent_needs_dice() {
        let mut state = game();
        give(&mut state, 0, "electric-company");
        assert_eq!(
            rent_due(&state, "electric-company", None).unwrap(),
            RentAmount::RollRequired
        );
        assert_eq!(
            rent_due(&state, "electric-company", Some((3, 4))).unwrap(),
            RentAmount::Amount(28)
        );
        give(&mut state, 0, "water-works");
        assert_eq!(
            rent_due(&state, "electric-company", Some((3, 4))).unwrap(),
            RentAmount::Amount(70)
        );
    }

    #[test]
    fn monopoly_needs_every_member() {
        let mut state = game();
        let ann = state.players[0].id.clone();
        give(&mut state, 0, "mediterranean");
        assert!(!has_monopoly(&state, &ann, "brown"));
        give(&mut state, 0, "baltic");
        assert!(has_monopoly(&state, &ann, "brown"));
        assert!(!has_monopoly(&state, &ann, "no-such-group"));
    }

    #[test]
    fn house_building_needs_monopoly_and_room() {
        let mut state = game();
        let ann = state.players[0].id.clone();
        give(&mut state, 0, "mediterranean");
        assert!(!can_build_house(&state, "mediterranean", &ann));
        give(&mut state, 0, "baltic");
        assert!(can_build_house(&state, "mediterranean", &ann));

        state.property_state_mut("mediterranean").unwrap().houses = 4;
        assert!(!can_build_house(&state, "mediterranean", &ann));
        assert!(can_build_hotel(&state, "mediterranean", &ann));

        let prop = state.property_state_mut("mediterranean").unwrap();
        prop.houses = 0;
        prop.hotel = true;
        assert!(!can_build_house(&state, "mediterranean", &ann));
        assert!(!can_build_hotel(&state, "mediterranean", &ann));
    }

    #[test]
    fn railroads_never_take_houses() {
        let mut state = game();
        let ann = state.players[0].id.clone();
        for id in ["reading-railroad", "pennsylvania-railroad", "bno-railroad", "short-line"] {
            give(&mut state, 0, id);
        }
        assert!(!can_build_house(&state, "reading-railroad", &ann));
    }

    #[test]
    fn even_building_limits_the_gap() {
        let mut state = game();
        give(&mut state, 0, "mediterranean");
        give(&mut state, 0, "baltic");
        // First house anywhere is fine.
        assert!(even_build_allows(&state, "mediterranean", 1));
        state.property_state_mut("mediterranean").unwrap().houses = 1;
        // Second house on the same street would leave baltic two behind.
        assert!(!even_build_allows(&state, "mediterranean", 2));
        assert!(even_build_allows(&state, "baltic", 1));
    }
}
