use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeckType {
    Chance,
    CommunityChest,
}

impl DeckType {
    pub fn label(&self) -> &'static str {
        match self {
            DeckType::Chance => "Chance",
            DeckType::CommunityChest => "Community Chest",
        }
    }
}

/// What a drawn card does when its effect is applied.
///
/// Movement effects re-run landing resolution at the destination, so a card
/// can chain into a tax, another draw, or jail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CardEffect {
    /// Positive collects from the bank, negative pays the bank (forced).
    Money { amount: i64 },
    /// Relative movement; negative steps move backward without a GO credit.
    Move { spaces: i32 },
    /// Absolute movement. Target 10 means straight to jail, no GO credit.
    MoveTo { target_position: usize },
    GetOutOfJail,
    /// Charged per improvement across everything the player owns.
    Repairs { per_house: i64, per_hotel: i64 },
    AdvanceToRailroad,
    AdvanceToUtility,
    #[serde(rename = "GO_BACK_3")]
    GoBack3,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Card {
    pub id: String,
    pub deck: DeckType,
    pub text: String,
    pub effect: CardEffect,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effect_tags_use_wire_names() {
        let json = serde_json::to_string(&CardEffect::MoveTo { target_position: 24 }).unwrap();
        assert_eq!(json, r#"{"kind":"MOVE_TO","target_position":24}"#);

        let json = serde_json::to_string(&CardEffect::GoBack3).unwrap();
        assert_eq!(json, r#"{"kind":"GO_BACK_3"}"#);
    }

    #[test]
    fn deck_types_use_wire_names() {
        assert_eq!(serde_json::to_string(&DeckType::Chance).unwrap(), "\"CHANCE\"");
        assert_eq!(
            serde_json::to_string(&DeckType::CommunityChest).unwrap(),
            "\"COMMUNITY_CHEST\""
        );
    }
}
