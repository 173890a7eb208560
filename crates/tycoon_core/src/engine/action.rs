//! The action wire format.
//!
//! Every table mutation arrives as one of these tagged values. Payload fields
//! marked optional let the caller override a default (a negotiated price, a
//! fixed dice roll for replays); absent means "use the rules".

use std::collections::BTreeMap;

use schemars::gen::SchemaGenerator;
use schemars::schema::Schema;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::models::DeckType;

/// Who absorbs a bankrupt player's estate.
///
/// Serialized as the literal string `"BANK"` or a player id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Creditor {
    Bank,
    Player(String),
}

impl From<String> for Creditor {
    fn from(value: String) -> Self {
        if value == crate::models::BANK {
            Creditor::Bank
        } else {
            Creditor::Player(value)
        }
    }
}

impl From<Creditor> for String {
    fn from(value: Creditor) -> Self {
        match value {
            Creditor::Bank => crate::models::BANK.to_string(),
            Creditor::Player(id) => id,
        }
    }
}

impl JsonSchema for Creditor {
    fn schema_name() -> String {
        "Creditor".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        // Plain string on the wire: "BANK" or a player id.
        String::json_schema(gen)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    // ========================
    // Turn flow
    // ========================
    /// Roll (or replay `dice`), move, and resolve the landing.
    RollDice {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dice: Option<(u8, u8)>,
    },
    EndTurn,
    /// Manual GO credit for table corrections.
    PassGo,
    ManualPosition {
        player_id: String,
        position: usize,
    },

    // ========================
    // Jail
    // ========================
    /// Send the current player to jail (the go-to-jail landing, manually).
    GoToJail,
    /// Flag the current player as jailed without moving the token.
    EnterJail,
    /// Release the current player without payment.
    LeaveJail,
    PayJailFine,
    UseJailCard,

    // ========================
    // Property
    // ========================
    BuyProperty {
        property_id: String,
        /// Negotiated price; defaults to the catalog price.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        price: Option<i64>,
    },
    /// Current player pays the computed rent for this property.
    PayRent {
        property_id: String,
    },
    /// Manual rent entry: `from_player_id` collects, `to_player_id` pays.
    CollectRent {
        from_player_id: String,
        to_player_id: String,
        amount: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        property_id: Option<String>,
    },
    MortgageProperty {
        property_id: String,
    },
    UnmortgageProperty {
        property_id: String,
    },
    BuyHouse {
        property_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cost: Option<i64>,
    },
    SellHouse {
        property_id: String,
    },
    BuyHotel {
        property_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cost: Option<i64>,
    },
    SellHotel {
        property_id: String,
    },
    ManualOwnership {
        property_id: String,
        /// `None` returns the property to the bank.
        #[serde(default)]
        owner_id: Option<String>,
    },

    // ========================
    // Money & trades
    // ========================
    AdjustBalance {
        player_id: String,
        amount: i64,
        reason: String,
    },
    TransferCash {
        from_player_id: String,
        to_player_id: String,
        amount: i64,
        reason: String,
    },
    /// Atomic swap of cash, property bundles and jail-card entitlements
    /// between two players.
    TradeExecute {
        from_player_id: String,
        to_player_id: String,
        #[serde(default)]
        cash_from: i64,
        #[serde(default)]
        cash_to: i64,
        #[serde(default)]
        properties_from: Vec<String>,
        #[serde(default)]
        properties_to: Vec<String>,
        /// Get-out-of-jail entitlements each side hands over, by source deck.
        #[serde(default)]
        jail_cards_from: Vec<DeckType>,
        #[serde(default)]
        jail_cards_to: Vec<DeckType>,
    },
    DeclareBankruptcy {
        player_id: String,
        creditor: Creditor,
    },

    // ========================
    // Cards
    // ========================
    DrawCard {
        deck: DeckType,
    },
    /// Resolve the pending drawn card.
    ApplyCardEffect,

    // ========================
    // Table events
    // ========================
    TrainEventTrigger,
    /// Re-point the pending train event at a chosen property.
    TrainEventStop {
        property_id: String,
    },
    TrainEventBuy {
        property_id: String,
        price: i64,
    },
    TrainEventSkip,
    TrainEventPayRent {
        property_id: String,
        amount: i64,
    },
    ChanceEventTrigger,
    ChanceEventApply {
        outcome_id: String,
        /// Manual figure for outcomes whose default is zero.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        amount: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        property_id: Option<String>,
        /// Per-player figures for the per-head outcomes, keyed by player id.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        player_payments: Option<BTreeMap<String, i64>>,
    },
    FreeParkingEventTrigger,
    FreeParkingEventAccept,

    // ========================
    // History
    // ========================
    UndoLast,
}

impl Action {
    /// Wire tag, for logs and error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Action::RollDice { .. } => "ROLL_DICE",
            Action::EndTurn => "END_TURN",
            Action::PassGo => "PASS_GO",
            Action::ManualPosition { .. } => "MANUAL_POSITION",
            Action::GoToJail => "GO_TO_JAIL",
            Action::EnterJail => "ENTER_JAIL",
            Action::LeaveJail => "LEAVE_JAIL",
            Action::PayJailFine => "PAY_JAIL_FINE",
            Action::UseJailCard => "USE_JAIL_CARD",
            Action::BuyProperty { .. } => "BUY_PROPERTY",
            Action::PayRent { .. } => "PAY_RENT",
            Action::CollectRent { .. } => "COLLECT_RENT",
            Action::MortgageProperty { .. } => "MORTGAGE_PROPERTY",
            Action::UnmortgageProperty { .. } => "UNMORTGAGE_PROPERTY",
            Action::BuyHouse { .. } => "BUY_HOUSE",
            Action::SellHouse { .. } => "SELL_HOUSE",
            Action::BuyHotel { .. } => "BUY_HOTEL",
            Action::SellHotel { .. } => "SELL_HOTEL",
            Action::ManualOwnership { .. } => "MANUAL_OWNERSHIP",
            Action::AdjustBalance { .. } => "ADJUST_BALANCE",
            Action::TransferCash { .. } => "TRANSFER_CASH",
            Action::TradeExecute { .. } => "TRADE_EXECUTE",
            Action::DeclareBankruptcy { .. } => "DECLARE_BANKRUPTCY",
            Action::DrawCard { .. } => "DRAW_CARD",
            Action::ApplyCardEffect => "APPLY_CARD_EFFECT",
            Action::TrainEventTrigger => "TRAIN_EVENT_TRIGGER",
            Action::TrainEventStop { .. } => "TRAIN_EVENT_STOP",
            Action::TrainEventBuy { .. } => "TRAIN_EVENT_BUY",
            Action::TrainEventSkip => "TRAIN_EVENT_SKIP",
            Action::TrainEventPayRent { .. } => "TRAIN_EVENT_PAY_RENT",
            Action::ChanceEventTrigger => "CHANCE_EVENT_TRIGGER",
            Action::ChanceEventApply { .. } => "CHANCE_EVENT_APPLY",
            Action::FreeParkingEventTrigger => "FREE_PARKING_EVENT_TRIGGER",
            Action::FreeParkingEventAccept => "FREE_PARKING_EVENT_ACCEPT",
            Action::UndoLast => "UNDO_LAST",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_matches_kind_name() {
        let action = Action::BuyProperty {
            property_id: "boardwalk".into(),
            price: None,
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "BUY_PROPERTY");
        assert_eq!(action.kind_name(), "BUY_PROPERTY");
    }

    #[test]
    fn optional_payloads_default() {
        let action: Action = serde_json::from_str(r#"{"type":"ROLL_DICE"}"#).unwrap();
        assert_eq!(action, Action::RollDice { dice: None });

        let action: Action =
            serde_json::from_str(r#"{"type":"ROLL_DICE","dice":[3,4]}"#).unwrap();
        assert_eq!(action, Action::RollDice { dice: Some((3, 4)) });
    }

    #[test]
    fn creditor_round_trips_as_plain_string() {
        let bank: Creditor = serde_json::from_str("\"BANK\"").unwrap();
        assert_eq!(bank, Creditor::Bank);
        let player: Creditor = serde_json::from_str("\"p-17\"").unwrap();
        assert_eq!(player, Creditor::Player("p-17".into()));
        assert_eq!(serde_json::to_string(&Creditor::Bank).unwrap(), "\"BANK\"");
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let err = serde_json::from_str::<Action>(r#"{"type":"FLY_TO_MOON"}"#).unwrap_err();
        assert!(err.to_string().contains("unknown variant"));
    }
}
