//! Turn phases and the per-phase action gate.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::engine::action::Action;

/// Where the current turn stands.
///
/// Phases narrow the legal action set; they do not drive anything by
/// themselves. `Trade` exists for tables that want an explicit negotiation
/// window, but `TRADE_EXECUTE` also works straight from `Normal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(test, derive(strum_macros::EnumIter))]
pub enum GamePhase {
    Normal,
    InJailDecision,
    CardDraw,
    Trade,
    BankruptcyResolution,
}

impl GamePhase {
    pub fn wire_name(&self) -> &'static str {
        match self {
            GamePhase::Normal => "NORMAL",
            GamePhase::InJailDecision => "IN_JAIL_DECISION",
            GamePhase::CardDraw => "CARD_DRAW",
            GamePhase::Trade => "TRADE",
            GamePhase::BankruptcyResolution => "BANKRUPTCY_RESOLUTION",
        }
    }
}

/// Phase gate checked before any handler runs.
///
/// Admin corrections, undo and bankruptcy always pass: the table owner must
/// be able to fix a mistake no matter where the turn stands. Money-raising
/// moves (mortgage, sales, trades) stay legal outside `Normal` so a jailed or
/// indebted player can settle up. A pending card blocks everything else until
/// it is applied.
pub fn allowed_in_phase(action: &Action, phase: GamePhase) -> bool {
    use GamePhase::*;
    match action {
        Action::RollDice { .. } => matches!(phase, Normal | InJailDecision),
        Action::PayJailFine | Action::UseJailCard => phase == InJailDecision,
        Action::ApplyCardEffect => phase == CardDraw,
        Action::DrawCard { .. } => phase == Normal,
        Action::TrainEventTrigger
        | Action::ChanceEventTrigger
        | Action::FreeParkingEventTrigger => phase == Normal,
        Action::BuyProperty { .. }
        | Action::PayRent { .. }
        | Action::CollectRent { .. }
        | Action::MortgageProperty { .. }
        | Action::UnmortgageProperty { .. }
        | Action::BuyHouse { .. }
        | Action::SellHouse { .. }
        | Action::BuyHotel { .. }
        | Action::SellHotel { .. }
        | Action::TradeExecute { .. } => phase != CardDraw,
        Action::TrainEventStop { .. }
        | Action::TrainEventBuy { .. }
        | Action::TrainEventSkip
        | Action::TrainEventPayRent { .. }
        | Action::ChanceEventApply { .. }
        | Action::FreeParkingEventAccept => phase != CardDraw,
        // Admin and flow-control actions.
        Action::EndTurn
        | Action::PassGo
        | Action::ManualPosition { .. }
        | Action::ManualOwnership { .. }
        | Action::GoToJail
        | Action::EnterJail
        | Action::LeaveJail
        | Action::AdjustBalance { .. }
        | Action::TransferCash { .. }
        | Action::DeclareBankruptcy { .. }
        | Action::UndoLast => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn rolling_needs_normal_or_jail_phase() {
        let roll = Action::RollDice { dice: None };
        assert!(allowed_in_phase(&roll, GamePhase::Normal));
        assert!(allowed_in_phase(&roll, GamePhase::InJailDecision));
        assert!(!allowed_in_phase(&roll, GamePhase::CardDraw));
        assert!(!allowed_in_phase(&roll, GamePhase::Trade));
        assert!(!allowed_in_phase(&roll, GamePhase::BankruptcyResolution));
    }

    #[test]
    fn jail_payments_only_in_jail_decision() {
        for phase in GamePhase::iter() {
            let expected = phase == GamePhase::InJailDecision;
            assert_eq!(allowed_in_phase(&Action::PayJailFine, phase), expected);
            assert_eq!(allowed_in_phase(&Action::UseJailCard, phase), expected);
        }
    }

    #[test]
    fn pending_card_blocks_everything_but_admin() {
        let phase = GamePhase::CardDraw;
        assert!(allowed_in_phase(&Action::ApplyCardEffect, phase));
        assert!(allowed_in_phase(&Action::UndoLast, phase));
        assert!(allowed_in_phase(
            &Action::AdjustBalance {
                player_id: "p".into(),
                amount: 1,
                reason: "fix".into()
            },
            phase
        ));
        assert!(!allowed_in_phase(
            &Action::BuyProperty {
                property_id: "boardwalk".into(),
                price: None
            },
            phase
        ));
        assert!(!allowed_in_phase(&Action::RollDice { dice: None }, phase));
    }

    #[test]
    fn raising_cash_stays_legal_during_bankruptcy() {
        let phase = GamePhase::BankruptcyResolution;
        assert!(allowed_in_phase(
            &Action::MortgageProperty {
                property_id: "baltic".into()
            },
            phase
        ));
        assert!(allowed_in_phase(
            &Action::SellHouse {
                property_id: "baltic".into()
            },
            phase
        ));
        assert!(!allowed_in_phase(&Action::ChanceEventTrigger, phase));
        assert!(!allowed_in_phase(
            &Action::DrawCard {
                deck: crate::models::DeckType::Chance
            },
            phase
        ));
    }
}
