use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Counterparty id used when the bank is one side of a money movement.
pub const BANK: &str = "BANK";

/// Ledger tag for one audit-log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(test, derive(strum_macros::EnumIter))]
pub enum TransactionKind {
    RollDice,
    MovePlayer,
    PassGo,
    BuyProperty,
    PayRent,
    PayTax,
    DrawCard,
    ApplyCardEffect,
    GoToJail,
    LeaveJail,
    JailPayFine,
    JailUseCard,
    JailRollAttempt,
    TradeExecute,
    MortgageProperty,
    UnmortgageProperty,
    BuyHouse,
    SellHouse,
    BuyHotel,
    SellHotel,
    AdjustBalance,
    TransferCash,
    DeclareBankruptcy,
    EndTurn,
    ManualPosition,
    ManualOwnership,
}

/// One entry in the append-only audit log.
///
/// A single submitted action may append several entries: a dice roll logs the
/// roll, the movement, and any GO credit as separate rows. `from` and `to`
/// are player ids or [`BANK`]; `amount` is signed from the perspective of
/// `from` (a purchase is negative, a credit positive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Transaction {
    pub id: String,
    pub kind: TransactionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_id: Option<String>,
    pub note: String,
    /// Unix milliseconds at append time.
    pub timestamp: u64,
}

impl Transaction {
    pub fn new(kind: TransactionKind, note: impl Into<String>) -> Self {
        Transaction {
            id: Uuid::new_v4().to_string(),
            kind,
            amount: None,
            from: None,
            to: None,
            property_id: None,
            card_id: None,
            note: note.into(),
            timestamp: now_ms(),
        }
    }

    pub fn with_amount(mut self, amount: i64) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    pub fn with_to(mut self, to: impl Into<String>) -> Self {
        self.to = Some(to.into());
        self
    }

    pub fn with_property(mut self, property_id: impl Into<String>) -> Self {
        self.property_id = Some(property_id.into());
        self
    }

    pub fn with_card(mut self, card_id: impl Into<String>) -> Self {
        self.card_id = Some(card_id.into());
        self
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_fills_optional_fields() {
        let t = Transaction::new(TransactionKind::BuyProperty, "Bought Boardwalk for $400.")
            .with_amount(-400)
            .with_from("p1")
            .with_to(BANK)
            .with_property("boardwalk");
        assert_eq!(t.kind, TransactionKind::BuyProperty);
        assert_eq!(t.amount, Some(-400));
        assert_eq!(t.from.as_deref(), Some("p1"));
        assert_eq!(t.to.as_deref(), Some(BANK));
        assert_eq!(t.property_id.as_deref(), Some("boardwalk"));
        assert!(t.card_id.is_none());
        assert!(t.timestamp > 0);
    }

    #[test]
    fn kind_serializes_to_screaming_snake() {
        let json = serde_json::to_string(&TransactionKind::JailRollAttempt).unwrap();
        assert_eq!(json, "\"JAIL_ROLL_ATTEMPT\"");
    }
}
