//! Chance-event outcome catalog loading.
//!
//! These are the table-rule event wheel entries, separate from the card
//! decks. Half are good, half are bad; a trigger picks one uniformly.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// Outcome wheel (compile-time embedded).
pub const OUTCOMES_YAML: &str = include_str!("../../../../data/outcomes.yaml");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeKind {
    Good,
    Bad,
}

/// How an outcome settles once the table accepts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeAction {
    /// Bank pays the default amount.
    Receive,
    /// Forced payment of the default amount to the bank.
    Pay,
    /// Every other player pays the triggering player.
    ReceivePerPlayer,
    /// The triggering player pays every other player.
    PayPerPlayer,
    /// Pick an owned property, collect from each other player.
    ReceivePropertyUpgrade,
    /// Pick an owned property, pay the bank for repairs.
    PayPropertyRepair,
    /// 10% of current cash, computed at resolution time.
    TaxAudit,
    /// Caller supplies the figure (the last rent paid).
    RentReimbursement,
    /// Immediate payout; the second installment is a table reminder.
    LuckyInvestment,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChanceOutcome {
    pub id: String,
    pub kind: OutcomeKind,
    pub name: String,
    pub description: String,
    pub action: OutcomeAction,
    /// Default money figure; 0 means the resolving action must supply it.
    pub amount: i64,
}

#[derive(Deserialize)]
struct RawOutcomes {
    outcomes: Vec<ChanceOutcome>,
}

static OUTCOMES: OnceLock<Vec<ChanceOutcome>> = OnceLock::new();

pub fn outcomes() -> &'static [ChanceOutcome] {
    OUTCOMES.get_or_init(|| {
        let raw: RawOutcomes =
            serde_yaml::from_str(OUTCOMES_YAML).expect("Failed to parse outcomes.yaml");
        raw.outcomes
    })
}

pub fn outcome(outcome_id: &str) -> Option<&'static ChanceOutcome> {
    outcomes().iter().find(|o| o.id == outcome_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wheel_is_balanced() {
        let all = outcomes();
        assert_eq!(all.len(), 16);
        let good = all.iter().filter(|o| o.kind == OutcomeKind::Good).count();
        assert_eq!(good, 8);
    }

    #[test]
    fn manual_entries_have_zero_default() {
        assert_eq!(outcome("rent-reimbursement").unwrap().amount, 0);
        assert_eq!(outcome("tax-audit").unwrap().amount, 0);
    }

    #[test]
    fn per_player_outcomes_carry_per_head_defaults() {
        let o = outcome("forced-donation").unwrap();
        assert_eq!(o.action, OutcomeAction::PayPerPlayer);
        assert_eq!(o.amount, 50);
        let o = outcome("property-upgrade").unwrap();
        assert_eq!(o.action, OutcomeAction::ReceivePropertyUpgrade);
        assert_eq!(o.amount, 150);
    }
}
