//! Game rules: the action reducer and its supporting calculators.

pub mod action;
pub mod apply;
pub mod phase;
pub mod random;
pub mod rent;


pub use action::{Action, Creditor};
pub use apply::apply_action;
pub use phase::{allowed_in_phase, GamePhase};
pub use rent::{rent_due, RentAmount};
