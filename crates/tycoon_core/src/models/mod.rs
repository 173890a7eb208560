pub mod card;
pub mod player;
pub mod property;
pub mod settings;
pub mod transaction;


pub use card::{Card, CardEffect, DeckType};
pub use player::Player;
pub use property::{PropertyData, PropertyState, MAX_HOUSES};
pub use settings::GameSettings;
pub use transaction::{Transaction, TransactionKind, BANK};
