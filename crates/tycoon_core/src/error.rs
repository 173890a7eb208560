use std::fmt;

/// Typed failures returned by action handlers and the JSON boundary.
///
/// A handler that returns an error has not touched the table: the caller's
/// state is exactly what it was before the action was submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    PropertyNotFound(String),
    PropertyAlreadyOwned(String),
    NotOwner {
        property_id: String,
        player_id: String,
    },
    AlreadyMortgaged(String),
    NotMortgaged(String),
    HasImprovements(String),
    MaxImprovementReached(String),
    NoImprovements(String),
    MonopolyRequired(String),
    NotBuildable(String),
    EvenBuildingViolation(String),
    HotelRequiresFourHouses(String),
    InsufficientFunds {
        player_id: String,
        required: i64,
        available: i64,
    },
    PlayerNotFound(String),
    BankruptPlayerInvolved(String),
    InvalidPhaseForAction {
        action: String,
        phase: String,
    },
    InvalidTrade(String),
    NoHistoryToUndo,
    NoPendingEvent,
    EventAlreadyPending,
    RentNotOwed(String),
    RollRequired(String),
    InvalidDice {
        die1: u8,
        die2: u8,
    },
    InvalidEventInput(&'static str),
    PositionOutOfRange(usize),
    NoJailCard(String),
    CardNotFound(String),
    OutcomeNotFound(String),
    UnknownAction(String),
    BadRequest(String),
    Internal(String),
}

impl EngineError {
    /// Stable machine-readable tag for the JSON boundary.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::PropertyNotFound(_) => "PROPERTY_NOT_FOUND",
            EngineError::PropertyAlreadyOwned(_) => "PROPERTY_ALREADY_OWNED",
            EngineError::NotOwner { .. } => "NOT_OWNER",
            EngineError::AlreadyMortgaged(_) => "ALREADY_MORTGAGED",
            EngineError::NotMortgaged(_) => "NOT_MORTGAGED",
            EngineError::HasImprovements(_) => "HAS_IMPROVEMENTS",
            EngineError::MaxImprovementReached(_) => "MAX_IMPROVEMENT_REACHED",
            EngineError::NoImprovements(_) => "NO_IMPROVEMENTS",
            EngineError::MonopolyRequired(_) => "MONOPOLY_REQUIRED",
            EngineError::NotBuildable(_) => "NOT_BUILDABLE",
            EngineError::EvenBuildingViolation(_) => "EVEN_BUILDING_VIOLATION",
            EngineError::HotelRequiresFourHouses(_) => "HOTEL_REQUIRES_FOUR_HOUSES",
            EngineError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            EngineError::PlayerNotFound(_) => "PLAYER_NOT_FOUND",
            EngineError::BankruptPlayerInvolved(_) => "BANKRUPT_PLAYER_INVOLVED",
            EngineError::InvalidPhaseForAction { .. } => "INVALID_PHASE_FOR_ACTION",
            EngineError::InvalidTrade(_) => "INVALID_TRADE",
            EngineError::NoHistoryToUndo => "NO_HISTORY_TO_UNDO",
            EngineError::NoPendingEvent => "NO_PENDING_EVENT",
            EngineError::EventAlreadyPending => "EVENT_ALREADY_PENDING",
            EngineError::RentNotOwed(_) => "RENT_NOT_OWED",
            EngineError::RollRequired(_) => "ROLL_REQUIRED",
            EngineError::InvalidDice { .. } => "INVALID_DICE",
            EngineError::InvalidEventInput(_) => "INVALID_EVENT_INPUT",
            EngineError::PositionOutOfRange(_) => "POSITION_OUT_OF_RANGE",
            EngineError::NoJailCard(_) => "NO_JAIL_CARD",
            EngineError::CardNotFound(_) => "CARD_NOT_FOUND",
            EngineError::OutcomeNotFound(_) => "OUTCOME_NOT_FOUND",
            EngineError::UnknownAction(_) => "UNKNOWN_ACTION",
            EngineError::BadRequest(_) => "BAD_REQUEST",
            EngineError::Internal(_) => "INTERNAL",
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EngineError::PropertyNotFound(id) => {
                write!(f, "Property not found: {}", id)
            }
            EngineError::PropertyAlreadyOwned(id) => {
                write!(f, "Property already owned: {}", id)
            }
            EngineError::NotOwner {
                property_id,
                player_id,
            } => {
                write!(f, "Player {} does not own {}", player_id, property_id)
            }
            EngineError::AlreadyMortgaged(id) => {
                write!(f, "Property already mortgaged: {}", id)
            }
            EngineError::NotMortgaged(id) => {
                write!(f, "Property is not mortgaged: {}", id)
            }
            EngineError::HasImprovements(id) => {
                write!(f, "Property has houses or a hotel: {}", id)
            }
            EngineError::MaxImprovementReached(id) => {
                write!(f, "Maximum improvement level reached: {}", id)
            }
            EngineError::NoImprovements(id) => {
                write!(f, "No houses or hotel to sell: {}", id)
            }
            EngineError::MonopolyRequired(id) => {
                write!(f, "Full color group required to build on {}", id)
            }
            EngineError::NotBuildable(id) => {
                write!(f, "Houses cannot be built on {}", id)
            }
            EngineError::EvenBuildingViolation(id) => {
                write!(f, "Even-building rule violated for {}", id)
            }
            EngineError::HotelRequiresFourHouses(id) => {
                write!(f, "Hotel requires four houses on {}", id)
            }
            EngineError::InsufficientFunds {
                player_id,
                required,
                available,
            } => {
                write!(
                    f,
                    "Insufficient funds for {}: required {}, available {}",
                    player_id, required, available
                )
            }
            EngineError::PlayerNotFound(id) => {
                write!(f, "Player not found: {}", id)
            }
            EngineError::BankruptPlayerInvolved(id) => {
                write!(f, "Bankrupt player cannot take part: {}", id)
            }
            EngineError::InvalidPhaseForAction { action, phase } => {
                write!(f, "Action {} is not allowed in phase {}", action, phase)
            }
            EngineError::InvalidTrade(msg) => {
                write!(f, "Invalid trade: {}", msg)
            }
            EngineError::NoHistoryToUndo => {
                write!(f, "No history to undo")
            }
            EngineError::NoPendingEvent => {
                write!(f, "No pending event to resolve")
            }
            EngineError::EventAlreadyPending => {
                write!(f, "An event is already pending")
            }
            EngineError::RentNotOwed(msg) => {
                write!(f, "Rent is not owed: {}", msg)
            }
            EngineError::RollRequired(id) => {
                write!(f, "Utility rent for {} needs a dice roll", id)
            }
            EngineError::InvalidDice { die1, die2 } => {
                write!(f, "Invalid dice values: {} and {}", die1, die2)
            }
            EngineError::InvalidEventInput(msg) => {
                write!(f, "Invalid event input: {}", msg)
            }
            EngineError::PositionOutOfRange(pos) => {
                write!(f, "Board position out of range: {}", pos)
            }
            EngineError::NoJailCard(player_id) => {
                write!(f, "Player {} holds no Get Out of Jail Free card", player_id)
            }
            EngineError::CardNotFound(id) => {
                write!(f, "Card not found: {}", id)
            }
            EngineError::OutcomeNotFound(id) => {
                write!(f, "Chance outcome not found: {}", id)
            }
            EngineError::UnknownAction(msg) => {
                write!(f, "Unknown action: {}", msg)
            }
            EngineError::BadRequest(msg) => {
                write!(f, "Bad request: {}", msg)
            }
            EngineError::Internal(msg) => {
                write!(f, "Internal error: {}", msg)
            }
        }
    }
}

impl std::error::Error for EngineError {}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        let msg = err.to_string();
        if err.is_data() && msg.contains("unknown variant") {
            EngineError::UnknownAction(msg)
        } else if err.is_data() || err.is_syntax() || err.is_eof() {
            EngineError::BadRequest(msg)
        } else {
            EngineError::Internal(msg)
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
