//! JSON API for table operations
//!
//! String-in, string-out endpoints for host UIs and scripting layers:
//! table creation, action application and rent queries. Apply and query
//! endpoints never fail; every outcome is a well-formed response envelope.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use validator::Validate;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::engine::{apply_action, rent_due, Action, RentAmount};
use crate::error::{EngineError, Result};
use crate::models::GameSettings;
use crate::save::current_timestamp;
use crate::state::GameState;

/// Wire schema version enforced on every request
pub const SCHEMA_VERSION: u32 = 1;

/// Answer of last resort when the response itself will not serialize.
const FALLBACK_RESPONSE: &str = r#"{"ok":false,"schema_version":1,"error_kind":"INTERNAL","message":"response serialization failed"}"#;

// ============================================================================
// Request / response types
// ============================================================================

#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct NewGameRequest {
    pub schema_version: u32,
    /// Drives the opening deck shuffle.
    pub seed: u64,
    #[validate(length(min = 2, max = 8, message = "a table seats 2 to 8 players"))]
    pub players: Vec<NewPlayer>,
    #[serde(default)]
    pub settings: Option<GameSettings>,
}

#[derive(Debug, Serialize, Deserialize, Validate, JsonSchema)]
pub struct NewPlayer {
    #[validate(length(min = 1, max = 40, message = "player names run 1 to 40 characters"))]
    pub name: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ApplyRequest {
    pub schema_version: u32,
    /// Feeds dice, shuffles and draws; absent falls back to the wall clock.
    #[serde(default)]
    pub seed: Option<u64>,
    pub state: GameState,
    pub action: Action,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ApplyResponse {
    pub ok: bool,
    pub schema_version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<GameState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApplyResponse {
    fn success(state: GameState) -> Self {
        Self {
            ok: true,
            schema_version: SCHEMA_VERSION,
            state: Some(state),
            error_kind: None,
            message: None,
        }
    }

    fn error(err: &EngineError) -> Self {
        Self {
            ok: false,
            schema_version: SCHEMA_VERSION,
            state: None,
            error_kind: Some(err.kind().to_string()),
            message: Some(err.to_string()),
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RentQueryRequest {
    pub schema_version: u32,
    pub state: GameState,
    pub property_id: String,
    /// Dice sum for utility pricing; streets and railroads ignore it.
    #[serde(default)]
    pub dice: Option<(u8, u8)>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct RentQueryResponse {
    pub ok: bool,
    pub schema_version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
    /// True when the property is a utility and no dice were supplied.
    pub roll_required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RentQueryResponse {
    fn amount(amount: i64) -> Self {
        Self {
            ok: true,
            schema_version: SCHEMA_VERSION,
            amount: Some(amount),
            roll_required: false,
            error_kind: None,
            message: None,
        }
    }

    fn roll_required() -> Self {
        Self {
            ok: true,
            schema_version: SCHEMA_VERSION,
            amount: None,
            roll_required: true,
            error_kind: None,
            message: None,
        }
    }

    fn error(err: &EngineError) -> Self {
        Self {
            ok: false,
            schema_version: SCHEMA_VERSION,
            amount: None,
            roll_required: false,
            error_kind: Some(err.kind().to_string()),
            message: Some(err.to_string()),
        }
    }
}

// ============================================================================
// Endpoints
// ============================================================================

/// Start a table from a JSON request string.
///
/// Returns the serialized opening [`GameState`].
pub fn new_game_json(request_json: &str) -> Result<String> {
    info!("Processing new-game request");

    let request: NewGameRequest = serde_json::from_str(request_json)?;

    if request.schema_version != SCHEMA_VERSION {
        return Err(EngineError::BadRequest(format!(
            "unsupported schema version: {}",
            request.schema_version
        )));
    }

    request
        .validate()
        .map_err(|e| EngineError::BadRequest(format!("invalid request: {}", e)))?;
    for player in &request.players {
        player
            .validate()
            .map_err(|e| EngineError::BadRequest(format!("invalid player entry: {}", e)))?;
    }

    let names: Vec<String> = request.players.iter().map(|p| p.name.clone()).collect();
    let settings = request.settings.unwrap_or_default();
    let state = GameState::new_game(&names, settings, request.seed)?;

    info!("New table {} seats {} players", state.id, state.players.len());
    Ok(serde_json::to_string(&state)?)
}

/// Apply one action to a submitted state.
///
/// Returns JSON containing [`ApplyResponse`]: `{"ok":true,"state":…}` on
/// success, `{"ok":false,"error_kind":…,"message":…}` on any rejection.
pub fn apply_action_json(request_json: &str) -> String {
    let request: ApplyRequest = match serde_json::from_str(request_json) {
        Ok(req) => req,
        Err(e) => {
            error!("Failed to parse ApplyRequest: {}", e);
            let err: EngineError = e.into();
            return encode_response(&ApplyResponse::error(&err));
        }
    };

    if request.schema_version != SCHEMA_VERSION {
        let err = EngineError::BadRequest(format!(
            "unsupported schema version: {}",
            request.schema_version
        ));
        return encode_response(&ApplyResponse::error(&err));
    }

    let seed = request.seed.unwrap_or_else(current_timestamp);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    debug!("Applying {:?} to table {}", request.action, request.state.id);

    match apply_action(&request.state, &request.action, &mut rng) {
        Ok(next) => encode_response(&ApplyResponse::success(next)),
        Err(err) => {
            warn!("Action rejected: {}", err);
            encode_response(&ApplyResponse::error(&err))
        }
    }
}

/// Price a landing without applying anything.
pub fn rent_query_json(request_json: &str) -> String {
    let request: RentQueryRequest = match serde_json::from_str(request_json) {
        Ok(req) => req,
        Err(e) => {
            error!("Failed to parse RentQueryRequest: {}", e);
            let err: EngineError = e.into();
            return encode_response(&RentQueryResponse::error(&err));
        }
    };

    if request.schema_version != SCHEMA_VERSION {
        let err = EngineError::BadRequest(format!(
            "unsupported schema version: {}",
            request.schema_version
        ));
        return encode_response(&RentQueryResponse::error(&err));
    }

    debug!("Rent query for {} on table {}", request.property_id, request.state.id);

    match rent_due(&request.state, &request.property_id, request.dice) {
        Ok(RentAmount::Amount(v)) => encode_response(&RentQueryResponse::amount(v)),
        Ok(RentAmount::RollRequired) => encode_response(&RentQueryResponse::roll_required()),
        Err(err) => encode_response(&RentQueryResponse::error(&err)),
    }
}

fn encode_response<T: Serialize>(response: &T) -> String {
    serde_json::to_string(response).unwrap_or_else(|_| FALLBACK_RESPONSE.to_string())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn sample_state() -> GameState {
        let names = vec!["Ann".to_string(), "Ben".to_string()];
        GameState::new_game(&names, GameSettings::default(), 3).unwrap()
    }

    fn apply_request(state: &GameState, action: Value, seed: u64) -> String {
        json!({
            "schema_version": 1,
            "seed": seed,
            "state": state,
            "action": action,
        })
        .to_string()
    }

    fn rent_request(state: &GameState, property_id: &str, dice: Option<(u8, u8)>) -> String {
        json!({
            "schema_version": 1,
            "state": state,
            "property_id": property_id,
            "dice": dice,
        })
        .to_string()
    }

    fn state_of(response: &Value) -> GameState {
        serde_json::from_value(response["state"].clone()).unwrap()
    }

    #[test]
    fn new_game_returns_a_playable_state() {
        let request = json!({
            "schema_version": 1,
            "seed": 42,
            "players": [{"name": "Ann"}, {"name": "Ben"}, {"name": "Cam"}],
        })
        .to_string();

        let raw = new_game_json(&request).unwrap();
        let state: GameState = serde_json::from_str(&raw).unwrap();

        assert_eq!(state.players.len(), 3);
        assert_eq!(state.players[0].name, "Ann");
        assert_eq!(state.players[0].balance, 1500);
        assert_eq!(state.turn_number, 1);
    }

    #[test]
    fn new_game_rejects_short_tables() {
        let request = json!({
            "schema_version": 1,
            "seed": 42,
            "players": [{"name": "Solo"}],
        })
        .to_string();

        let err = new_game_json(&request).unwrap_err();
        assert!(matches!(err, EngineError::BadRequest(_)));
    }

    #[test]
    fn new_game_rejects_blank_names() {
        let request = json!({
            "schema_version": 1,
            "seed": 42,
            "players": [{"name": ""}, {"name": "Ben"}],
        })
        .to_string();

        let err = new_game_json(&request).unwrap_err();
        assert!(matches!(err, EngineError::BadRequest(_)));
    }

    #[test]
    fn new_game_rejects_wrong_schema_version() {
        let request = json!({
            "schema_version": 2,
            "seed": 42,
            "players": [{"name": "Ann"}, {"name": "Ben"}],
        })
        .to_string();

        let err = new_game_json(&request).unwrap_err();
        assert!(matches!(err, EngineError::BadRequest(_)));
    }

    #[test]
    fn apply_moves_a_token() {
        let state = sample_state();
        let raw = apply_action_json(&apply_request(
            &state,
            json!({"type": "ROLL_DICE", "dice": [1, 2]}),
            9,
        ));
        let response: Value = serde_json::from_str(&raw).unwrap();

        assert_eq!(response["ok"], json!(true));
        assert_eq!(response["schema_version"], json!(1));
        let next = state_of(&response);
        assert_eq!(next.players[0].position, 3);
        assert_eq!(next.last_dice_roll, Some((1, 2)));
    }

    #[test]
    fn apply_reports_rule_errors() {
        let state = sample_state();
        let raw =
            apply_action_json(&apply_request(&state, json!({"type": "PAY_JAIL_FINE"}), 9));
        let response: Value = serde_json::from_str(&raw).unwrap();

        assert_eq!(response["ok"], json!(false));
        assert_eq!(response["error_kind"], json!("INVALID_PHASE_FOR_ACTION"));
        assert!(response.get("state").is_none());
    }

    #[test]
    fn apply_rejects_unknown_actions() {
        let state = sample_state();
        let raw = apply_action_json(&apply_request(
            &state,
            json!({"type": "TELEPORT_EVERYONE"}),
            9,
        ));
        let response: Value = serde_json::from_str(&raw).unwrap();

        assert_eq!(response["ok"], json!(false));
        assert_eq!(response["error_kind"], json!("UNKNOWN_ACTION"));
    }

    #[test]
    fn apply_rejects_malformed_json() {
        let raw = apply_action_json("this is not json");
        let response: Value = serde_json::from_str(&raw).unwrap();

        assert_eq!(response["ok"], json!(false));
        assert_eq!(response["error_kind"], json!("BAD_REQUEST"));
    }

    #[test]
    fn apply_rejects_wrong_schema_version() {
        let state = sample_state();
        let request = json!({
            "schema_version": 7,
            "state": state,
            "action": {"type": "END_TURN"},
        })
        .to_string();

        let response: Value = serde_json::from_str(&apply_action_json(&request)).unwrap();
        assert_eq!(response["ok"], json!(false));
        assert_eq!(response["error_kind"], json!("BAD_REQUEST"));
    }

    #[test]
    fn seeded_rolls_are_reproducible() {
        let state = sample_state();
        let action = json!({"type": "ROLL_DICE"});

        let first: Value =
            serde_json::from_str(&apply_action_json(&apply_request(&state, action.clone(), 1234)))
                .unwrap();
        let second: Value =
            serde_json::from_str(&apply_action_json(&apply_request(&state, action, 1234)))
                .unwrap();

        assert_eq!(first["ok"], json!(true));
        assert_eq!(
            state_of(&first).last_dice_roll,
            state_of(&second).last_dice_roll
        );
    }

    #[test]
    fn rent_query_prices_a_landing() {
        let mut state = sample_state();
        let ann = state.players[0].id.clone();
        state.players[0].owned_property_ids.push("baltic".to_string());
        state.property_state_mut("baltic").unwrap().owner_id = Some(ann);

        let response: Value =
            serde_json::from_str(&rent_query_json(&rent_request(&state, "baltic", None))).unwrap();
        assert_eq!(response["ok"], json!(true));
        assert_eq!(response["amount"], json!(4));
        assert_eq!(response["roll_required"], json!(false));
    }

    #[test]
    fn rent_query_flags_missing_dice() {
        let mut state = sample_state();
        let ann = state.players[0].id.clone();
        state
            .players[0]
            .owned_property_ids
            .push("electric-company".to_string());
        state.property_state_mut("electric-company").unwrap().owner_id = Some(ann);

        let without: Value =
            serde_json::from_str(&rent_query_json(&rent_request(&state, "electric-company", None)))
                .unwrap();
        assert_eq!(without["ok"], json!(true));
        assert_eq!(without["roll_required"], json!(true));
        assert!(without.get("amount").is_none());

        let with: Value = serde_json::from_str(&rent_query_json(&rent_request(
            &state,
            "electric-company",
            Some((3, 4)),
        )))
        .unwrap();
        assert_eq!(with["amount"], json!(28));
    }

    #[test]
    fn rent_query_reports_unknown_properties() {
        let state = sample_state();
        let response: Value =
            serde_json::from_str(&rent_query_json(&rent_request(&state, "atlantis", None)))
                .unwrap();

        assert_eq!(response["ok"], json!(false));
        assert_eq!(response["error_kind"], json!("PROPERTY_NOT_FOUND"));
    }

    #[test]
    fn apply_response_schema_accepts_real_responses() {
        let schema = serde_json::to_value(schemars::schema_for!(ApplyResponse)).unwrap();
        let compiled = jsonschema::JSONSchema::compile(&schema).unwrap();

        let state = sample_state();
        let success: Value = serde_json::from_str(&apply_action_json(&apply_request(
            &state,
            json!({"type": "END_TURN"}),
            9,
        )))
        .unwrap();
        let failure: Value = serde_json::from_str(&apply_action_json("broken")).unwrap();

        assert!(compiled.validate(&success).is_ok());
        assert!(compiled.validate(&failure).is_ok());
        assert_eq!(success["ok"], json!(true));
        assert_eq!(failure["ok"], json!(false));
    }
}
