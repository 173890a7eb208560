pub mod json_api;

pub use json_api::{
    apply_action_json, new_game_json, rent_query_json, ApplyRequest, ApplyResponse,
    NewGameRequest, NewPlayer, RentQueryRequest, RentQueryResponse, SCHEMA_VERSION,
};
