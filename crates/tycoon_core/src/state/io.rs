//! Plain-JSON state files for tooling and hand editing.
//!
//! The binary save pipeline lives in `crate::save`; these helpers are the
//! debug-friendly sibling used by the CLI.

use std::fs;
use std::path::Path;

use super::GameState;

pub fn export_state_json<P: AsRef<Path>>(state: &GameState, path: P) -> anyhow::Result<()> {
    let data = serde_json::to_string_pretty(state)?;
    fs::write(path, data)?;
    Ok(())
}

pub fn import_state_json<P: AsRef<Path>>(path: P) -> anyhow::Result<GameState> {
    let data = fs::read_to_string(path)?;
    let state: GameState = serde_json::from_str(&data)?;
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GameSettings;

    #[test]
    fn test_export_import_roundtrip() {
        let temp_dir = std::env::temp_dir();
        let test_file = temp_dir.join("test_table_state.json");

        let names = vec!["Ann".to_string(), "Ben".to_string()];
        let state = GameState::new_game(&names, GameSettings::default(), 11).unwrap();

        export_state_json(&state, &test_file).unwrap();
        assert!(test_file.exists());

        let loaded = import_state_json(&test_file).unwrap();
        assert_eq!(state, loaded);

        fs::remove_file(&test_file).ok();
    }
}
