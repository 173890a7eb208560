use super::error::SaveError;
use super::format::{
    current_timestamp, decompress_and_deserialize, serialize_and_compress, TableSave,
};
use crate::state::GameState;

use std::fs::{copy, create_dir_all, read_dir, remove_file, rename, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

pub const SAVE_SLOTS: u8 = 3;
pub const MAX_BACKUPS: usize = 10;

/// Path-based slot manager. Holds no state beyond its directory; callers own
/// the [`GameState`] they hand in.
pub struct SaveManager {
    save_dir: PathBuf,
}

impl SaveManager {
    pub fn new(save_dir: impl Into<PathBuf>) -> Self {
        Self { save_dir: save_dir.into() }
    }

    /// Manager rooted at `./saves` under the working directory.
    pub fn with_default_dir() -> Self {
        let dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")).join("saves");
        Self::new(dir)
    }

    /// Save a table to a specific slot
    pub fn save_to_slot(&self, slot: u8, state: &GameState) -> Result<(), SaveError> {
        Self::validate_slot(slot)?;

        let save = TableSave::new(state.clone());
        let path = self.slot_path(slot);
        self.save_to_path(&path, &save)?;

        log::info!("Table saved to slot {}", slot);
        Ok(())
    }

    /// Load a table from a specific slot
    pub fn load_from_slot(&self, slot: u8) -> Result<TableSave, SaveError> {
        Self::validate_slot(slot)?;

        let path = self.slot_path(slot);
        let save = Self::load_from_path(&path)?;

        log::info!("Table loaded from slot {}", slot);
        Ok(save)
    }

    /// Auto-save the given table
    pub fn auto_save(&self, state: &GameState) -> Result<(), SaveError> {
        let save = TableSave::new(state.clone());
        let path = self.auto_save_path();
        self.save_to_path(&path, &save)?;

        log::debug!("Auto-save completed");
        Ok(())
    }

    /// Load the auto-save
    pub fn load_auto_save(&self) -> Result<TableSave, SaveError> {
        let path = self.auto_save_path();
        let save = Self::load_from_path(&path)?;

        log::info!("Auto-save loaded");
        Ok(save)
    }

    /// Check if a save slot exists
    pub fn slot_exists(&self, slot: u8) -> bool {
        if Self::validate_slot(slot).is_err() {
            return false;
        }

        self.slot_path(slot).exists()
    }

    /// Check if an auto-save exists
    pub fn auto_save_exists(&self) -> bool {
        self.auto_save_path().exists()
    }

    /// Delete a save slot
    pub fn delete_slot(&self, slot: u8) -> Result<(), SaveError> {
        Self::validate_slot(slot)?;

        let path = self.slot_path(slot);
        if path.exists() {
            remove_file(&path)?;
            log::info!("Deleted save slot {}", slot);
        }

        Ok(())
    }

    /// Get save slot info for UI display
    pub fn slot_info(&self, slot: u8) -> Result<Option<SaveSlotInfo>, SaveError> {
        Self::validate_slot(slot)?;

        let path = self.slot_path(slot);
        if !path.exists() {
            return Ok(None);
        }

        let save = Self::load_from_path(&path)?;

        Ok(Some(SaveSlotInfo {
            slot,
            timestamp: save.timestamp,
            version: save.version,
            turn_number: save.state.turn_number,
            player_count: save.state.players.len(),
            log_entries: save.state.log.len(),
        }))
    }

    /// Get all occupied slots, most recent first
    pub fn all_slot_info(&self) -> Vec<SaveSlotInfo> {
        let mut slots = Vec::new();

        for slot in 0..SAVE_SLOTS {
            if let Ok(Some(info)) = self.slot_info(slot) {
                slots.push(info);
            }
        }

        slots.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        slots
    }

    /// All rotated backups, oldest first.
    pub fn list_backups(&self) -> Result<Vec<PathBuf>, SaveError> {
        let dir = self.backups_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut backups: Vec<(u64, PathBuf)> = Vec::new();
        for entry in read_dir(&dir)? {
            let path = entry?.path();
            if let Some(ts) = backup_timestamp(&path) {
                backups.push((ts, path));
            }
        }

        backups.sort_by_key(|(ts, _)| *ts);
        Ok(backups.into_iter().map(|(_, path)| path).collect())
    }

    pub fn latest_backup(&self) -> Option<PathBuf> {
        self.list_backups().ok()?.pop()
    }

    // Private helper methods

    fn validate_slot(slot: u8) -> Result<(), SaveError> {
        if slot >= SAVE_SLOTS {
            return Err(SaveError::InvalidSlot { slot: slot as i64 });
        }
        Ok(())
    }

    fn slot_path(&self, slot: u8) -> PathBuf {
        self.save_dir.join(format!("save_slot_{}.dat", slot))
    }

    fn auto_save_path(&self) -> PathBuf {
        self.save_dir.join("auto_save.dat")
    }

    fn backups_dir(&self) -> PathBuf {
        self.save_dir.join("backups")
    }

    fn save_to_path(&self, path: &Path, save: &TableSave) -> Result<(), SaveError> {
        // Ensure save directory exists
        if let Some(parent) = path.parent() {
            create_dir_all(parent)?;
        }

        // Keep a copy of whatever we are about to overwrite
        if path.exists() {
            self.rotate_backup(path)?;
        }

        // Serialize and compress
        let data = serialize_and_compress(save)?;

        // Atomic save: write to temp file, then rename
        let temp_path = path.with_extension("tmp");

        {
            let mut file = File::create(&temp_path)?;
            file.write_all(&data)?;
            file.flush()?;

            // sync_all ensures data is written to disk (portable fsync)
            file.sync_all()?;
        }

        // Atomic rename
        rename(&temp_path, path)?;

        log::debug!("Saved {} bytes to {:?}", data.len(), path);
        Ok(())
    }

    fn load_from_path(path: &Path) -> Result<TableSave, SaveError> {
        if !path.exists() {
            return Err(SaveError::FileNotFound { path: path.display().to_string() });
        }

        let mut file = File::open(path)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;

        let save = decompress_and_deserialize(&data)?;

        log::debug!("Loaded {} bytes from {:?}", data.len(), path);
        Ok(save)
    }

    fn rotate_backup(&self, path: &Path) -> Result<(), SaveError> {
        let dir = self.backups_dir();
        create_dir_all(&dir)?;

        // Keep names unique when two saves land in the same millisecond
        let mut ts = current_timestamp();
        let mut backup_path = dir.join(format!("backup_{}.dat", ts));
        while backup_path.exists() {
            ts += 1;
            backup_path = dir.join(format!("backup_{}.dat", ts));
        }

        copy(path, &backup_path)?;
        log::debug!("Rotated previous save to {:?}", backup_path);

        // Prune oldest backups beyond the cap
        let backups = self.list_backups()?;
        if backups.len() > MAX_BACKUPS {
            for old in &backups[..backups.len() - MAX_BACKUPS] {
                remove_file(old)?;
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SaveSlotInfo {
    pub slot: u8,
    pub timestamp: u64,
    pub version: u32,
    pub turn_number: u32,
    pub player_count: usize,
    pub log_entries: usize,
}

impl SaveSlotInfo {
    pub fn format_timestamp(&self) -> String {
        use time::{format_description::well_known::Rfc3339, OffsetDateTime};

        let timestamp =
            OffsetDateTime::from_unix_timestamp_nanos((self.timestamp * 1_000_000) as i128)
                .unwrap_or_else(|_| OffsetDateTime::now_utc());

        timestamp.format(&Rfc3339).unwrap_or_else(|_| "Unknown".to_string())
    }

    pub fn get_display_text(&self) -> String {
        format!(
            "Slot {}: Turn {} ({} players, {} log entries)",
            self.slot, self.turn_number, self.player_count, self.log_entries
        )
    }
}

fn backup_timestamp(path: &Path) -> Option<u64> {
    let name = path.file_name()?.to_str()?;
    name.strip_prefix("backup_")?.strip_suffix(".dat")?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GameSettings;
    use tempfile::TempDir;

    fn sample_state() -> GameState {
        let names = vec!["Ann".to_string(), "Ben".to_string()];
        GameState::new_game(&names, GameSettings::default(), 3).unwrap()
    }

    #[test]
    fn test_save_load_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let manager = SaveManager::new(temp_dir.path());

        let state = sample_state();
        manager.save_to_slot(0, &state).unwrap();

        let loaded = manager.load_from_slot(0).unwrap();
        assert_eq!(state, loaded.state);
        assert!(manager.slot_exists(0));
        assert!(!manager.slot_exists(1));
    }

    #[test]
    fn test_atomic_save() {
        let temp_dir = TempDir::new().unwrap();
        let manager = SaveManager::new(temp_dir.path());

        manager.save_to_slot(0, &sample_state()).unwrap();

        // File should exist and be valid
        let path = manager.slot_path(0);
        assert!(path.exists());
        let loaded = SaveManager::load_from_path(&path).unwrap();
        assert_eq!(loaded.version, crate::save::SAVE_VERSION);

        // Temp file should not exist
        let temp_path = path.with_extension("tmp");
        assert!(!temp_path.exists());
    }

    #[test]
    fn test_slot_validation() {
        assert!(SaveManager::validate_slot(0).is_ok());
        assert!(SaveManager::validate_slot(2).is_ok());
        assert!(SaveManager::validate_slot(3).is_err());
        assert!(SaveManager::validate_slot(255).is_err());
    }

    #[test]
    fn test_missing_slot_errors() {
        let temp_dir = TempDir::new().unwrap();
        let manager = SaveManager::new(temp_dir.path());

        let result = manager.load_from_slot(1);
        assert!(matches!(result, Err(SaveError::FileNotFound { .. })));
        assert!(manager.slot_info(1).unwrap().is_none());
    }

    #[test]
    fn test_auto_save_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let manager = SaveManager::new(temp_dir.path());

        assert!(!manager.auto_save_exists());
        let state = sample_state();
        manager.auto_save(&state).unwrap();

        assert!(manager.auto_save_exists());
        let loaded = manager.load_auto_save().unwrap();
        assert_eq!(state, loaded.state);
    }

    #[test]
    fn test_slot_info() {
        let temp_dir = TempDir::new().unwrap();
        let manager = SaveManager::new(temp_dir.path());

        manager.save_to_slot(2, &sample_state()).unwrap();

        let info = manager.slot_info(2).unwrap().unwrap();
        assert_eq!(info.slot, 2);
        assert_eq!(info.player_count, 2);
        assert_eq!(info.turn_number, 1);
        assert_eq!(info.version, crate::save::SAVE_VERSION);
        assert!(!info.format_timestamp().is_empty());

        let all = manager.all_slot_info();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].slot, 2);
    }

    #[test]
    fn test_backup_rotation() {
        let temp_dir = TempDir::new().unwrap();
        let manager = SaveManager::new(temp_dir.path());

        let state = sample_state();
        manager.save_to_slot(0, &state).unwrap();
        assert!(manager.list_backups().unwrap().is_empty());

        // Overwriting an occupied slot snapshots the old file first
        manager.save_to_slot(0, &state).unwrap();
        let backups = manager.list_backups().unwrap();
        assert_eq!(backups.len(), 1);
        assert_eq!(manager.latest_backup(), Some(backups[0].clone()));

        let restored = SaveManager::load_from_path(&backups[0]).unwrap();
        assert_eq!(restored.state, state);
    }

    #[test]
    fn test_backup_pruning() {
        let temp_dir = TempDir::new().unwrap();
        let manager = SaveManager::new(temp_dir.path());

        let state = sample_state();
        for _ in 0..(MAX_BACKUPS + 5) {
            manager.save_to_slot(0, &state).unwrap();
        }

        let backups = manager.list_backups().unwrap();
        assert_eq!(backups.len(), MAX_BACKUPS);
    }
}
