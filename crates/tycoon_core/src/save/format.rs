use super::error::SaveError;
use super::SAVE_VERSION;
use crate::state::{GameState, LOG_CAP, MAX_PLAYERS};
use serde::{Deserialize, Serialize};

use lz4_flex::{compress_prepend_size, decompress_size_prepended};
use rmp_serde::{from_slice, to_vec_named};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;

/// Versioned envelope around a full table state.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TableSave {
    /// Save format version for forward-compatibility checks
    pub version: u32,

    /// Save timestamp (unix milliseconds)
    pub timestamp: u64,

    /// The complete table: players, board, decks, log and undo history
    pub state: GameState,
}

impl TableSave {
    pub fn new(state: GameState) -> Self {
        Self { version: SAVE_VERSION, timestamp: current_timestamp(), state }
    }

    pub fn update_timestamp(&mut self) {
        self.timestamp = current_timestamp();
    }

    pub fn validate(&self) -> Result<(), SaveError> {
        // Bounds are sanity checks against hand-built files, not engine
        // invariants; the engine itself never exceeds them.
        if self.state.players.len() > 2 * MAX_PLAYERS {
            return Err(SaveError::DataTooLarge { size: self.state.players.len() });
        }

        if self.state.log.len() > LOG_CAP {
            return Err(SaveError::DataTooLarge { size: self.state.log.len() });
        }

        // Check for duplicate player IDs
        let mut player_ids = std::collections::HashSet::new();
        for player in &self.state.players {
            if !player_ids.insert(&player.id) {
                return Err(SaveError::Corrupted);
            }
        }

        Ok(())
    }
}

/// Serialize and compress table save data
pub fn serialize_and_compress(save: &TableSave) -> Result<Vec<u8>, SaveError> {
    // Validate before serialization
    save.validate()?;

    // 1. Serialize to MessagePack with field names
    let msgpack = to_vec_named(save).map_err(SaveError::Serialization)?;

    // 2. Compress with LZ4 (size prepended for easy decompression)
    let compressed = compress_prepend_size(&msgpack);

    // 3. Add SHA256 checksum at the end
    let mut hasher = Sha256::new();
    hasher.update(&compressed);
    let checksum = hasher.finalize();

    let mut result = compressed;
    result.extend_from_slice(&checksum);

    Ok(result)
}

/// Decompress and deserialize table save data
pub fn decompress_and_deserialize(bytes: &[u8]) -> Result<TableSave, SaveError> {
    // Check minimum size (header + checksum)
    if bytes.len() < 4 + 32 {
        return Err(SaveError::Corrupted);
    }

    // Split payload and checksum
    let (payload, checksum_bytes) = bytes.split_at(bytes.len() - 32);

    // Verify checksum
    let mut hasher = Sha256::new();
    hasher.update(payload);
    let calculated_checksum = hasher.finalize();

    if &calculated_checksum[..] != checksum_bytes {
        return Err(SaveError::ChecksumMismatch);
    }

    // Decompress
    let msgpack = decompress_size_prepended(payload).map_err(|_| SaveError::Decompression)?;

    // Deserialize
    let save: TableSave = from_slice(&msgpack).map_err(SaveError::Deserialization)?;

    // Reject saves written by a newer build
    if save.version > SAVE_VERSION {
        return Err(SaveError::VersionMismatch { found: save.version, expected: SAVE_VERSION });
    }

    Ok(save)
}

pub fn current_timestamp() -> u64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GameSettings, Transaction, TransactionKind};

    fn sample_state() -> GameState {
        let names = vec!["Ann".to_string(), "Ben".to_string()];
        GameState::new_game(&names, GameSettings::default(), 3).unwrap()
    }

    #[test]
    fn test_serialize_deserialize_roundtrip() {
        let save = TableSave::new(sample_state());

        let serialized = serialize_and_compress(&save).unwrap();
        let deserialized = decompress_and_deserialize(&serialized).unwrap();

        assert_eq!(save.version, deserialized.version);
        assert_eq!(save.timestamp, deserialized.timestamp);
        assert_eq!(save.state, deserialized.state);
    }

    #[test]
    fn test_checksum_validation() {
        let save = TableSave::new(sample_state());
        let mut serialized = serialize_and_compress(&save).unwrap();

        // Corrupt the checksum
        if let Some(last) = serialized.last_mut() {
            *last = last.wrapping_add(1);
        }

        let result = decompress_and_deserialize(&serialized);
        assert!(matches!(result, Err(SaveError::ChecksumMismatch)));
    }

    #[test]
    fn test_truncated_data_rejected() {
        let save = TableSave::new(sample_state());
        let serialized = serialize_and_compress(&save).unwrap();

        let result = decompress_and_deserialize(&serialized[..10]);
        assert!(matches!(result, Err(SaveError::Corrupted)));
    }

    #[test]
    fn test_future_version_rejected() {
        let mut save = TableSave::new(sample_state());
        save.version = SAVE_VERSION + 1;

        let serialized = serialize_and_compress(&save).unwrap();
        let result = decompress_and_deserialize(&serialized);

        assert!(matches!(
            result,
            Err(SaveError::VersionMismatch { found, expected })
                if found == SAVE_VERSION + 1 && expected == SAVE_VERSION
        ));
    }

    #[test]
    fn test_duplicate_player_ids_rejected() {
        let mut save = TableSave::new(sample_state());
        save.state.players[1].id = save.state.players[0].id.clone();

        let result = serialize_and_compress(&save);
        assert!(matches!(result, Err(SaveError::Corrupted)));
    }

    #[test]
    fn test_compression_ratio() {
        let mut save = TableSave::new(sample_state());

        // Pad the audit log with realistic entries
        for i in 0..200 {
            let txn = Transaction::new(TransactionKind::AdjustBalance, format!("Adjustment {}", i))
                .with_amount(i)
                .with_from("BANK")
                .with_to(save.state.players[0].id.clone());
            save.state.log.push(txn);
        }

        let uncompressed = to_vec_named(&save).unwrap();
        let compressed = serialize_and_compress(&save).unwrap();

        let ratio = compressed.len() as f32 / uncompressed.len() as f32;
        println!(
            "Compression ratio: {:.2}% ({} -> {} bytes)",
            ratio * 100.0,
            uncompressed.len(),
            compressed.len()
        );

        // Should achieve reasonable compression
        assert!(ratio < 0.8); // Less than 80% of original size
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn roundtrip_keeps_arbitrary_balances_and_positions(
                balance_a in -100_000i64..100_000,
                balance_b in -100_000i64..100_000,
                pos_a in 0usize..40,
                pos_b in 0usize..40,
            ) {
                let mut state = sample_state();
                state.players[0].balance = balance_a;
                state.players[1].balance = balance_b;
                state.players[0].position = pos_a;
                state.players[1].position = pos_b;

                let save = TableSave::new(state);
                let bytes = serialize_and_compress(&save).unwrap();
                let loaded = decompress_and_deserialize(&bytes).unwrap();
                prop_assert_eq!(&loaded.state, &save.state);
            }
        }
    }
}
