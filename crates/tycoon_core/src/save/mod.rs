// Save/Load system for table states
// MessagePack + LZ4 compression with versioning and integrity checks

pub mod error;
pub mod format;
pub mod manager;

pub use error::SaveError;
pub use format::{
    current_timestamp, decompress_and_deserialize, serialize_and_compress, TableSave,
};
pub use manager::{SaveManager, SaveSlotInfo, MAX_BACKUPS, SAVE_SLOTS};

pub const SAVE_VERSION: u32 = 1;
