//! Error types for chunk pre-generation.
//!
//! Cancelling a task is not an error: a cancelled run ends with
//! [`Outcome::Stopped`](crate::Outcome::Stopped). The variants below cover the
//! command layer (starting a second task for a busy world, resuming from a
//! corrupt cursor, invalid configuration) and the persistence store.
//!
//! ## Error Cases
//! - `AlreadyRunning`: A task is already registered for the world.
//! - `InvalidCursor`: A saved cursor points past the end of its region.
//! - `RegionOutOfBounds`: A region reaches past the `i32` chunk grid.
//! - `InvalidConfig`: A [`TaskConfig`](crate::TaskConfig) value is out of
//!   range.
//! - `Io`: The persistence store failed to read or write its file.
//! - `Serde`: The persistence store failed to encode or decode a task.

use crate::ChunkPos;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the pre-generation core.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The world already has a live task in the registry.
    #[error("A task is already running for world `{world}`")]
    AlreadyRunning { world: String },

    /// The cursor points past the end of its region.
    #[error("Cursor {index} is out of range for a region of {cardinality} chunks")]
    InvalidCursor { index: u64, cardinality: u64 },

    /// Some cells of the region have no `i32` coordinates.
    #[error("Region of radius {radius} around ({center}) reaches past the chunk grid")]
    RegionOutOfBounds { center: ChunkPos, radius: i32 },

    /// A configuration value is out of range.
    #[error("Invalid config: {reason}")]
    InvalidConfig { reason: String },

    /// Reading or writing the task store failed.
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding or decoding a saved task failed.
    #[error("Store encoding error: {0}")]
    Serde(#[from] serde_json::Error),
}
