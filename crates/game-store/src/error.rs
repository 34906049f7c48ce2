//! Error types for the game store
//!
//! Covers lookups of unknown games, out-of-range history reads, structurally
//! invalid history files and storage I/O failures during append/rename.

use std::path::PathBuf;

use thiserror::Error;

use crate::GameId;

/// Errors that can occur while allocating, reading or writing game histories
#[derive(Error, Debug)]
pub enum StoreError {
    /// No directory exists for this game id
    #[error("Game not found: {0}")]
    NotFound(GameId),

    /// The game directory exists but no history has been written yet
    #[error("Game data not found: {0}")]
    DataNotFound(GameId),

    /// History index outside `[0, len)`
    #[error("Index {index} out of range for history of length {len}")]
    OutOfRange { index: i64, len: usize },

    /// Input that is not a well-formed game id
    #[error("Invalid game id: {0:?}")]
    InvalidGameId(String),

    /// History file exists but fails to parse
    ///
    /// Never produced under correct use of the atomic-replace protocol.
    #[error("Corrupt history file {path:?}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Append attempted after the completion marker was written
    #[error("Game {0} is already completed")]
    AlreadyCompleted(GameId),

    /// Random allocation kept colliding with existing directories
    #[error("Could not allocate a free game id after {attempts} attempts")]
    IdSpaceExhausted { attempts: u32 },

    /// Serializing an in-memory history failed
    #[error("Failed to serialize history: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Storage I/O failure
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
