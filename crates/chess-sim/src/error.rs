//! Error types for simulation
//!
//! A [`SimulationError`] always ends the one game it came from. Other games
//! driven by the same process are unaffected.

use game_store::StoreError;
use thiserror::Error;

/// Errors reported by a rules engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RulesError {
    /// Text that is not valid FEN
    #[error("Invalid FEN {fen:?}: {reason}")]
    InvalidFen { fen: String, reason: String },

    /// Well-formed FEN describing an impossible position
    #[error("Illegal position {fen:?}: {reason}")]
    IllegalPosition { fen: String, reason: String },

    /// Move that cannot be applied to the position
    #[error("Cannot apply move {mv}: {reason}")]
    IllegalMove { mv: String, reason: String },
}

/// Errors that end one game's simulation
#[derive(Error, Debug)]
pub enum SimulationError {
    /// Durable write or read failed; history contiguity can't be guaranteed
    #[error("Storage failure: {0}")]
    Store(#[from] StoreError),

    /// The rules engine reported an invalid or ambiguous state
    #[error("Rules engine failure: {0}")]
    Rules(#[from] RulesError),

    /// The policy returned nothing, or a move outside the legal set
    #[error("Move policy chose no legal move from {legal_count} candidates")]
    IllegalChoice { legal_count: usize },

    /// A blocking storage task panicked or was cancelled
    #[error("Blocking storage task failed: {0}")]
    TaskJoin(String),
}

/// Result type alias for simulation operations
pub type SimulationResult<T> = Result<T, SimulationError>;
