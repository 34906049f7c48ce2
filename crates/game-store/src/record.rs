//! Move records and history snapshots
//!
//! [`StoredMove`] is the on-disk shape (`{"fen": ..., "timestamp": ...}`),
//! kept identical to archives written by earlier tooling. [`MoveRecord`]
//! adds the sequence index, which on disk is implied by array position.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// One entry of the persisted history array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMove {
    pub fen: String,
    pub timestamp: f64,
}

/// One immutable, sequence-indexed history entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveRecord {
    /// 0-based position in the game's history; index 0 is the start position
    pub sequence_index: usize,
    /// FEN string, opaque to the store
    pub position: String,
    /// Unix time in seconds
    pub recorded_at: f64,
}

impl MoveRecord {
    pub(crate) fn from_stored(sequence_index: usize, stored: &StoredMove) -> Self {
        Self {
            sequence_index,
            position: stored.fen.clone(),
            recorded_at: stored.timestamp,
        }
    }
}

/// Consistent snapshot of one game's history
#[derive(Debug, Clone, PartialEq)]
pub struct GameHistory {
    pub records: Vec<MoveRecord>,
    /// Advisory completion time, present once the game has finished
    pub completed_at: Option<f64>,
    /// Whether the completion marker exists
    ///
    /// Tracked separately from `completed_at` because only the marker's
    /// presence is authoritative.
    pub completed: bool,
}

impl GameHistory {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_active(&self) -> bool {
        !self.completed
    }

    pub fn latest(&self) -> Option<&MoveRecord> {
        self.records.last()
    }

    /// Record at `index`, failing with `OutOfRange` outside `[0, len)`
    pub fn get(&self, index: i64) -> StoreResult<&MoveRecord> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.records.get(i))
            .ok_or(StoreError::OutOfRange {
                index,
                len: self.records.len(),
            })
    }

    /// Records in the on-disk shape
    pub fn stored_moves(&self) -> Vec<StoredMove> {
        self.records
            .iter()
            .map(|r| StoredMove {
                fen: r.position.clone(),
                timestamp: r.recorded_at,
            })
            .collect()
    }
}

/// Current unix time in seconds with microsecond precision
pub fn now_timestamp() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
