//! Read-only queries over archived games
//!
//! Holds no state of its own beyond a handle to the registry. Every call
//! reads the game fresh from disk, so answers reflect the latest durable
//! state even while a simulation is still writing.

use std::sync::Arc;

use game_store::{GameHistory, GameId, GameRegistry, StoredMove};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Latest position of a game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentPosition {
    pub fen: String,
    pub is_active: bool,
    pub history_length: usize,
    pub timestamp: f64,
}

/// Position after a given move
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPosition {
    pub fen: String,
    pub move_number: usize,
    pub timestamp: f64,
}

/// Full history of a game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveList {
    pub moves: Vec<StoredMove>,
    pub is_active: bool,
}

#[derive(Clone)]
pub struct QueryService {
    registry: Arc<GameRegistry>,
}

impl QueryService {
    pub fn new(registry: Arc<GameRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<GameRegistry> {
        &self.registry
    }

    pub fn current(&self, raw_id: &str) -> Result<CurrentPosition, ApiError> {
        let history = self.load(raw_id)?;
        let latest = history.latest().ok_or(ApiError::DataNotFound)?;
        Ok(CurrentPosition {
            fen: latest.position.clone(),
            is_active: history.is_active(),
            history_length: history.len(),
            timestamp: latest.recorded_at,
        })
    }

    /// Position number `n`, where 0 is the starting position
    pub fn position_at(&self, raw_id: &str, n: i64) -> Result<HistoricalPosition, ApiError> {
        let history = self.load(raw_id)?;
        let record = history.get(n)?;
        Ok(HistoricalPosition {
            fen: record.position.clone(),
            move_number: record.sequence_index,
            timestamp: record.recorded_at,
        })
    }

    pub fn moves(&self, raw_id: &str) -> Result<MoveList, ApiError> {
        let history = self.load(raw_id)?;
        Ok(MoveList {
            moves: history.stored_moves(),
            is_active: history.is_active(),
        })
    }

    fn resolve(&self, raw_id: &str) -> Result<GameId, ApiError> {
        let id = self.registry.parse_id(raw_id)?;
        if !self.registry.exists(&id) {
            return Err(ApiError::NotFound);
        }
        Ok(id)
    }

    fn load(&self, raw_id: &str) -> Result<GameHistory, ApiError> {
        let id = self.resolve(raw_id)?;
        let history = self.registry.reader(&id)?.read_all()?;
        if history.is_empty() {
            return Err(ApiError::DataNotFound);
        }
        Ok(history)
    }
}
