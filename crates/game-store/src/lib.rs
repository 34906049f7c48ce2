//! game-store: durable per-game move histories.
//!
//! One directory per [`GameId`] under a games root, holding a JSON history
//! written through atomic replace and a completion sentinel. The
//! [`GameRegistry`] allocates ids; each [`GameHistoryStore`] is the single
//! write path for its game and a lock-free read path for everyone else.

pub mod error;
pub mod history;
pub mod id;
pub mod lifecycle;
pub mod record;
pub mod registry;

pub use error::{StoreError, StoreResult};
pub use history::{GameHistoryStore, COMPLETED_FILENAME, HISTORY_FILENAME};
pub use id::{GameId, DEFAULT_ID_WIDTH};
pub use lifecycle::GameLifecycle;
pub use record::{now_timestamp, GameHistory, MoveRecord, StoredMove};
pub use registry::{GameRegistry, DEFAULT_MAX_ALLOCATION_ATTEMPTS};
