//! Game registry
//!
//! Allocates unique game ids and hands out the per-game history stores.
//!
//! Allocation is check-then-create without a race: a candidate id is only
//! claimed when `create_dir` succeeds, and `create_dir` fails atomically if
//! another caller (thread or process) created that directory first. Random
//! draws collide often enough at scale that the loop retries rather than
//! trusting randomness alone.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::history::GameHistoryStore;
use crate::lifecycle::GameLifecycle;
use crate::GameId;

/// Upper bound on random draws before `allocate` gives up
pub const DEFAULT_MAX_ALLOCATION_ATTEMPTS: u32 = 10_000;

/// Owns the games root directory and the per-game store instances
#[derive(Debug)]
pub struct GameRegistry {
    root: PathBuf,
    id_width: usize,
    max_attempts: u32,
    /// One store per id so every writer in the process shares its lock.
    /// Readers never go through this map.
    stores: Mutex<HashMap<GameId, Arc<GameHistoryStore>>>,
}

impl GameRegistry {
    /// Open (creating if needed) a games root
    pub fn open(root: impl Into<PathBuf>, id_width: usize) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        info!("[REGISTRY] Using games root {:?} (id width {})", root, id_width);
        Ok(Self {
            root,
            id_width,
            max_attempts: DEFAULT_MAX_ALLOCATION_ATTEMPTS,
            stores: Mutex::new(HashMap::new()),
        })
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn id_width(&self) -> usize {
        self.id_width
    }

    /// Parse untrusted input as an id of this registry's width
    pub fn parse_id(&self, raw: &str) -> StoreResult<GameId> {
        GameId::parse(raw, self.id_width)
    }

    fn game_dir(&self, id: &GameId) -> PathBuf {
        self.root.join(id.as_str())
    }

    /// Claim a fresh id and create its empty storage directory
    pub fn allocate(&self) -> StoreResult<GameId> {
        let mut rng = rand::rng();

        for attempt in 1..=self.max_attempts {
            let candidate = GameId::random(&mut rng, self.id_width);
            match fs::create_dir(self.game_dir(&candidate)) {
                Ok(()) => {
                    info!(game_id = %candidate, attempt, "[REGISTRY] Allocated game");
                    return Ok(candidate);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    debug!(game_id = %candidate, "[REGISTRY] Id taken, drawing again");
                }
                Err(e) => return Err(e.into()),
            }
        }

        warn!(
            "[REGISTRY] Gave up allocating after {} attempts",
            self.max_attempts
        );
        Err(StoreError::IdSpaceExhausted {
            attempts: self.max_attempts,
        })
    }

    pub fn exists(&self, id: &GameId) -> bool {
        self.game_dir(id).is_dir()
    }

    pub fn is_completed(&self, id: &GameId) -> bool {
        self.lifecycle(id) == GameLifecycle::Completed
    }

    pub fn lifecycle(&self, id: &GameId) -> GameLifecycle {
        GameHistoryStore::new(id.clone(), self.game_dir(id)).lifecycle()
    }

    /// A private, uncached store for reading an allocated game
    ///
    /// Takes no registry lock and holds nothing after it is dropped. Reads
    /// need no writer lock, so read-only callers should use this rather
    /// than [`GameRegistry::history`].
    pub fn reader(&self, id: &GameId) -> StoreResult<GameHistoryStore> {
        if !self.exists(id) {
            return Err(StoreError::NotFound(id.clone()));
        }
        Ok(GameHistoryStore::new(id.clone(), self.game_dir(id)))
    }

    /// Number of shared writer stores currently held
    pub fn open_stores(&self) -> usize {
        self.stores.lock().len()
    }

    /// The shared history store for an allocated game, for writers
    pub fn history(&self, id: &GameId) -> StoreResult<Arc<GameHistoryStore>> {
        if !self.exists(id) {
            return Err(StoreError::NotFound(id.clone()));
        }

        let mut stores = self.stores.lock();
        let store = stores
            .entry(id.clone())
            .or_insert_with(|| Arc::new(GameHistoryStore::new(id.clone(), self.game_dir(id))));
        Ok(Arc::clone(store))
    }

    /// Every game directory under the root, sorted by id
    ///
    /// Entries whose names are not valid ids are skipped.
    pub fn list(&self) -> StoreResult<Vec<GameId>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(id) = entry
                .file_name()
                .to_str()
                .and_then(|name| GameId::parse(name, self.id_width).ok())
            {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }
}
