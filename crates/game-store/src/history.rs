//! Durable move history for one game
//!
//! # Write protocol
//!
//! Every append serializes the *entire* updated history to a temporary file
//! next to the canonical one, syncs it, and renames it over `moves.json`.
//! Rename is atomic, so a reader opening `moves.json` sees either the old
//! complete array or the new complete array. There is never a window where
//! the canonical file is missing or truncated, and readers need no lock.
//!
//! Writers inside one process serialize through the store's own mutex. The
//! registry hands out one shared [`GameHistoryStore`] per id, so that lock is
//! per game and never blocks unrelated games.
//!
//! The completion marker is a separate file written the same way, so a torn
//! marker write can never damage the history and vice versa.
//!
//! # Layout
//!
//! ```text
//! <games_root>/<game_id>/moves.json       [{"fen": ..., "timestamp": ...}, ...]
//! <games_root>/<game_id>/moves.json.tmp   writer-only, transient
//! <games_root>/<game_id>/completed        advisory timestamp; presence is what counts
//! ```

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::lifecycle::GameLifecycle;
use crate::record::{GameHistory, MoveRecord, StoredMove};
use crate::GameId;

/// Canonical history filename inside a game directory
pub const HISTORY_FILENAME: &str = "moves.json";

/// Completion sentinel filename inside a game directory
pub const COMPLETED_FILENAME: &str = "completed";

const TEMP_SUFFIX: &str = ".tmp";

/// Owns the durable representation of one game's move sequence
#[derive(Debug)]
pub struct GameHistoryStore {
    id: GameId,
    dir: PathBuf,
    /// Guards the temp-write + rename sequence against writers in this process
    write_lock: Mutex<()>,
}

impl GameHistoryStore {
    pub(crate) fn new(id: GameId, dir: PathBuf) -> Self {
        Self {
            id,
            dir,
            write_lock: Mutex::new(()),
        }
    }

    pub fn id(&self) -> &GameId {
        &self.id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path readers are allowed to open
    pub fn history_path(&self) -> PathBuf {
        self.dir.join(HISTORY_FILENAME)
    }

    fn completed_path(&self) -> PathBuf {
        self.dir.join(COMPLETED_FILENAME)
    }

    pub fn is_completed(&self) -> bool {
        self.completed_path().exists()
    }

    /// Lifecycle derived from the artifacts on disk
    pub fn lifecycle(&self) -> GameLifecycle {
        if !self.dir.is_dir() {
            GameLifecycle::Unallocated
        } else if self.is_completed() {
            GameLifecycle::Completed
        } else if self.history_path().exists() {
            GameLifecycle::Active
        } else {
            GameLifecycle::Reserved
        }
    }

    /// Consistent snapshot of the full history
    ///
    /// Fails with `NotFound` when the game directory is gone and with
    /// `DataNotFound` when no history has been written yet.
    pub fn read_all(&self) -> StoreResult<GameHistory> {
        // Marker first: it is written after the final append, so a marker seen
        // here guarantees the history read below is the final one.
        let completion = self.read_completion()?;
        let moves = self
            .load_moves()?
            .ok_or_else(|| StoreError::DataNotFound(self.id.clone()))?;

        let records = moves
            .iter()
            .enumerate()
            .map(|(i, m)| MoveRecord::from_stored(i, m))
            .collect();

        Ok(GameHistory {
            records,
            completed: completion.is_some(),
            completed_at: completion.flatten(),
        })
    }

    /// Record at `index`, `OutOfRange` when `index < 0` or `index >= len`
    pub fn read_at(&self, index: i64) -> StoreResult<MoveRecord> {
        let history = self.read_all()?;
        history.get(index).cloned()
    }

    /// Most recent record
    pub fn read_latest(&self) -> StoreResult<MoveRecord> {
        let history = self.read_all()?;
        history
            .latest()
            .cloned()
            .ok_or_else(|| StoreError::DataNotFound(self.id.clone()))
    }

    /// Number of committed records, 0 if nothing has been written
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.load_moves()?.map_or(0, |m| m.len()))
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Append one position at the next sequence index
    ///
    /// The full updated history is durable on disk when this returns. If it
    /// fails, the previously durable history is untouched.
    pub fn append(&self, position: &str, timestamp: f64) -> StoreResult<MoveRecord> {
        let _guard = self.write_lock.lock();

        if self.is_completed() {
            return Err(StoreError::AlreadyCompleted(self.id.clone()));
        }

        let mut moves = self.load_moves()?.unwrap_or_default();
        moves.push(StoredMove {
            fen: position.to_string(),
            timestamp,
        });

        let bytes = serde_json::to_vec_pretty(&moves).map_err(StoreError::Serialize)?;
        write_atomic(&self.history_path(), &bytes)?;

        let sequence_index = moves.len() - 1;
        debug!(
            game_id = %self.id,
            sequence_index,
            "[STORE] Committed move record"
        );

        Ok(MoveRecord {
            sequence_index,
            position: position.to_string(),
            recorded_at: timestamp,
        })
    }

    /// Write the completion marker
    ///
    /// Idempotent: returns `false` and leaves the existing marker untouched
    /// when the game is already completed.
    pub fn mark_completed(&self, timestamp: f64) -> StoreResult<bool> {
        let _guard = self.write_lock.lock();

        if self.is_completed() {
            debug!(game_id = %self.id, "[STORE] Completion marker already present");
            return Ok(false);
        }
        if !self.dir.is_dir() {
            return Err(StoreError::NotFound(self.id.clone()));
        }

        write_atomic(&self.completed_path(), timestamp.to_string().as_bytes())?;
        info!(game_id = %self.id, "[STORE] Game marked completed");
        Ok(true)
    }

    /// Remove temp files left behind by a writer that died mid-append
    ///
    /// Must only run while no writer for this game is active.
    pub fn cleanup_temp_files(&self) -> StoreResult<usize> {
        let _guard = self.write_lock.lock();

        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(self.id.clone()))
            }
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        for entry in entries {
            let path = entry?.path();
            let is_temp = path
                .file_name()
                .and_then(|s| s.to_str())
                .is_some_and(|name| name.ends_with(TEMP_SUFFIX));
            if is_temp {
                match fs::remove_file(&path) {
                    Ok(()) => removed += 1,
                    Err(e) => warn!("[STORE] Failed to remove stale temp file {:?}: {}", path, e),
                }
            }
        }

        if removed > 0 {
            info!(game_id = %self.id, removed, "[STORE] Removed stale temp files");
        }
        Ok(removed)
    }

    fn load_moves(&self) -> StoreResult<Option<Vec<StoredMove>>> {
        let path = self.history_path();
        match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map(Some).map_err(|source| {
                error!("[STORE] History file {:?} failed to parse: {}", path, source);
                StoreError::Corrupt { path, source }
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if self.dir.is_dir() {
                    Ok(None)
                } else {
                    Err(StoreError::NotFound(self.id.clone()))
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// `None` when there is no marker, `Some(timestamp)` when there is one
    fn read_completion(&self) -> StoreResult<Option<Option<f64>>> {
        match fs::read_to_string(self.completed_path()) {
            Ok(contents) => Ok(Some(contents.trim().parse::<f64>().ok())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(TEMP_SUFFIX);
    path.with_file_name(name)
}

/// Write `bytes` to `path` through a synced temp file and an atomic rename
fn write_atomic(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    let tmp = temp_path_for(path);
    {
        let mut file = File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }

    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }

    if let Some(parent) = path.parent() {
        sync_dir(parent)?;
    }
    Ok(())
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}
