//! Simulation driver
//!
//! Drives one game to completion and is that game's only writer.
//!
//! # States
//!
//! | State          | Work                                                        |
//! |----------------|-------------------------------------------------------------|
//! | `Initializing` | clear stale temp files, write record 0 or resume from disk  |
//! | `Running`      | legal moves -> policy -> apply -> append, paced by a delay  |
//! | `Completed`    | write the completion marker once; no further appends        |
//! | `Paused`       | ply limit reached; no marker, the game stays resumable      |
//!
//! Any storage failure is fatal for this game: continuing after a failed
//! durable write would break history contiguity. Blocking file I/O runs on
//! tokio's blocking pool so a slow disk never stalls other games.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use game_store::{now_timestamp, GameHistoryStore, GameId, StoreError, StoreResult};
use tracing::{debug, error, info, warn};

use crate::error::{SimulationError, SimulationResult};
use crate::policy::SelectionPolicy;
use crate::rules::RulesEngine;

/// Default pause between moves
pub const DEFAULT_MOVE_DELAY: Duration = Duration::from_secs(2);

/// Occurrences of one position that end the game as a draw
pub const FIVEFOLD_REPETITION: usize = 5;

const DRAWN: &str = "1/2-1/2";

/// Pacing and limits for one driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
    /// Pause before each move; zero disables pacing
    pub move_delay: Duration,
    /// Pause once the history holds this many moves past the start
    /// position. The game is left unfinished so a later run can continue it.
    pub max_plies: Option<usize>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            move_delay: DEFAULT_MOVE_DELAY,
            max_plies: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Initializing,
    Running,
    Completed,
    Paused,
}

/// Why the game stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionReason {
    /// Rules engine reported a terminal position
    Terminal,
    /// No legal moves were left
    NoLegalMoves,
    /// The same position occurred for the fifth time
    Repetition,
    /// `max_plies` was reached; the game is still active
    PlyLimit,
    /// The completion marker already existed when the driver started
    AlreadyCompleted,
}

impl CompletionReason {
    /// Whether the game is over and carries the completion marker
    pub fn is_final(self) -> bool {
        !matches!(self, CompletionReason::PlyLimit)
    }
}

/// Result of one driver run
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationSummary {
    pub game_id: GameId,
    /// Records in the history, start position included
    pub history_length: usize,
    /// Moves appended by this driver run
    pub moves_played: usize,
    pub reason: CompletionReason,
    pub outcome: Option<String>,
}

/// Sole writer of one game's history
pub struct SimulationDriver<R: RulesEngine, P> {
    store: Arc<GameHistoryStore>,
    rules: R,
    policy: P,
    config: DriverConfig,
    state: DriverState,
}

impl<R, P> SimulationDriver<R, P>
where
    R: RulesEngine,
    P: SelectionPolicy<R>,
{
    pub fn new(store: Arc<GameHistoryStore>, rules: R, policy: P, config: DriverConfig) -> Self {
        Self {
            store,
            rules,
            policy,
            config,
            state: DriverState::Initializing,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn game_id(&self) -> &GameId {
        self.store.id()
    }

    fn transition(&mut self, next: DriverState) {
        debug!(
            game_id = %self.store.id(),
            "[DRIVER] {:?} -> {:?}",
            self.state,
            next
        );
        self.state = next;
    }

    /// Run the game until it completes or fails
    pub async fn run(mut self) -> SimulationResult<SimulationSummary> {
        let game_id = self.store.id().clone();
        match self.drive().await {
            Ok(summary) if summary.reason.is_final() => {
                info!(
                    game_id = %game_id,
                    history_length = summary.history_length,
                    outcome = summary.outcome.as_deref().unwrap_or("*"),
                    "[DRIVER] Game finished ({:?})",
                    summary.reason
                );
                Ok(summary)
            }
            Ok(summary) => {
                info!(
                    game_id = %game_id,
                    history_length = summary.history_length,
                    "[DRIVER] Ply limit reached, game left active"
                );
                Ok(summary)
            }
            Err(e) => {
                error!(game_id = %game_id, "[DRIVER] Simulation aborted: {}", e);
                Err(e)
            }
        }
    }

    async fn drive(&mut self) -> SimulationResult<SimulationSummary> {
        let game_id = self.store.id().clone();

        if self.store.is_completed() {
            warn!(game_id = %game_id, "[DRIVER] Game already completed, nothing to do");
            let history_length = on_store(&self.store, |s| s.len()).await?;
            self.transition(DriverState::Completed);
            return Ok(SimulationSummary {
                game_id,
                history_length,
                moves_played: 0,
                reason: CompletionReason::AlreadyCompleted,
                outcome: None,
            });
        }

        // Initializing
        let (mut position, mut history_length, mut seen) = self.initialize().await?;
        let mut repeats = self.record_position(&mut seen, &position);
        self.transition(DriverState::Running);

        // Running
        let mut moves_played = 0;
        let reason = loop {
            if self.rules.is_terminal(&position) {
                break CompletionReason::Terminal;
            }
            if repeats >= FIVEFOLD_REPETITION {
                break CompletionReason::Repetition;
            }
            let legal = self.rules.legal_moves(&position);
            if legal.is_empty() {
                break CompletionReason::NoLegalMoves;
            }
            if self
                .config
                .max_plies
                .is_some_and(|limit| history_length > limit)
            {
                break CompletionReason::PlyLimit;
            }

            if !self.config.move_delay.is_zero() {
                tokio::time::sleep(self.config.move_delay).await;
            }

            let mv = self
                .policy
                .choose(&self.rules, &position, &legal)
                .filter(|mv| legal.contains(mv))
                .ok_or(SimulationError::IllegalChoice {
                    legal_count: legal.len(),
                })?;
            let description = self.rules.describe_move(&position, &mv);
            let next = self.rules.apply(&position, &mv)?;
            let fen = self.rules.to_fen(&next);

            let record = on_store(&self.store, move |s| s.append(&fen, now_timestamp())).await?;
            debug!(
                game_id = %game_id,
                ply = record.sequence_index,
                "[DRIVER] Played {}",
                description
            );

            repeats = self.record_position(&mut seen, &next);
            position = next;
            history_length = record.sequence_index + 1;
            moves_played += 1;
        };

        let outcome = if reason.is_final() {
            // Completed
            let outcome = match reason {
                CompletionReason::Repetition => Some(DRAWN.to_string()),
                _ => self.rules.outcome(&position),
            };
            on_store(&self.store, |s| s.mark_completed(now_timestamp())).await?;
            self.transition(DriverState::Completed);
            outcome
        } else {
            self.transition(DriverState::Paused);
            None
        };

        Ok(SimulationSummary {
            game_id,
            history_length,
            moves_played,
            reason,
            outcome,
        })
    }

    /// Count one more occurrence of `position`, returning its total
    fn record_position(&self, seen: &mut HashMap<String, usize>, position: &R::Position) -> usize {
        match self.rules.repetition_key(position) {
            Some(key) => {
                let count = seen.entry(key).or_insert(0);
                *count += 1;
                *count
            }
            None => 0,
        }
    }

    /// Write record 0, or rebuild the position from the last stored record.
    ///
    /// Also returns occurrence counts of every stored position before the
    /// last one, so repetition carries across a resume.
    async fn initialize(&self) -> SimulationResult<(R::Position, usize, HashMap<String, usize>)> {
        let game_id = self.store.id().clone();

        let removed = on_store(&self.store, |s| s.cleanup_temp_files()).await?;
        if removed > 0 {
            warn!(game_id = %game_id, removed, "[DRIVER] Cleared leftovers of an interrupted write");
        }

        let existing = match on_store(&self.store, |s| s.read_all()).await {
            Ok(history) => history.records,
            Err(SimulationError::Store(StoreError::DataNotFound(_))) => Vec::new(),
            Err(e) => return Err(e),
        };

        match existing.last() {
            None => {
                let position = self.rules.initial_position();
                let fen = self.rules.to_fen(&position);
                on_store(&self.store, move |s| s.append(&fen, now_timestamp())).await?;
                info!(game_id = %game_id, "[DRIVER] Wrote starting position");
                Ok((position, 1, HashMap::new()))
            }
            Some(last) => {
                let position = self.rules.parse_fen(&last.position)?;
                let mut seen = HashMap::new();
                for record in &existing[..existing.len() - 1] {
                    if let Ok(earlier) = self.rules.parse_fen(&record.position) {
                        self.record_position(&mut seen, &earlier);
                    }
                }
                info!(
                    game_id = %game_id,
                    history_length = existing.len(),
                    "[DRIVER] Resuming from stored position"
                );
                Ok((position, existing.len(), seen))
            }
        }
    }
}

/// Run a store call on the blocking pool
async fn on_store<T, F>(store: &Arc<GameHistoryStore>, f: F) -> SimulationResult<T>
where
    T: Send + 'static,
    F: FnOnce(&GameHistoryStore) -> StoreResult<T> + Send + 'static,
{
    let store = Arc::clone(store);
    tokio::task::spawn_blocking(move || f(&store))
        .await
        .map_err(|e| SimulationError::TaskJoin(e.to_string()))?
        .map_err(SimulationError::from)
}
