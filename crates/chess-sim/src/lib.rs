//! chess-sim: drives archived chess games.
//!
//! Ties a [`RulesEngine`] and a [`SelectionPolicy`] to a game's history
//! store and plays the game out, one durable append per move.

pub mod driver;
pub mod error;
pub mod policy;
pub mod rules;

pub use driver::{
    CompletionReason, DriverConfig, DriverState, SimulationDriver, SimulationSummary,
    DEFAULT_MOVE_DELAY, FIVEFOLD_REPETITION,
};
pub use error::{RulesError, SimulationError, SimulationResult};
pub use policy::{
    HeuristicScorer, MoveScorer, SelectionPolicy, TopKPolicy, DEFAULT_JITTER, DEFAULT_TOP_K,
};
pub use rules::{RulesEngine, ShakmatyRules};

/// Standard chess driver with the heuristic top-K policy
pub type ChessDriver = SimulationDriver<ShakmatyRules, TopKPolicy<HeuristicScorer>>;
