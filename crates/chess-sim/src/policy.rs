//! Move-selection policy
//!
//! Picks one legal move for the driver. Split in two so either half can be
//! swapped:
//!
//! - [`MoveScorer`] rates a single move (`score(board, move) -> i32`)
//! - [`TopKPolicy`] scores every legal move and chooses uniformly among the
//!   `k` best, with optional jitter added to each score first
//!
//! Anything implementing [`SelectionPolicy`] (a deterministic picker, an
//! external engine) can replace the pair without touching the driver.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shakmaty::{Chess, Move, Square};

use crate::rules::{RulesEngine, ShakmatyRules};

/// Default number of top-scored moves to choose between
pub const DEFAULT_TOP_K: usize = 4;

/// Default upper bound of the random jitter added to each score
pub const DEFAULT_JITTER: i32 = 10;

const CENTER_SQUARES: [Square; 4] = [Square::D4, Square::E4, Square::D5, Square::E5];

/// Rates one move in one position; higher is better
pub trait MoveScorer<R: RulesEngine>: Send {
    fn score(&self, rules: &R, position: &R::Position, mv: &R::Move) -> i32;
}

/// Chooses one move out of the legal set
pub trait SelectionPolicy<R: RulesEngine>: Send {
    /// `None` only when `legal` is empty
    fn choose(&mut self, rules: &R, position: &R::Position, legal: &[R::Move]) -> Option<R::Move>;
}

/// Capture / centre / check bonuses for standard chess
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeuristicScorer {
    pub capture_bonus: i32,
    pub center_bonus: i32,
    pub check_bonus: i32,
}

impl Default for HeuristicScorer {
    fn default() -> Self {
        Self {
            capture_bonus: 50,
            center_bonus: 20,
            check_bonus: 30,
        }
    }
}

impl MoveScorer<ShakmatyRules> for HeuristicScorer {
    fn score(&self, rules: &ShakmatyRules, position: &Chess, mv: &Move) -> i32 {
        let mut score = 0;

        // Captures are good
        if mv.is_capture() {
            score += self.capture_bonus;
        }

        // Centre control bonus
        if CENTER_SQUARES.contains(&mv.to()) {
            score += self.center_bonus;
        }

        if rules.gives_check(position, mv) {
            score += self.check_bonus;
        }

        score
    }
}

/// Uniform choice among the `k` highest-scoring moves
#[derive(Debug)]
pub struct TopKPolicy<S> {
    scorer: S,
    k: usize,
    jitter: i32,
    rng: StdRng,
}

impl<S> TopKPolicy<S> {
    /// Policy with default jitter and an OS-seeded RNG
    pub fn new(scorer: S, k: usize) -> Self {
        Self {
            scorer,
            k: k.max(1),
            jitter: DEFAULT_JITTER,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Jitter bound; 0 makes scoring deterministic
    pub fn with_jitter(mut self, jitter: i32) -> Self {
        self.jitter = jitter.max(0);
        self
    }

    /// Reproducible choices for a given seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn k(&self) -> usize {
        self.k
    }
}

impl<R, S> SelectionPolicy<R> for TopKPolicy<S>
where
    R: RulesEngine,
    S: MoveScorer<R>,
{
    fn choose(&mut self, rules: &R, position: &R::Position, legal: &[R::Move]) -> Option<R::Move> {
        if legal.len() <= 1 {
            return legal.first().cloned();
        }

        let mut scored: Vec<(usize, i32)> = legal
            .iter()
            .enumerate()
            .map(|(i, mv)| {
                let noise = if self.jitter > 0 {
                    self.rng.random_range(0..=self.jitter)
                } else {
                    0
                };
                (i, self.scorer.score(rules, position, mv) + noise)
            })
            .collect();

        // Stable sort keeps rules-engine order among equal scores
        scored.sort_by(|a, b| b.1.cmp(&a.1));

        let top = self.k.min(scored.len());
        let pick = self.rng.random_range(0..top);
        legal.get(scored[pick].0).cloned()
    }
}
