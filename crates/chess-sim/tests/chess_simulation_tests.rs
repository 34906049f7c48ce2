//! Chess Simulation Integration Tests
//!
//! Plays real chess games through the shakmaty rules engine and checks the
//! archived histories:
//! - Record 0 is the standard start position
//! - Every record follows from the previous one by a single legal move
//! - The completion marker is written once the game is over, and only then
//! - A game paused at the ply limit stays active and can be resumed
//! - Many games run side by side without interfering

use std::time::Duration;

use chess_sim::{
    CompletionReason, DriverConfig, HeuristicScorer, MoveScorer, RulesEngine, RulesError, SelectionPolicy,
    ShakmatyRules, SimulationDriver, TopKPolicy, FIVEFOLD_REPETITION,
};
use game_store::{GameLifecycle, GameRegistry};
use shakmaty::{Chess, Move, Square};

const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

fn config(max_plies: usize) -> DriverConfig {
    DriverConfig {
        move_delay: Duration::ZERO,
        max_plies: Some(max_plies),
    }
}

fn unbounded() -> DriverConfig {
    DriverConfig {
        move_delay: Duration::ZERO,
        max_plies: None,
    }
}

/// Standard chess without repetition draws: play can only end by mate,
/// stalemate, insufficient material or the 75-move rule
struct NoRepetition(ShakmatyRules);

impl RulesEngine for NoRepetition {
    type Position = Chess;
    type Move = Move;

    fn initial_position(&self) -> Chess {
        self.0.initial_position()
    }

    fn parse_fen(&self, fen: &str) -> Result<Chess, RulesError> {
        self.0.parse_fen(fen)
    }

    fn legal_moves(&self, position: &Chess) -> Vec<Move> {
        self.0.legal_moves(position)
    }

    fn apply(&self, position: &Chess, mv: &Move) -> Result<Chess, RulesError> {
        self.0.apply(position, mv)
    }

    fn is_terminal(&self, position: &Chess) -> bool {
        self.0.is_terminal(position)
    }

    fn to_fen(&self, position: &Chess) -> String {
        self.0.to_fen(position)
    }

    fn describe_move(&self, position: &Chess, mv: &Move) -> String {
        self.0.describe_move(position, mv)
    }

    fn outcome(&self, position: &Chess) -> Option<String> {
        self.0.outcome(position)
    }
}

/// Same heuristic as for plain shakmaty rules
impl MoveScorer<NoRepetition> for HeuristicScorer {
    fn score(&self, rules: &NoRepetition, position: &Chess, mv: &Move) -> i32 {
        MoveScorer::<ShakmatyRules>::score(self, &rules.0, position, mv)
    }
}

/// Plays a fixed cycle of (from, to) moves
struct Scripted {
    moves: Vec<(Square, Square)>,
    next: usize,
}

impl<R: RulesEngine<Move = Move>> SelectionPolicy<R> for Scripted {
    fn choose(&mut self, _rules: &R, _position: &R::Position, legal: &[Move]) -> Option<Move> {
        let (from, to) = self.moves[self.next % self.moves.len()];
        self.next += 1;
        legal
            .iter()
            .find(|mv| mv.from() == Some(from) && mv.to() == to)
            .cloned()
    }
}

/// Whether `next` is reachable from `prev` with exactly one legal move
fn follows_by_one_move(rules: &ShakmatyRules, prev: &str, next: &str) -> bool {
    let pos = rules.parse_fen(prev).unwrap();
    rules
        .legal_moves(&pos)
        .iter()
        .any(|mv| rules.to_fen(&rules.apply(&pos, mv).unwrap()) == next)
}

#[tokio::test]
async fn test_simulated_game_history_is_legal_and_contiguous() {
    let tmp = tempfile::tempdir().unwrap();
    let registry = GameRegistry::open(tmp.path(), 6).unwrap();
    let id = registry.allocate().unwrap();
    let store = registry.history(&id).unwrap();

    let policy = TopKPolicy::new(HeuristicScorer::default(), 4).with_seed(2024);
    let summary = SimulationDriver::new(store.clone(), ShakmatyRules, policy, config(40))
        .run()
        .await
        .unwrap();

    let history = store.read_all().unwrap();
    assert_eq!(history.len(), summary.history_length);
    assert!(history.len() >= 2);
    assert_eq!(history.completed, summary.reason.is_final());
    let expected = if summary.reason.is_final() {
        GameLifecycle::Completed
    } else {
        GameLifecycle::Active
    };
    assert_eq!(registry.lifecycle(&id), expected);

    assert_eq!(history.records[0].position, START_FEN);
    let rules = ShakmatyRules;
    for pair in history.records.windows(2) {
        assert_eq!(pair[1].sequence_index, pair[0].sequence_index + 1);
        assert!(pair[1].recorded_at >= pair[0].recorded_at);
        assert!(
            follows_by_one_move(&rules, &pair[0].position, &pair[1].position),
            "record {} is not one legal move after record {}",
            pair[1].sequence_index,
            pair[0].sequence_index
        );
    }
}

#[tokio::test]
async fn test_game_from_checkmate_position_completes_immediately() {
    //! A resumed game whose last record is mate gets marked, nothing appended
    let tmp = tempfile::tempdir().unwrap();
    let registry = GameRegistry::open(tmp.path(), 6).unwrap();
    let id = registry.allocate().unwrap();
    let store = registry.history(&id).unwrap();
    store.append(START_FEN, 1.0).unwrap();
    store
        .append(
            "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3",
            2.0,
        )
        .unwrap();

    let policy = TopKPolicy::new(HeuristicScorer::default(), 4);
    let summary = SimulationDriver::new(store.clone(), ShakmatyRules, policy, config(10))
        .run()
        .await
        .unwrap();

    assert_eq!(summary.reason, CompletionReason::Terminal);
    assert_eq!(summary.outcome.as_deref(), Some("0-1"));
    assert_eq!(summary.moves_played, 0);
    assert_eq!(store.len().unwrap(), 2);
    assert!(store.is_completed());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_games_complete_independently() {
    let tmp = tempfile::tempdir().unwrap();
    let registry = std::sync::Arc::new(GameRegistry::open(tmp.path(), 6).unwrap());

    let mut handles = Vec::new();
    for seed in 0..6u64 {
        let id = registry.allocate().unwrap();
        let store = registry.history(&id).unwrap();
        let policy = TopKPolicy::new(HeuristicScorer::default(), 4).with_seed(seed);
        let driver = SimulationDriver::new(store, ShakmatyRules, policy, config(20));
        handles.push(tokio::spawn(driver.run()));
    }

    for handle in handles {
        let summary = handle.await.unwrap().unwrap();
        let store = registry.history(&summary.game_id).unwrap();
        let history = store.read_all().unwrap();
        assert_eq!(history.completed, summary.reason.is_final());
        assert_eq!(history.len(), summary.history_length);
        assert!(history.len() <= 21);
    }
    assert_eq!(registry.list().unwrap().len(), 6);
}

#[tokio::test]
async fn test_pacing_delay_is_honoured() {
    let tmp = tempfile::tempdir().unwrap();
    let registry = GameRegistry::open(tmp.path(), 6).unwrap();
    let id = registry.allocate().unwrap();
    let store = registry.history(&id).unwrap();

    let cfg = DriverConfig {
        move_delay: Duration::from_millis(20),
        max_plies: Some(3),
    };
    let started = std::time::Instant::now();
    let policy = TopKPolicy::new(HeuristicScorer::default(), 4).with_seed(5);
    let summary = SimulationDriver::new(store, ShakmatyRules, policy, cfg)
        .run()
        .await
        .unwrap();

    assert_eq!(summary.reason, CompletionReason::PlyLimit);
    assert!(started.elapsed() >= Duration::from_millis(60));
}

// ===== Natural end =====

#[tokio::test]
async fn test_unbounded_game_plays_to_a_terminal_position() {
    let tmp = tempfile::tempdir().unwrap();
    let registry = GameRegistry::open(tmp.path(), 6).unwrap();
    let id = registry.allocate().unwrap();
    let store = registry.history(&id).unwrap();

    let policy = TopKPolicy::new(HeuristicScorer::default(), 4).with_seed(7);
    let rules = NoRepetition(ShakmatyRules);
    let summary = SimulationDriver::new(store.clone(), rules, policy, unbounded())
        .run()
        .await
        .unwrap();

    assert_eq!(summary.reason, CompletionReason::Terminal);
    assert!(summary.outcome.is_some());

    let rules = ShakmatyRules;
    let last = store.read_latest().unwrap();
    assert_eq!(last.sequence_index + 1, summary.history_length);
    assert!(rules.is_terminal(&rules.parse_fen(&last.position).unwrap()));
    assert!(tmp.path().join(id.as_str()).join("completed").is_file());
    assert_eq!(registry.lifecycle(&id), GameLifecycle::Completed);
}

#[tokio::test]
async fn test_knight_shuffle_ends_by_fivefold_repetition() {
    //! Ng1-f3, Ng8-f6, Nf3-g1, Nf6-g8 returns to the start every four plies
    let tmp = tempfile::tempdir().unwrap();
    let registry = GameRegistry::open(tmp.path(), 6).unwrap();
    let id = registry.allocate().unwrap();
    let store = registry.history(&id).unwrap();

    let policy = Scripted {
        moves: vec![
            (Square::G1, Square::F3),
            (Square::G8, Square::F6),
            (Square::F3, Square::G1),
            (Square::F6, Square::G8),
        ],
        next: 0,
    };
    let summary = SimulationDriver::new(store.clone(), ShakmatyRules, policy, unbounded())
        .run()
        .await
        .unwrap();

    assert_eq!(summary.reason, CompletionReason::Repetition);
    assert_eq!(summary.history_length, 4 * (FIVEFOLD_REPETITION - 1) + 1);
    assert_eq!(summary.outcome.as_deref(), Some("1/2-1/2"));
    assert_eq!(
        store.read_latest().unwrap().position,
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 16 9"
    );
    assert!(store.is_completed());
}

// ===== Ply limit =====

#[tokio::test]
async fn test_ply_limited_game_stays_active_and_resumes() {
    let tmp = tempfile::tempdir().unwrap();
    let registry = GameRegistry::open(tmp.path(), 6).unwrap();
    let id = registry.allocate().unwrap();
    let store = registry.history(&id).unwrap();
    let rules = ShakmatyRules;

    let policy = TopKPolicy::new(HeuristicScorer::default(), 4).with_seed(3);
    let paused = SimulationDriver::new(store.clone(), rules, policy, config(2))
        .run()
        .await
        .unwrap();

    assert_eq!(paused.reason, CompletionReason::PlyLimit);
    assert_eq!(paused.history_length, 3);
    assert_eq!(paused.outcome, None);
    let last = store.read_latest().unwrap();
    assert!(!rules.is_terminal(&rules.parse_fen(&last.position).unwrap()));
    assert!(!store.is_completed());
    assert_eq!(registry.lifecycle(&id), GameLifecycle::Active);

    let policy = TopKPolicy::new(HeuristicScorer::default(), 4).with_seed(4);
    let resumed = SimulationDriver::new(store.clone(), rules, policy, unbounded())
        .run()
        .await
        .unwrap();

    assert_ne!(resumed.reason, CompletionReason::AlreadyCompleted);
    assert!(resumed.reason.is_final());
    assert!(resumed.moves_played > 0);
    assert_eq!(resumed.history_length, 3 + resumed.moves_played);
    assert!(store.is_completed());

    let history = store.read_all().unwrap();
    for pair in history.records.windows(2) {
        assert!(follows_by_one_move(&rules, &pair[0].position, &pair[1].position));
    }
}
