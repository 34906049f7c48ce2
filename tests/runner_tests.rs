//! Runner Integration Tests
//!
//! Drives whole games through the same entry points the CLI uses:
//! - `simulate` allocates and drives every requested game
//! - games paused at the ply limit stay active for `resume`
//! - `resume` picks up reserved and active games only
//! - `status` reports lifecycle and history length per game

use std::path::Path;

use chess_archive::runner::{self, GameStatus};
use chess_archive::ArchiveSettings;
use chess_sim::CompletionReason;
use game_store::GameLifecycle;
use shakmaty::fen::Fen;
use shakmaty::{CastlingMode, Chess, EnPassantMode, Position};

const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

fn fast_settings(games_dir: &Path) -> ArchiveSettings {
    ArchiveSettings {
        games_dir: games_dir.to_path_buf(),
        move_delay_ms: 0,
        max_plies: Some(12),
        seed: Some(11),
        ..ArchiveSettings::default()
    }
}

/// Lifecycle a game should have after a driver run ended for `reason`
fn lifecycle_after(reason: CompletionReason) -> GameLifecycle {
    if reason.is_final() {
        GameLifecycle::Completed
    } else {
        GameLifecycle::Active
    }
}

fn parse(fen: &str) -> Chess {
    fen.parse::<Fen>()
        .unwrap()
        .into_position(CastlingMode::Standard)
        .unwrap()
}

// ===== Simulate =====

#[tokio::test]
async fn test_simulate_drives_every_game() {
    let tmp = tempfile::tempdir().unwrap();
    let settings = fast_settings(tmp.path());
    let registry = runner::open_registry(&settings).unwrap();

    let reports = runner::simulate(registry.clone(), &settings, 3).await.unwrap();

    assert_eq!(reports.len(), 3);
    assert!(reports.iter().all(|r| r.is_ok()));
    assert_eq!(runner::print_reports(&reports), 0);
    for report in &reports {
        let summary = report.result.as_ref().unwrap();
        assert_eq!(registry.lifecycle(&report.game_id), lifecycle_after(summary.reason));
        assert_eq!(report.game_id.as_str().len(), 6);
    }
}

#[tokio::test]
async fn test_ply_limited_games_are_finished_by_resume() {
    let tmp = tempfile::tempdir().unwrap();
    let mut settings = fast_settings(tmp.path());
    settings.max_plies = Some(2);
    let registry = runner::open_registry(&settings).unwrap();

    let reports = runner::simulate(registry.clone(), &settings, 2).await.unwrap();
    for report in &reports {
        let summary = report.result.as_ref().unwrap();
        assert_eq!(summary.reason, CompletionReason::PlyLimit);
        assert_eq!(registry.lifecycle(&report.game_id), GameLifecycle::Active);
    }

    settings.max_plies = None;
    let resumed = runner::resume(registry.clone(), &settings).await.unwrap();

    assert_eq!(resumed.len(), 2);
    for report in &resumed {
        let summary = report.result.as_ref().unwrap();
        assert!(summary.reason.is_final());
        assert!(summary.moves_played > 0);
        assert_eq!(registry.lifecycle(&report.game_id), GameLifecycle::Completed);
    }
}

#[tokio::test]
async fn test_simulated_positions_are_legal_successors() {
    let tmp = tempfile::tempdir().unwrap();
    let settings = fast_settings(tmp.path());
    let registry = runner::open_registry(&settings).unwrap();

    let reports = runner::simulate(registry.clone(), &settings, 1).await.unwrap();
    let history = registry
        .history(&reports[0].game_id)
        .unwrap()
        .read_all()
        .unwrap();

    assert_eq!(history.records[0].position, START_FEN);
    for pair in history.records.windows(2) {
        let before = parse(&pair[0].position);
        let reachable = before.legal_moves().iter().any(|mv| {
            let after = before.clone().play(mv).unwrap();
            Fen::from_position(after, EnPassantMode::Legal).to_string() == pair[1].position
        });
        assert!(reachable, "{} does not follow {}", pair[1].position, pair[0].position);
    }
}

// ===== Resume =====

#[tokio::test]
async fn test_resume_continues_unfinished_games_only() {
    let tmp = tempfile::tempdir().unwrap();
    let settings = fast_settings(tmp.path());
    let registry = runner::open_registry(&settings).unwrap();

    // Reserved: directory only
    let reserved = registry.allocate().unwrap();
    // Active: two positions written, no marker
    let active = registry.allocate().unwrap();
    let store = registry.history(&active).unwrap();
    store.append(START_FEN, 1.0).unwrap();
    store
        .append("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1", 2.0)
        .unwrap();
    // Completed: left alone
    let done = registry.allocate().unwrap();
    let done_store = registry.history(&done).unwrap();
    done_store.append(START_FEN, 1.0).unwrap();
    done_store.mark_completed(2.0).unwrap();

    let reports = runner::resume(registry.clone(), &settings).await.unwrap();

    let mut resumed: Vec<_> = reports.iter().map(|r| r.game_id.clone()).collect();
    resumed.sort();
    let mut expected = vec![reserved.clone(), active.clone()];
    expected.sort();
    assert_eq!(resumed, expected);

    for report in &reports {
        let summary = report.result.as_ref().unwrap();
        assert_ne!(summary.reason, CompletionReason::AlreadyCompleted);
        assert!(summary.history_length <= 13);
        assert_eq!(registry.lifecycle(&report.game_id), lifecycle_after(summary.reason));
    }

    let active_history = store.read_all().unwrap();
    assert!(active_history.len() > 2);
    assert_eq!(active_history.records[0].recorded_at, 1.0);
    assert_eq!(active_history.records[1].recorded_at, 2.0);
    assert_eq!(done_store.len().unwrap(), 1);
}

// ===== Status =====

#[tokio::test]
async fn test_status_lists_lifecycles() {
    let tmp = tempfile::tempdir().unwrap();
    let settings = fast_settings(tmp.path());
    let registry = runner::open_registry(&settings).unwrap();

    let reserved = registry.allocate().unwrap();
    let reports = runner::simulate(registry.clone(), &settings, 1).await.unwrap();
    let finished = reports[0].game_id.clone();
    let reason = reports[0].result.as_ref().unwrap().reason;

    let statuses = runner::status(&registry).unwrap();
    assert_eq!(statuses.len(), 2);
    assert!(statuses.contains(&GameStatus {
        game_id: reserved,
        lifecycle: GameLifecycle::Reserved,
        history_length: Some(0),
    }));
    let finished_status = statuses.iter().find(|s| s.game_id == finished).unwrap();
    assert_eq!(finished_status.lifecycle, lifecycle_after(reason));
    let length = finished_status.history_length.unwrap();
    assert!((2..=13).contains(&length));
}

#[test]
fn test_corrupt_history_shows_as_unreadable() {
    let tmp = tempfile::tempdir().unwrap();
    let settings = fast_settings(tmp.path());
    let registry = runner::open_registry(&settings).unwrap();

    let id = registry.allocate().unwrap();
    std::fs::write(tmp.path().join(id.as_str()).join("moves.json"), "garbage").unwrap();

    let statuses = runner::status(&registry).unwrap();
    assert_eq!(statuses[0].history_length, None);
    assert_eq!(statuses[0].lifecycle, GameLifecycle::Active);
}
