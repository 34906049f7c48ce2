//! Orchestration behind the CLI subcommands
//!
//! Each game gets its own tokio task and its own driver; the registry is
//! shared. One game failing is reported in its [`GameReport`] and never
//! stops the others.

use std::sync::Arc;

use backend::{api, ConfigError, QueryService};
use chess_sim::{
    ChessDriver, HeuristicScorer, ShakmatyRules, SimulationError, SimulationSummary, TopKPolicy,
};
use game_store::{GameId, GameLifecycle, GameRegistry, StoreError, StoreResult};
use thiserror::Error;
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info};

use crate::settings::ArchiveSettings;

/// Failures that stop a whole subcommand rather than one game
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Invalid server configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Server failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Server task failed: {0}")]
    TaskJoin(#[from] JoinError),
}

/// Outcome of one driven game
#[derive(Debug)]
pub struct GameReport {
    pub game_id: GameId,
    pub result: Result<SimulationSummary, SimulationError>,
}

impl GameReport {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// One line of `status` output
#[derive(Debug, Clone, PartialEq)]
pub struct GameStatus {
    pub game_id: GameId,
    pub lifecycle: GameLifecycle,
    /// `None` when the history is missing or unreadable
    pub history_length: Option<usize>,
}

pub fn open_registry(settings: &ArchiveSettings) -> StoreResult<Arc<GameRegistry>> {
    Ok(Arc::new(GameRegistry::open(&settings.games_dir, settings.id_width)?))
}

/// Driver for one game, seeded from `settings.seed` offset by `index`
pub fn build_driver(
    registry: &GameRegistry,
    id: &GameId,
    settings: &ArchiveSettings,
    index: u64,
) -> StoreResult<ChessDriver> {
    let store = registry.history(id)?;
    let mut policy = TopKPolicy::new(HeuristicScorer::default(), settings.top_k)
        .with_jitter(settings.jitter);
    if let Some(seed) = settings.seed {
        policy = policy.with_seed(seed.wrapping_add(index));
    }
    Ok(ChessDriver::new(
        store,
        ShakmatyRules,
        policy,
        settings.driver_config(),
    ))
}

/// Allocate `games` new games and drive them concurrently
pub async fn simulate(
    registry: Arc<GameRegistry>,
    settings: &ArchiveSettings,
    games: usize,
) -> StoreResult<Vec<GameReport>> {
    let mut ids = Vec::with_capacity(games);
    for _ in 0..games {
        let id = registry.allocate()?;
        println!("{}", id);
        ids.push(id);
    }
    info!("[CLI] Starting {} new game(s)", ids.len());
    drive_all(&registry, settings, ids).await
}

/// Continue every `Reserved` or `Active` game under the root
pub async fn resume(
    registry: Arc<GameRegistry>,
    settings: &ArchiveSettings,
) -> StoreResult<Vec<GameReport>> {
    let ids: Vec<GameId> = registry
        .list()?
        .into_iter()
        .filter(|id| registry.lifecycle(id).accepts_moves())
        .collect();
    info!("[CLI] Resuming {} unfinished game(s)", ids.len());
    drive_all(&registry, settings, ids).await
}

async fn drive_all(
    registry: &GameRegistry,
    settings: &ArchiveSettings,
    ids: Vec<GameId>,
) -> StoreResult<Vec<GameReport>> {
    let mut tasks = Vec::with_capacity(ids.len());
    for (index, id) in ids.into_iter().enumerate() {
        let driver = build_driver(registry, &id, settings, index as u64)?;
        tasks.push((id, tokio::spawn(driver.run())));
    }
    Ok(collect_reports(tasks).await)
}

/// Await every game task, one report per game
///
/// A task that panicked or was cancelled becomes a failed report, so it
/// counts against the run like any other failure.
async fn collect_reports(
    tasks: Vec<(GameId, JoinHandle<Result<SimulationSummary, SimulationError>>)>,
) -> Vec<GameReport> {
    let mut reports = Vec::with_capacity(tasks.len());
    for (game_id, handle) in tasks {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => {
                error!(game_id = %game_id, "[CLI] Simulation task panicked: {}", e);
                Err(SimulationError::TaskJoin(e.to_string()))
            }
        };
        reports.push(GameReport { game_id, result });
    }
    reports.sort_by(|a, b| a.game_id.cmp(&b.game_id));
    reports
}

/// Every game under the root with its lifecycle and length
pub fn status(registry: &GameRegistry) -> StoreResult<Vec<GameStatus>> {
    registry
        .list()?
        .into_iter()
        .map(|id| {
            let lifecycle = registry.lifecycle(&id);
            let history_length = match registry.reader(&id)?.len() {
                Ok(len) => Some(len),
                Err(StoreError::DataNotFound(_)) => Some(0),
                Err(_) => None,
            };
            Ok(GameStatus {
                game_id: id,
                lifecycle,
                history_length,
            })
        })
        .collect()
}

/// Print one line per game; returns how many failed
pub fn print_reports(reports: &[GameReport]) -> usize {
    let mut failed = 0;
    for report in reports {
        match &report.result {
            Ok(summary) => println!(
                "{}  {} positions  {:?}  {}",
                report.game_id,
                summary.history_length,
                summary.reason,
                summary.outcome.as_deref().unwrap_or("*")
            ),
            Err(e) => {
                failed += 1;
                println!("{}  FAILED  {}", report.game_id, e);
            }
        }
    }
    failed
}

/// Serve the query API until the process stops
pub async fn serve(registry: Arc<GameRegistry>, settings: &ArchiveSettings) -> Result<(), RunError> {
    let app = api::router(QueryService::new(registry), settings.cors.layer()?);
    api::serve(settings.bind_addr, app).await?;
    Ok(())
}

/// Serve and simulate side by side; keeps serving after the games finish
pub async fn run(
    registry: Arc<GameRegistry>,
    settings: &ArchiveSettings,
    games: usize,
) -> Result<(), RunError> {
    // Reject bad CORS settings before any game starts
    settings.cors.layer()?;

    let server_registry = Arc::clone(&registry);
    let server_settings = settings.clone();
    let server = tokio::spawn(async move { serve(server_registry, &server_settings).await });

    let reports = simulate(registry, settings, games).await?;
    let failed = print_reports(&reports);
    info!(failed, "[CLI] Simulations finished, API still serving");

    server.await?
}
