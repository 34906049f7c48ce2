use std::sync::Arc;

use backend::{api, QueryService, ServerConfig};
use game_store::GameRegistry;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env()?;
    info!(
        games_dir = %config.games_dir.display(),
        id_width = config.id_width,
        "[BACKEND] Starting game archive API"
    );

    let registry = Arc::new(GameRegistry::open(&config.games_dir, config.id_width)?);
    let app = api::router(QueryService::new(registry), config.cors.layer()?);

    api::serve(config.bind_addr, app).await?;
    Ok(())
}
