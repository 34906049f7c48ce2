//! HTTP routes for the game archive
//!
//! Read-only: nothing here ever writes to a game directory.
//!
//! | Route                       | Response                                      |
//! |-----------------------------|-----------------------------------------------|
//! | `GET /game/{id}/current`    | `{fen, is_active, history_length, timestamp}` |
//! | `GET /game/{id}/history/{n}`| `{fen, move_number, timestamp}`               |
//! | `GET /game/{id}/moves`      | `{moves: [{fen, timestamp}], is_active}`      |
//! | `GET /health`               | `{status: "ok"}`                              |

use std::net::SocketAddr;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::query::{CurrentPosition, HistoricalPosition, MoveList, QueryService};

pub fn router(service: QueryService, cors: CorsLayer) -> Router {
    Router::new()
        .route("/game/{id}/current", get(current_position))
        .route("/game/{id}/history/{n}", get(position_at))
        .route("/game/{id}/moves", get(move_list))
        .route("/health", get(health))
        .with_state(service)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Bind `addr` and serve `app` until the process stops
pub async fn serve(addr: SocketAddr, app: Router) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("[API] Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await
}

async fn current_position(
    State(service): State<QueryService>,
    Path(id): Path<String>,
) -> Result<Json<CurrentPosition>, ApiError> {
    debug!(game_id = %id, "[API] current");
    run_query(move || service.current(&id)).await.map(Json)
}

async fn position_at(
    State(service): State<QueryService>,
    Path((id, n)): Path<(String, String)>,
) -> Result<Json<HistoricalPosition>, ApiError> {
    debug!(game_id = %id, move_number = %n, "[API] history");
    let n: i64 = n.trim().parse().map_err(|_| ApiError::InvalidArgument)?;
    run_query(move || service.position_at(&id, n)).await.map(Json)
}

async fn move_list(
    State(service): State<QueryService>,
    Path(id): Path<String>,
) -> Result<Json<MoveList>, ApiError> {
    debug!(game_id = %id, "[API] moves");
    run_query(move || service.moves(&id)).await.map(Json)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Queries touch the filesystem, so they run on the blocking pool
async fn run_query<T, F>(query: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
{
    tokio::task::spawn_blocking(query)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
}
