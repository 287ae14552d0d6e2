//! Read-only HTTP view of every match.
//!
//! `GET /matches` answers with a JSON array of [`MatchSummary`] records and
//! any other path with 404. Snapshots are requested from the coordinator
//! through a [`ServerHandle`], so this endpoint never touches match state
//! directly.

use crate::game::MatchSummary;
use crate::network::ServerHandle;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use log::{error, warn};
use tokio::net::TcpListener;

/// Routes for the inspection endpoint
pub fn app(handle: ServerHandle) -> Router {
    Router::new()
        .route("/matches", get(list_matches))
        .fallback(not_found)
        .with_state(handle)
}

/// Serves the inspection routes until the listener fails or the task is aborted
pub async fn serve(listener: TcpListener, handle: ServerHandle) {
    if let Err(e) = axum::serve(listener, app(handle)).await {
        error!("Inspection endpoint stopped: {}", e);
    }
}

async fn list_matches(
    State(handle): State<ServerHandle>,
) -> Result<Json<Vec<MatchSummary>>, StatusCode> {
    handle.snapshot().await.map(Json).map_err(|e| {
        warn!("Match snapshot unavailable: {}", e);
        StatusCode::SERVICE_UNAVAILABLE
    })
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not Found")
}
