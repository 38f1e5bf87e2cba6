//! Health and readiness endpoints.

use crate::server::state::AppState;
use axum::{Json, extract::State};
use serde::Serialize;

/// Health response body.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `"ok"` when the process is serving.
    pub status: &'static str,
}

/// Liveness: the process is up.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Readiness response body.
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    /// `"ready"` once the ledger answers.
    pub status: &'static str,
    /// Number of shows with registered seat maps.
    pub registered_shows: usize,
}

/// Readiness: the ledger store answers state reads.
pub async fn readiness_check(State(state): State<AppState>) -> Json<ReadinessResponse> {
    let registered_shows = state.ledger.state(|s| s.seat_maps.len()).await;
    Json(ReadinessResponse {
        status: "ready",
        registered_shows,
    })
}
