use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(health))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub analysis_ready: bool,
    pub last_error: Option<String>,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    info!("GET /api/health - Health check");
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now(),
        analysis_ready: state.snapshots.is_ready(),
        last_error: state.snapshots.last_error(),
    })
}
