use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{error, info};

use crate::errors::AppError;
use crate::models::{DashboardView, Summary};
use crate::routes::query::parse_query_date;
use crate::services::dashboard_service::{build_dashboard, DEFAULT_MAX_EVENTS};
use crate::services::event_filter::EventFilter;
use crate::services::snapshot_service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_dashboard))
}

pub fn reload_router() -> Router<AppState> {
    Router::new().route("/reload", post(reload))
}

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    /// Free-text search over event name and description.
    pub q: Option<String>,
    #[serde(default)]
    pub associated_only: bool,
    /// Associated events listed per change point card (default: 3)
    pub max_events: Option<usize>,
}

impl DashboardQuery {
    fn filter(&self) -> Result<EventFilter, AppError> {
        Ok(EventFilter {
            start_date: parse_query_date("start_date", self.start_date.as_deref())?,
            end_date: parse_query_date("end_date", self.end_date.as_deref())?,
            event_type: self.event_type.clone(),
            search_query: self.q.clone(),
            associated_only: self.associated_only,
        })
    }
}

pub async fn get_dashboard(
    Query(query): Query<DashboardQuery>,
    State(state): State<AppState>,
) -> Result<Json<DashboardView>, AppError> {
    info!("GET /api/dashboard - {:?}", query);
    let filter = query.filter()?;
    let max_events = query.max_events.unwrap_or(DEFAULT_MAX_EVENTS);

    let snapshot = state.snapshots.current()?;
    Ok(Json(build_dashboard(&snapshot, &filter, max_events)))
}

/// Run a fresh load cycle. On failure the previous snapshot keeps serving.
pub async fn reload(State(state): State<AppState>) -> Result<Json<Summary>, AppError> {
    info!("POST /api/reload - Reloading analysis artifacts");
    let snapshot = snapshot_service::reload(state.source.as_ref(), &state.snapshots)
        .await
        .map_err(|e| {
            error!("Reload failed: {}", e);
            e
        })?;
    Ok(Json(snapshot.summary()))
}
