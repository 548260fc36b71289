use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::info;

use crate::errors::AppError;
use crate::models::Event;
use crate::routes::query::parse_query_date;
use crate::services::event_filter::{select_matching, EventFilter};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_events))
}

#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(rename = "type")]
    pub event_type: Option<String>,
}

/// Events matching the date range and type, in source order.
pub async fn get_events(
    Query(query): Query<EventsQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Event>>, AppError> {
    info!(
        "GET /api/events - start_date={:?}, end_date={:?}, type={:?}",
        query.start_date, query.end_date, query.event_type
    );
    let filter = EventFilter {
        start_date: parse_query_date("start_date", query.start_date.as_deref())?,
        end_date: parse_query_date("end_date", query.end_date.as_deref())?,
        event_type: query.event_type,
        ..Default::default()
    };

    let snapshot = state.snapshots.current()?;
    let events = select_matching(&snapshot.events, &filter.predicates(), &snapshot.associations);
    Ok(Json(events))
}
