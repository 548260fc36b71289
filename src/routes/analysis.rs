use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;

use crate::errors::AppError;
use crate::models::{Association, ConfidenceInterval, ImpactRecord, IntegrityWarning, Summary};
use crate::routes::query::DateRangeQuery;
use crate::services::dashboard_service::prices_in_range;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/historical-data", get(get_historical_data))
        .route("/change-points", get(get_change_points))
        .route("/event-associations", get(get_event_associations))
        .route("/impact-analysis", get(get_impact_analysis))
        .route("/model-diagnostics", get(get_model_diagnostics))
        .route("/summary", get(get_summary))
        .route("/warnings", get(get_warnings))
}

#[derive(Debug, Serialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// Column-oriented price series, the shape charting clients consume.
#[derive(Debug, Serialize)]
pub struct HistoricalDataResponse {
    pub dates: Vec<NaiveDate>,
    pub prices: Vec<f64>,
    pub log_returns: Vec<Option<f64>>,
    pub total_records: usize,
    pub date_range: DateRange,
}

#[derive(Debug, Serialize)]
pub struct ChangePointResponse {
    pub id: usize,
    pub date: Option<NaiveDate>,
    pub probability: Option<f64>,
    pub confidence_interval: Option<ConfidenceInterval>,
    pub price_at_changepoint: Option<f64>,
}

pub async fn get_historical_data(
    Query(query): Query<DateRangeQuery>,
    State(state): State<AppState>,
) -> Result<Json<HistoricalDataResponse>, AppError> {
    info!(
        "GET /api/historical-data - start_date={:?}, end_date={:?}",
        query.start_date, query.end_date
    );
    let (start, end) = query.parse()?;
    let snapshot = state.snapshots.current()?;
    let prices = prices_in_range(&snapshot.prices, start, end);

    Ok(Json(HistoricalDataResponse {
        dates: prices.iter().map(|p| p.date).collect(),
        prices: prices.iter().map(|p| p.price).collect(),
        log_returns: prices.iter().map(|p| p.log_return).collect(),
        total_records: prices.len(),
        date_range: DateRange {
            start: prices.first().map(|p| p.date),
            end: prices.last().map(|p| p.date),
        },
    }))
}

pub async fn get_change_points(
    State(state): State<AppState>,
) -> Result<Json<Vec<ChangePointResponse>>, AppError> {
    info!("GET /api/change-points - Listing change points");
    let snapshot = state.snapshots.current()?;
    let change_points = snapshot
        .change_points
        .iter()
        .map(|cp| ChangePointResponse {
            id: cp.index,
            date: cp.date,
            probability: cp.probability,
            confidence_interval: cp.confidence_interval,
            price_at_changepoint: cp.price_at_changepoint,
        })
        .collect();
    Ok(Json(change_points))
}

pub async fn get_event_associations(
    State(state): State<AppState>,
) -> Result<Json<Vec<Association>>, AppError> {
    info!("GET /api/event-associations - Listing associations");
    let snapshot = state.snapshots.current()?;
    Ok(Json(snapshot.associations.associations().to_vec()))
}

pub async fn get_impact_analysis(
    State(state): State<AppState>,
) -> Result<Json<Vec<ImpactRecord>>, AppError> {
    info!("GET /api/impact-analysis - Listing impact records");
    let snapshot = state.snapshots.current()?;
    Ok(Json(snapshot.impacts.clone()))
}

pub async fn get_model_diagnostics(
    State(state): State<AppState>,
) -> Result<Json<Map<String, Value>>, AppError> {
    info!("GET /api/model-diagnostics - Raw diagnostics");
    let snapshot = state.snapshots.current()?;
    Ok(Json(snapshot.diagnostics.raw().clone()))
}

pub async fn get_summary(State(state): State<AppState>) -> Result<Json<Summary>, AppError> {
    info!("GET /api/summary - Analysis summary");
    let snapshot = state.snapshots.current()?;
    Ok(Json(snapshot.summary()))
}

pub async fn get_warnings(
    State(state): State<AppState>,
) -> Result<Json<Vec<IntegrityWarning>>, AppError> {
    info!("GET /api/warnings - Integrity warnings");
    let snapshot = state.snapshots.current()?;
    Ok(Json(snapshot.warnings.clone()))
}
