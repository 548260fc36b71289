use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Count of events per canonical type, keyed by the lowercase type name.
pub type EventTypeStats = BTreeMap<String, usize>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationStats {
    pub total: usize,
    pub associated: usize,
    pub unassociated: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpactAggregates {
    pub records: usize,
    pub mean_abs_price_change_percent: Option<f64>,
    pub mean_abs_volatility_change_percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPeriod {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub total_days: usize,
}

/// Aggregate counts served by `/api/summary`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_changepoints: usize,
    pub total_events: usize,
    pub associated_events: usize,
    pub data_period: DataPeriod,
    pub model_performance: Map<String, Value>,
    pub last_updated: DateTime<Utc>,
}
