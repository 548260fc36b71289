use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceImpact {
    pub before_mean: Option<f64>,
    pub after_mean: Option<f64>,
    pub change_percent: Option<f64>,
    pub significance: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VolatilityImpact {
    pub before_std: Option<f64>,
    pub after_std: Option<f64>,
    pub change_percent: Option<f64>,
    pub significance: Option<String>,
}

/// Before/after comparison bracketing a change point.
///
/// `changepoint_id` is `None` when the upstream record carried no usable id;
/// that case is reported as an integrity warning alongside dangling ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactRecord {
    pub changepoint_id: Option<usize>,
    pub changepoint_date: Option<NaiveDate>,
    pub price_impact: PriceImpact,
    pub volatility_impact: VolatilityImpact,
}
