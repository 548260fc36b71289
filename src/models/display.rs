use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{
    AssociationStats, DiagnosticsReport, EventId, EventTypeStats, ImpactAggregates,
    IntegrityWarning, PriceSeriesStats,
};

/// Qualitative bucket for a change point's posterior probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceLabel {
    #[serde(rename = "High confidence")]
    High,
    #[serde(rename = "Medium")]
    Medium,
    #[serde(rename = "Low")]
    Low,
    #[serde(rename = "Unknown")]
    Unknown,
}

impl ConfidenceLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLabel::High => "High confidence",
            ConfidenceLabel::Medium => "Medium",
            ConfidenceLabel::Low => "Low",
            ConfidenceLabel::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Increase,
    Decrease,
    Unchanged,
    Unknown,
}

/// A list cut to a display maximum, with a "+N more" indicator for the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Truncated<T> {
    pub items: Vec<T>,
    pub remaining: usize,
    pub more_label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDisplay {
    pub id: EventId,
    pub date: Option<NaiveDate>,
    pub date_label: String,
    pub name: String,
    pub event_type: String,
    pub type_color: String,
    pub impact_level: Option<String>,
    pub severity_color: String,
    pub description: Option<String>,
    pub changepoint_ids: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangePointCard {
    pub id: usize,
    pub date: Option<NaiveDate>,
    pub date_label: String,
    pub probability: Option<f64>,
    pub probability_label: String,
    pub confidence: ConfidenceLabel,
    pub probability_warning: bool,
    pub price_label: String,
    pub interval_label: Option<String>,
    pub associated_events: Truncated<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactDisplay {
    pub changepoint_id: Option<usize>,
    pub changepoint_label: String,
    pub price_change_label: String,
    pub price_direction: Direction,
    pub price_significance: String,
    pub volatility_change_label: String,
    pub volatility_direction: Direction,
    pub volatility_significance: String,
}

/// Everything the dashboard renders for one filter state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardView {
    pub events: Vec<EventDisplay>,
    pub change_points: Vec<ChangePointCard>,
    pub impacts: Vec<ImpactDisplay>,
    pub event_type_stats: EventTypeStats,
    pub association_stats: AssociationStats,
    pub impact_aggregates: ImpactAggregates,
    pub price_stats: Option<PriceSeriesStats>,
    pub diagnostics: DiagnosticsReport,
    pub warnings: Vec<IntegrityWarning>,
}
