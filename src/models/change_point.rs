use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Credible interval bracketing a detected change point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: NaiveDate,
    pub upper: NaiveDate,
}

/// A change point emitted by the upstream detector.
///
/// `index` is the 0-based position in detection order and is the join key for
/// associations and impact records. It is not a persistent identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangePoint {
    pub index: usize,
    pub date: Option<NaiveDate>,
    pub probability: Option<f64>,
    pub price_at_changepoint: Option<f64>,
    pub confidence_interval: Option<ConfidenceInterval>,
}

impl ChangePoint {
    /// False only when a probability is present and falls outside [0, 1].
    pub fn probability_in_range(&self) -> bool {
        self.probability
            .map(|p| (0.0..=1.0).contains(&p))
            .unwrap_or(true)
    }
}

/// Find a change point by its detection `index`.
///
/// The loader emits change points in ascending index order but skips unusable
/// entries, so the position in the slice is not the index.
pub fn change_point_by_index(
    change_points: &[ChangePoint],
    index: usize,
) -> Option<&ChangePoint> {
    change_points
        .binary_search_by_key(&index, |cp| cp.index)
        .ok()
        .map(|pos| &change_points[pos])
}
