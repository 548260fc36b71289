use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::EventId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociatedEvent {
    pub event_id: EventId,
    pub event_name: String,
    pub event_date: NaiveDate,
    /// `event_date - changepoint_date` in days; negative when the event came first.
    pub days_difference: i64,
}

/// Events linked to one change point. Only change points with at least one
/// linked event have an entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Association {
    pub changepoint_id: usize,
    pub changepoint_date: NaiveDate,
    pub associated_events: Vec<AssociatedEvent>,
}
