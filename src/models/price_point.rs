use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// One trading day of the historical price series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
    pub log_return: Option<f64>,
}

impl PricePoint {
    pub fn new(date: NaiveDate, price: f64, log_return: Option<f64>) -> Self {
        Self {
            date,
            price,
            log_return,
        }
    }
}

/// Descriptive statistics over a loaded price series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeriesStats {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub total_records: usize,
    pub min_price: f64,
    pub max_price: f64,
    pub mean_price: f64,
}
