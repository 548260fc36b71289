use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Event identity as emitted upstream: either a numeric row id or a string key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventId {
    Int(i64),
    Text(String),
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventId::Int(id) => write!(f, "{}", id),
            EventId::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for EventId {
    fn from(value: i64) -> Self {
        EventId::Int(value)
    }
}

impl From<&str> for EventId {
    fn from(value: &str) -> Self {
        EventId::Text(value.to_string())
    }
}

/// Canonical event category.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Geopolitical,
    Economic,
    Supply,
    Demand,
    Other,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Geopolitical => "geopolitical",
            EventType::Economic => "economic",
            EventType::Supply => "supply",
            EventType::Demand => "demand",
            EventType::Other => "other",
        }
    }

    /// Parse an upstream category label.
    ///
    /// Matching is case-insensitive. A label is recognized when it equals a
    /// canonical name or when its leading word does ("Geopolitical Conflict",
    /// "supply_disruption"). Anything else is `Other`.
    pub fn from_string(s: &str) -> Self {
        let normalized = s.trim().to_lowercase();
        Self::from_canonical(&normalized)
            .or_else(|| {
                normalized
                    .split(|c: char| c.is_whitespace() || c == '_' || c == '-' || c == '/')
                    .next()
                    .and_then(Self::from_canonical)
            })
            .unwrap_or(EventType::Other)
    }

    fn from_canonical(s: &str) -> Option<Self> {
        match s {
            "geopolitical" => Some(EventType::Geopolitical),
            "economic" => Some(EventType::Economic),
            "supply" => Some(EventType::Supply),
            "demand" => Some(EventType::Demand),
            "other" => Some(EventType::Other),
            _ => None,
        }
    }

    pub fn all() -> [EventType; 5] {
        [
            EventType::Geopolitical,
            EventType::Economic,
            EventType::Supply,
            EventType::Demand,
            EventType::Other,
        ]
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ImpactLevel {
    Low,
    Medium,
    High,
}

impl ImpactLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImpactLevel::Low => "low",
            ImpactLevel::Medium => "medium",
            ImpactLevel::High => "high",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Some(ImpactLevel::Low),
            "medium" => Some(ImpactLevel::Medium),
            "high" => Some(ImpactLevel::High),
            _ => None,
        }
    }
}

/// A labeled real-world event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub date: Option<NaiveDate>,
    pub name: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub impact_level: Option<ImpactLevel>,
    pub description: Option<String>,
}
