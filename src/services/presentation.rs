//! Maps canonical records to display records for the dashboard.
//!
//! The thresholds below are fixed domain constants. They drive every warning
//! and recommendation the dashboard shows, so they are not configurable.

use chrono::NaiveDate;

use crate::models::{
    change_point_by_index, ChangePoint, ChangePointCard, ConfidenceLabel, DiagnosticMetric,
    Direction, Event, EventDisplay, EventType, ImpactDisplay, ImpactLevel, ImpactRecord,
    MetricStatus, Truncated,
};
use crate::services::association_index::AssociationIndex;

pub const HIGH_CONFIDENCE_PROBABILITY: f64 = 0.8;
pub const MEDIUM_CONFIDENCE_PROBABILITY: f64 = 0.6;
pub const R_HAT_THRESHOLD: f64 = 1.1;
pub const ESS_THRESHOLD: f64 = 400.0;
pub const BFMI_THRESHOLD: f64 = 0.2;

pub const DISPLAY_DATE_FORMAT: &str = "%b %-d, %Y";
pub const NOT_AVAILABLE: &str = "N/A";
pub const UNKNOWN: &str = "Unknown";

pub fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format(DISPLAY_DATE_FORMAT).to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

pub fn format_price(price: Option<f64>) -> String {
    price
        .map(|p| format!("${:.2}", p))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

pub fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(v) if v > 0.0 => format!("+{:.2}%", v),
        Some(v) => format!("{:.2}%", v),
        None => NOT_AVAILABLE.to_string(),
    }
}

pub fn format_probability(probability: Option<f64>) -> String {
    probability
        .map(|p| format!("{:.1}%", p * 100.0))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Probability bucket. Values outside [0, 1] are `Unknown`.
pub fn confidence_label(probability: Option<f64>) -> ConfidenceLabel {
    match probability {
        Some(p) if !(0.0..=1.0).contains(&p) => ConfidenceLabel::Unknown,
        Some(p) if p >= HIGH_CONFIDENCE_PROBABILITY => ConfidenceLabel::High,
        Some(p) if p >= MEDIUM_CONFIDENCE_PROBABILITY => ConfidenceLabel::Medium,
        Some(_) => ConfidenceLabel::Low,
        None => ConfidenceLabel::Unknown,
    }
}

pub fn direction(change_percent: Option<f64>) -> Direction {
    match change_percent {
        Some(v) if v > 0.0 => Direction::Increase,
        Some(v) if v < 0.0 => Direction::Decrease,
        Some(_) => Direction::Unchanged,
        None => Direction::Unknown,
    }
}

pub fn event_type_color(event_type: EventType) -> &'static str {
    match event_type {
        EventType::Geopolitical => "#ef4444",
        EventType::Economic => "#3b82f6",
        EventType::Supply => "#f59e0b",
        EventType::Demand => "#10b981",
        EventType::Other => "#6b7280",
    }
}

pub fn severity_color(impact_level: Option<ImpactLevel>) -> &'static str {
    match impact_level {
        Some(ImpactLevel::High) => "#dc2626",
        Some(ImpactLevel::Medium) => "#d97706",
        Some(ImpactLevel::Low) => "#16a34a",
        None => "#6b7280",
    }
}

/// Display status of one diagnostic metric against its fixed threshold.
pub fn metric_status(metric: DiagnosticMetric, value: Option<f64>) -> MetricStatus {
    let Some(v) = value else {
        return MetricStatus {
            metric,
            value,
            label: NOT_AVAILABLE.to_string(),
            healthy: None,
        };
    };

    let (healthy, label) = match metric {
        DiagnosticMetric::RHat if v <= R_HAT_THRESHOLD => (true, "Converged"),
        DiagnosticMetric::RHat => (false, "Not converged"),
        DiagnosticMetric::EffectiveSampleSize if v >= ESS_THRESHOLD => (true, "Adequate"),
        DiagnosticMetric::EffectiveSampleSize => (false, "Low"),
        DiagnosticMetric::DivergentTransitions if v == 0.0 => (true, "Optimal"),
        DiagnosticMetric::DivergentTransitions => (false, "Divergences present"),
        DiagnosticMetric::EnergyBfmi if v >= BFMI_THRESHOLD => (true, "Adequate"),
        DiagnosticMetric::EnergyBfmi => (false, "Low"),
    };

    MetricStatus {
        metric,
        value,
        label: label.to_string(),
        healthy: Some(healthy),
    }
}

/// Keep the first `max` items and describe the rest as "+N more".
pub fn truncate<T: Clone>(items: &[T], max: usize) -> Truncated<T> {
    let shown = items.len().min(max);
    let remaining = items.len() - shown;

    Truncated {
        items: items[..shown].to_vec(),
        remaining,
        more_label: (remaining > 0).then(|| format!("+{} more", remaining)),
    }
}

pub fn event_display(event: &Event, index: &AssociationIndex) -> EventDisplay {
    EventDisplay {
        id: event.id.clone(),
        date: event.date,
        date_label: format_date(event.date),
        name: if event.name.is_empty() {
            UNKNOWN.to_string()
        } else {
            event.name.clone()
        },
        event_type: event.event_type.as_str().to_string(),
        type_color: event_type_color(event.event_type).to_string(),
        impact_level: event.impact_level.map(|level| level.as_str().to_string()),
        severity_color: severity_color(event.impact_level).to_string(),
        description: event.description.clone(),
        changepoint_ids: index.changepoints_for(&event.id).to_vec(),
    }
}

pub fn change_point_card(
    change_point: &ChangePoint,
    index: &AssociationIndex,
    max_events: usize,
) -> ChangePointCard {
    let names: Vec<String> = index
        .events_for(change_point.index)
        .iter()
        .map(|e| e.event_name.clone())
        .collect();

    ChangePointCard {
        id: change_point.index,
        date: change_point.date,
        date_label: format_date(change_point.date),
        probability: change_point.probability,
        probability_label: format_probability(change_point.probability),
        confidence: confidence_label(change_point.probability),
        probability_warning: !change_point.probability_in_range(),
        price_label: format_price(change_point.price_at_changepoint),
        interval_label: change_point.confidence_interval.map(|ci| {
            format!(
                "{} to {}",
                format_date(Some(ci.lower)),
                format_date(Some(ci.upper))
            )
        }),
        associated_events: truncate(&names, max_events),
    }
}

/// A record whose change point id is missing or dangling is shown as "Unknown".
pub fn impact_display(record: &ImpactRecord, change_points: &[ChangePoint]) -> ImpactDisplay {
    let change_point = record
        .changepoint_id
        .and_then(|id| change_point_by_index(change_points, id));

    let changepoint_label = match change_point {
        Some(cp) => format!(
            "Change point {} ({})",
            cp.index + 1,
            format_date(record.changepoint_date.or(cp.date))
        ),
        None => UNKNOWN.to_string(),
    };

    let significance = |s: &Option<String>| s.clone().unwrap_or_else(|| UNKNOWN.to_lowercase());

    ImpactDisplay {
        changepoint_id: record.changepoint_id,
        changepoint_label,
        price_change_label: format_percent(record.price_impact.change_percent),
        price_direction: direction(record.price_impact.change_percent),
        price_significance: significance(&record.price_impact.significance),
        volatility_change_label: format_percent(record.volatility_impact.change_percent),
        volatility_direction: direction(record.volatility_impact.change_percent),
        volatility_significance: significance(&record.volatility_impact.significance),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConfidenceInterval, EventId, PriceImpact, VolatilityImpact};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date(Some(date("2020-03-01"))), "Mar 1, 2020");
        assert_eq!(format_date(Some(date("2008-09-15"))), "Sep 15, 2008");
        assert_eq!(format_date(None), "N/A");
    }

    #[test]
    fn test_confidence_thresholds() {
        assert_eq!(confidence_label(Some(0.85)), ConfidenceLabel::High);
        assert_eq!(confidence_label(Some(0.8)), ConfidenceLabel::High);
        assert_eq!(confidence_label(Some(0.79)), ConfidenceLabel::Medium);
        assert_eq!(confidence_label(Some(0.6)), ConfidenceLabel::Medium);
        assert_eq!(confidence_label(Some(0.59)), ConfidenceLabel::Low);
        assert_eq!(confidence_label(Some(1.3)), ConfidenceLabel::Unknown);
        assert_eq!(confidence_label(None), ConfidenceLabel::Unknown);
        assert_eq!(ConfidenceLabel::High.as_str(), "High confidence");
    }

    #[test]
    fn test_metric_statuses() {
        let r_hat = metric_status(DiagnosticMetric::RHat, Some(1.1));
        assert_eq!((r_hat.healthy, r_hat.label.as_str()), (Some(true), "Converged"));

        let ess = metric_status(DiagnosticMetric::EffectiveSampleSize, Some(399.0));
        assert_eq!(ess.healthy, Some(false));
        let ess = metric_status(DiagnosticMetric::EffectiveSampleSize, Some(400.0));
        assert_eq!(ess.healthy, Some(true));

        let div = metric_status(DiagnosticMetric::DivergentTransitions, Some(0.0));
        assert_eq!(div.label, "Optimal");
        let div = metric_status(DiagnosticMetric::DivergentTransitions, Some(1.0));
        assert_eq!(div.healthy, Some(false));

        let bfmi = metric_status(DiagnosticMetric::EnergyBfmi, Some(0.2));
        assert_eq!(bfmi.healthy, Some(true));

        let missing = metric_status(DiagnosticMetric::EnergyBfmi, None);
        assert_eq!((missing.healthy, missing.label.as_str()), (None, "N/A"));
    }

    #[test]
    fn test_truncate_with_remainder() {
        let items = vec!["a", "b", "c", "d", "e"];
        let cut = truncate(&items, 3);
        assert_eq!(cut.items, vec!["a", "b", "c"]);
        assert_eq!(cut.remaining, 2);
        assert_eq!(cut.more_label.as_deref(), Some("+2 more"));

        let whole = truncate(&items, 10);
        assert_eq!(whole.items.len(), 5);
        assert_eq!(whole.more_label, None);

        let none = truncate(&items, 0);
        assert!(none.items.is_empty());
        assert_eq!(none.more_label.as_deref(), Some("+5 more"));
    }

    #[test]
    fn test_percent_and_direction() {
        assert_eq!(format_percent(Some(12.3456)), "+12.35%");
        assert_eq!(format_percent(Some(-3.0)), "-3.00%");
        assert_eq!(format_percent(None), "N/A");
        assert_eq!(direction(Some(-3.0)), Direction::Decrease);
        assert_eq!(direction(Some(0.0)), Direction::Unchanged);
        assert_eq!(direction(None), Direction::Unknown);
    }

    #[test]
    fn test_change_point_card_truncates_associated_events() {
        let cp = ChangePoint {
            index: 0,
            date: Some(date("2020-03-09")),
            probability: Some(0.91),
            price_at_changepoint: Some(34.36),
            confidence_interval: Some(ConfidenceInterval {
                lower: date("2020-03-02"),
                upper: date("2020-03-16"),
            }),
        };
        let events: Vec<Event> = (0..4)
            .map(|i| Event {
                id: EventId::Int(i),
                date: Some(date("2020-03-09")),
                name: format!("event {}", i),
                event_type: EventType::Supply,
                impact_level: None,
                description: None,
            })
            .collect();
        let index = AssociationIndex::build(&[cp.clone()], &events);

        let card = change_point_card(&cp, &index, 2);
        assert_eq!(card.date_label, "Mar 9, 2020");
        assert_eq!(card.confidence, ConfidenceLabel::High);
        assert_eq!(card.probability_label, "91.0%");
        assert_eq!(card.price_label, "$34.36");
        assert!(!card.probability_warning);
        assert_eq!(card.associated_events.items, vec!["event 0", "event 1"]);
        assert_eq!(card.associated_events.more_label.as_deref(), Some("+2 more"));
        // the index itself keeps every event
        assert_eq!(index.events_for(0).len(), 4);

        let display = event_display(&events[3], &index);
        assert_eq!(display.changepoint_ids, vec![0]);
        assert_eq!(display.type_color, "#f59e0b");
    }

    #[test]
    fn test_dangling_impact_is_unknown() {
        let record = ImpactRecord {
            changepoint_id: Some(7),
            changepoint_date: None,
            price_impact: PriceImpact {
                change_percent: Some(-25.0),
                significance: Some("high".into()),
                ..Default::default()
            },
            volatility_impact: VolatilityImpact::default(),
        };
        let display = impact_display(&record, &[]);
        assert_eq!(display.changepoint_label, "Unknown");
        assert_eq!(display.price_change_label, "-25.00%");
        assert_eq!(display.price_direction, Direction::Decrease);
        assert_eq!(display.price_significance, "high");
        assert_eq!(display.volatility_significance, "unknown");
    }

    #[test]
    fn test_impact_label_uses_detection_index() {
        // change point 0 was unusable upstream and is absent
        let change_points: Vec<_> = [(1, "2020-03-01"), (2, "2021-01-01")]
            .into_iter()
            .map(|(index, day)| ChangePoint {
                index,
                date: Some(date(day)),
                probability: Some(0.9),
                price_at_changepoint: None,
                confidence_interval: None,
            })
            .collect();
        let record = |id| ImpactRecord {
            changepoint_id: Some(id),
            changepoint_date: None,
            price_impact: PriceImpact::default(),
            volatility_impact: VolatilityImpact::default(),
        };

        assert_eq!(
            impact_display(&record(1), &change_points).changepoint_label,
            "Change point 2 (Mar 1, 2020)"
        );
        assert_eq!(
            impact_display(&record(2), &change_points).changepoint_label,
            "Change point 3 (Jan 1, 2021)"
        );
        assert_eq!(impact_display(&record(0), &change_points).changepoint_label, "Unknown");
    }
}
