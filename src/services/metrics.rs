//! Pure summary computations over a (possibly filtered) snapshot. Nothing here
//! caches; every call recomputes from its inputs.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::models::{
    AssociationStats, ChangePoint, ConvergenceVerdict, DataPeriod, DiagnosticMetric,
    Diagnostics, DiagnosticsReport, Event, EventTypeStats, ImpactAggregates, ImpactRecord,
    PricePoint, PriceSeriesStats, Summary,
};
use crate::services::association_index::AssociationIndex;
use crate::services::presentation;

/// Event count per canonical type. Types with no events are omitted.
pub fn event_type_stats(events: &[Event]) -> EventTypeStats {
    events.iter().fold(EventTypeStats::new(), |mut stats, event| {
        *stats.entry(event.event_type.as_str().to_string()).or_insert(0) += 1;
        stats
    })
}

/// Associated/unassociated split of `events`.
///
/// `associated` counts the distinct ids of `events` that appear in any
/// association, so `associated + unassociated == total` holds even when the
/// index was built over a larger collection.
pub fn association_stats(events: &[Event], index: &AssociationIndex) -> AssociationStats {
    let associated = events
        .iter()
        .filter(|event| index.is_associated(&event.id))
        .map(|event| &event.id)
        .collect::<HashSet<_>>()
        .len();
    let total = events.len();

    AssociationStats {
        total,
        associated,
        unassociated: total - associated,
    }
}

fn mean_abs(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let (sum, count) = values
        .flatten()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v.abs(), count + 1));

    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Mean absolute change percent for price and volatility. Records without a
/// value are left out of both numerator and denominator.
pub fn impact_aggregates(records: &[ImpactRecord]) -> ImpactAggregates {
    ImpactAggregates {
        records: records.len(),
        mean_abs_price_change_percent: mean_abs(
            records.iter().map(|r| r.price_impact.change_percent),
        ),
        mean_abs_volatility_change_percent: mean_abs(
            records.iter().map(|r| r.volatility_impact.change_percent),
        ),
    }
}

pub fn price_series_stats(prices: &[PricePoint]) -> Option<PriceSeriesStats> {
    let first = prices.first()?;
    let last = prices.last()?;

    let (min_price, max_price, sum) = prices.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY, 0.0),
        |(min, max, sum), p| (min.min(p.price), max.max(p.price), sum + p.price),
    );

    Some(PriceSeriesStats {
        start: first.date,
        end: last.date,
        total_records: prices.len(),
        min_price,
        max_price,
        mean_price: sum / prices.len() as f64,
    })
}

pub fn convergence_verdict(r_hat: Option<f64>) -> ConvergenceVerdict {
    match r_hat {
        Some(value) if value <= presentation::R_HAT_THRESHOLD => ConvergenceVerdict::Good,
        Some(_) => ConvergenceVerdict::Warning,
        None => ConvergenceVerdict::Unknown,
    }
}

fn recommendation(metric: DiagnosticMetric, value: f64) -> String {
    match metric {
        DiagnosticMetric::RHat => format!(
            "R-hat of {:.3} exceeds {}: run longer chains or more tuning steps and check the model parameterization",
            value,
            presentation::R_HAT_THRESHOLD
        ),
        DiagnosticMetric::EffectiveSampleSize => format!(
            "Effective sample size of {:.0} is below {}: increase the number of draws",
            value,
            presentation::ESS_THRESHOLD
        ),
        DiagnosticMetric::DivergentTransitions => format!(
            "{:.0} divergent transitions detected: raise target_accept or reparameterize the model",
            value
        ),
        DiagnosticMetric::EnergyBfmi => format!(
            "Energy BFMI of {:.2} is below {}: the sampler explores the posterior poorly; consider reparameterizing",
            value,
            presentation::BFMI_THRESHOLD
        ),
    }
}

/// Verdict, per-metric statuses and one recommendation per failing metric.
/// Metrics that were not reported produce no recommendation.
pub fn diagnostics_report(diagnostics: &Diagnostics) -> DiagnosticsReport {
    let statuses: Vec<_> = DiagnosticMetric::all()
        .into_iter()
        .map(|metric| presentation::metric_status(metric, diagnostics.get(metric)))
        .collect();

    let recommendations = statuses
        .iter()
        .filter(|status| status.healthy == Some(false))
        .filter_map(|status| status.value.map(|value| recommendation(status.metric, value)))
        .collect();

    DiagnosticsReport {
        verdict: convergence_verdict(diagnostics.r_hat),
        statuses,
        recommendations,
    }
}

pub fn summary(
    prices: &[PricePoint],
    change_points: &[ChangePoint],
    events: &[Event],
    index: &AssociationIndex,
    diagnostics: &Diagnostics,
    last_updated: DateTime<Utc>,
) -> Summary {
    Summary {
        total_changepoints: change_points.len(),
        total_events: events.len(),
        associated_events: association_stats(events, index).associated,
        data_period: DataPeriod {
            start: prices.first().map(|p| p.date),
            end: prices.last().map(|p| p.date),
            total_days: prices.len(),
        },
        model_performance: diagnostics.raw().clone(),
        last_updated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventId, EventType, PriceImpact, VolatilityImpact};
    use crate::services::loader;
    use chrono::NaiveDate;
    use serde_json::{json, Value};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn event(id: i64, day: &str, event_type: EventType) -> Event {
        Event {
            id: EventId::Int(id),
            date: Some(date(day)),
            name: format!("event {}", id),
            event_type,
            impact_level: None,
            description: None,
        }
    }

    fn diagnostics(value: Value) -> Diagnostics {
        loader::load_diagnostics(Some(&value), None, &mut Vec::new())
    }

    fn impact(price: Option<f64>, volatility: Option<f64>) -> ImpactRecord {
        ImpactRecord {
            changepoint_id: Some(0),
            changepoint_date: None,
            price_impact: PriceImpact {
                change_percent: price,
                ..Default::default()
            },
            volatility_impact: VolatilityImpact {
                change_percent: volatility,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_event_type_stats() {
        let events = vec![
            event(1, "2020-01-01", EventType::Economic),
            event(2, "2020-01-02", EventType::Economic),
            event(3, "2020-01-03", EventType::Supply),
        ];
        let stats = event_type_stats(&events);
        assert_eq!(stats.get("economic"), Some(&2));
        assert_eq!(stats.get("supply"), Some(&1));
        assert_eq!(stats.get("demand"), None);
    }

    #[test]
    fn test_association_stats_partition() {
        let events = vec![
            event(1, "2020-03-01", EventType::Supply),
            event(2, "2020-03-01", EventType::Demand),
            event(3, "2020-05-01", EventType::Other),
        ];
        let cps = vec![ChangePoint {
            index: 0,
            date: Some(date("2020-03-01")),
            probability: Some(0.9),
            price_at_changepoint: None,
            confidence_interval: None,
        }];
        let index = AssociationIndex::build(&cps, &events);

        let stats = association_stats(&events, &index);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.associated, 2);
        assert_eq!(stats.associated + stats.unassociated, stats.total);

        // the index may know events the filtered collection no longer holds
        let filtered = &events[2..];
        let stats = association_stats(filtered, &index);
        assert_eq!((stats.total, stats.associated, stats.unassociated), (1, 0, 1));
    }

    #[test]
    fn test_impact_aggregates_skip_missing_values() {
        let records = vec![
            impact(Some(-20.0), Some(50.0)),
            impact(Some(10.0), None),
            impact(None, Some(-150.0)),
        ];
        let aggregates = impact_aggregates(&records);
        assert_eq!(aggregates.records, 3);
        assert_eq!(aggregates.mean_abs_price_change_percent, Some(15.0));
        assert_eq!(aggregates.mean_abs_volatility_change_percent, Some(100.0));

        let empty = impact_aggregates(&[impact(None, None)]);
        assert_eq!(empty.mean_abs_price_change_percent, None);
        assert_eq!(empty.mean_abs_volatility_change_percent, None);
    }

    #[test]
    fn test_price_series_stats() {
        let prices = vec![
            PricePoint::new(date("2020-01-01"), 60.0, None),
            PricePoint::new(date("2020-01-02"), 30.0, Some(-0.69)),
            PricePoint::new(date("2020-01-03"), 45.0, Some(0.41)),
        ];
        let stats = price_series_stats(&prices).unwrap();
        assert_eq!(stats.start, date("2020-01-01"));
        assert_eq!(stats.end, date("2020-01-03"));
        assert_eq!(stats.min_price, 30.0);
        assert_eq!(stats.max_price, 60.0);
        assert_eq!(stats.mean_price, 45.0);
        assert!(price_series_stats(&[]).is_none());
    }

    #[test]
    fn test_healthy_diagnostics_have_no_recommendations() {
        let report = diagnostics_report(&diagnostics(
            json!({"rhat_max": 1.05, "ess_min": 500, "n_divergent": 0}),
        ));
        assert_eq!(report.verdict, ConvergenceVerdict::Good);
        assert!(report.recommendations.is_empty());
    }

    #[test]
    fn test_failing_diagnostics_recommend_per_metric() {
        let report = diagnostics_report(&diagnostics(
            json!({"r_hat": 1.3, "ess_min": 150, "divergences": 3}),
        ));
        assert_eq!(report.verdict, ConvergenceVerdict::Warning);
        assert_eq!(report.recommendations.len(), 3);
        assert!(report.recommendations[0].contains("R-hat"));
        assert!(report.recommendations[1].contains("Effective sample size"));
        assert!(report.recommendations[2].contains("divergent"));
    }

    #[test]
    fn test_low_bfmi_recommends() {
        let report = diagnostics_report(&diagnostics(json!({"energy_bfmi": 0.1})));
        assert_eq!(report.verdict, ConvergenceVerdict::Unknown);
        assert_eq!(report.recommendations.len(), 1);
    }

    #[test]
    fn test_verdict_boundary() {
        assert_eq!(convergence_verdict(Some(1.1)), ConvergenceVerdict::Good);
        assert_eq!(convergence_verdict(Some(1.1001)), ConvergenceVerdict::Warning);
        assert_eq!(convergence_verdict(None), ConvergenceVerdict::Unknown);
    }

    #[test]
    fn test_summary_counts() {
        let prices = vec![
            PricePoint::new(date("1987-05-20"), 18.63, None),
            PricePoint::new(date("1987-05-21"), 18.45, None),
        ];
        let events = vec![event(1, "1987-05-21", EventType::Supply)];
        let cps = vec![ChangePoint {
            index: 0,
            date: Some(date("1987-05-21")),
            probability: None,
            price_at_changepoint: None,
            confidence_interval: None,
        }];
        let index = AssociationIndex::build(&cps, &events);
        let diag = diagnostics(json!({"r_hat_max": 1.0}));

        let result = summary(&prices, &cps, &events, &index, &diag, Utc::now());
        assert_eq!(result.total_changepoints, 1);
        assert_eq!(result.total_events, 1);
        assert_eq!(result.associated_events, 1);
        assert_eq!(result.data_period.start, Some(date("1987-05-20")));
        assert_eq!(result.data_period.total_days, 2);
        assert_eq!(result.model_performance.get("r_hat_max"), Some(&json!(1.0)));
    }
}
