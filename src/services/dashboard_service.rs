use chrono::NaiveDate;

use crate::models::{ChangePoint, DashboardView, ImpactRecord, PricePoint};
use crate::services::event_filter::EventFilter;
use crate::services::snapshot_service::DashboardSnapshot;
use crate::services::{metrics, presentation};

/// Associated events listed on a change point card before "+N more".
pub const DEFAULT_MAX_EVENTS: usize = 3;

fn in_range(date: Option<NaiveDate>, start: Option<NaiveDate>, end: Option<NaiveDate>) -> bool {
    match date {
        Some(d) => start.map_or(true, |s| d >= s) && end.map_or(true, |e| d <= e),
        None => start.is_none() && end.is_none(),
    }
}

/// Price points inside the filter's date range.
pub fn prices_in_range<'a>(
    prices: &'a [PricePoint],
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> &'a [PricePoint] {
    // the series is sorted ascending by the loader
    let from = start.map_or(0, |s| prices.partition_point(|p| p.date < s));
    let to = end.map_or(prices.len(), |e| prices.partition_point(|p| p.date <= e));
    if from >= to {
        &[]
    } else {
        &prices[from..to]
    }
}

fn change_points_in_range<'a>(
    change_points: &'a [ChangePoint],
    filter: &EventFilter,
) -> Vec<&'a ChangePoint> {
    change_points
        .iter()
        .filter(|cp| in_range(cp.date, filter.start_date, filter.end_date))
        .collect()
}

/// Impact records whose change point date falls in range. Records with no
/// resolvable date are always kept so they stay visible as "Unknown".
fn impacts_in_range<'a>(impacts: &'a [ImpactRecord], filter: &EventFilter) -> Vec<&'a ImpactRecord> {
    impacts
        .iter()
        .filter(|r| {
            r.changepoint_date.is_none() || in_range(r.changepoint_date, filter.start_date, filter.end_date)
        })
        .collect()
}

/// Assemble the complete view model for one filter state. The event filter
/// drives the event list and statistics; its date range also narrows the
/// change point cards, impact rows and price statistics.
pub fn build_dashboard(
    snapshot: &DashboardSnapshot,
    filter: &EventFilter,
    max_events: usize,
) -> DashboardView {
    let events = filter.apply(&snapshot.events, &snapshot.associations);
    let change_points = change_points_in_range(&snapshot.change_points, filter);
    let impacts = impacts_in_range(&snapshot.impacts, filter);
    let impact_records: Vec<ImpactRecord> = impacts.iter().map(|r| (*r).clone()).collect();

    DashboardView {
        events: events
            .iter()
            .map(|e| presentation::event_display(e, &snapshot.associations))
            .collect(),
        change_points: change_points
            .iter()
            .map(|cp| presentation::change_point_card(cp, &snapshot.associations, max_events))
            .collect(),
        impacts: impacts
            .iter()
            .map(|r| presentation::impact_display(r, &snapshot.change_points))
            .collect(),
        event_type_stats: metrics::event_type_stats(&events),
        association_stats: metrics::association_stats(&events, &snapshot.associations),
        impact_aggregates: metrics::impact_aggregates(&impact_records),
        price_stats: metrics::price_series_stats(prices_in_range(
            &snapshot.prices,
            filter.start_date,
            filter.end_date,
        )),
        diagnostics: metrics::diagnostics_report(&snapshot.diagnostics),
        warnings: snapshot.warnings.clone(),
    }
}
