use std::collections::{HashMap, HashSet};

use chrono::{Duration, NaiveDate};

use crate::models::{AssociatedEvent, Association, ChangePoint, Event, EventId};

/// Half-width, in days, of the window in which an event associates with a
/// change point. Zero means the dates must be equal.
pub const ASSOCIATION_WINDOW_DAYS: i64 = 0;

/// Bidirectional change point <-> event relation for one snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssociationIndex {
    associations: Vec<Association>,
    by_changepoint: HashMap<usize, usize>,
    changepoints_by_event: HashMap<EventId, Vec<usize>>,
}

impl AssociationIndex {
    pub fn build(change_points: &[ChangePoint], events: &[Event]) -> Self {
        Self::build_with_window(change_points, events, ASSOCIATION_WINDOW_DAYS)
    }

    /// Join change points to events whose date lies within `window_days` of the
    /// change point date.
    ///
    /// Events are bucketed by date once, then each change point looks up the
    /// dates of its window in ascending order, so the cost is
    /// O(E + C * (2w + 1)). Within a date, events keep their source order.
    /// Undated events and undated change points never associate.
    pub fn build_with_window(
        change_points: &[ChangePoint],
        events: &[Event],
        window_days: i64,
    ) -> Self {
        let window_days = window_days.max(0);

        let mut by_date: HashMap<NaiveDate, Vec<&Event>> = HashMap::new();
        for event in events {
            if let Some(date) = event.date {
                by_date.entry(date).or_default().push(event);
            }
        }

        let mut index = AssociationIndex::default();
        for change_point in change_points {
            let Some(cp_date) = change_point.date else {
                continue;
            };

            let mut associated_events = Vec::new();
            for offset in -window_days..=window_days {
                let Some(candidate) = cp_date.checked_add_signed(Duration::days(offset)) else {
                    continue;
                };
                let Some(hits) = by_date.get(&candidate) else {
                    continue;
                };
                associated_events.extend(hits.iter().map(|event| AssociatedEvent {
                    event_id: event.id.clone(),
                    event_name: event.name.clone(),
                    event_date: candidate,
                    days_difference: offset,
                }));
            }

            if associated_events.is_empty() {
                continue;
            }

            for associated in &associated_events {
                let linked = index
                    .changepoints_by_event
                    .entry(associated.event_id.clone())
                    .or_default();
                if !linked.contains(&change_point.index) {
                    linked.push(change_point.index);
                }
            }

            index
                .by_changepoint
                .insert(change_point.index, index.associations.len());
            index.associations.push(Association {
                changepoint_id: change_point.index,
                changepoint_date: cp_date,
                associated_events,
            });
        }

        index
    }

    /// Associations in change point order.
    pub fn associations(&self) -> &[Association] {
        &self.associations
    }

    pub fn get(&self, changepoint_id: usize) -> Option<&Association> {
        self.by_changepoint
            .get(&changepoint_id)
            .map(|&pos| &self.associations[pos])
    }

    /// Events linked to a change point; empty when it has none.
    pub fn events_for(&self, changepoint_id: usize) -> &[AssociatedEvent] {
        self.get(changepoint_id)
            .map(|association| association.associated_events.as_slice())
            .unwrap_or(&[])
    }

    /// Change points linked to an event; empty when it has none.
    pub fn changepoints_for(&self, event_id: &EventId) -> &[usize] {
        self.changepoints_by_event
            .get(event_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_associated(&self, event_id: &EventId) -> bool {
        self.changepoints_by_event.contains_key(event_id)
    }

    /// Union of all associated event ids.
    pub fn associated_event_ids(&self) -> HashSet<&EventId> {
        self.changepoints_by_event.keys().collect()
    }

    pub fn len(&self) -> usize {
        self.associations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.associations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventType;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn change_point(index: usize, day: Option<&str>) -> ChangePoint {
        ChangePoint {
            index,
            date: day.map(date),
            probability: Some(0.85),
            price_at_changepoint: None,
            confidence_interval: None,
        }
    }

    fn event(id: i64, day: Option<&str>, name: &str) -> Event {
        Event {
            id: EventId::Int(id),
            date: day.map(date),
            name: name.to_string(),
            event_type: EventType::Geopolitical,
            impact_level: None,
            description: None,
        }
    }

    #[test]
    fn test_exact_date_match_associates() {
        let cps = vec![change_point(0, Some("2020-03-01"))];
        let events = vec![event(1, Some("2020-03-01"), "Price war")];

        let index = AssociationIndex::build(&cps, &events);
        assert_eq!(index.len(), 1);
        let association = index.get(0).unwrap();
        assert_eq!(association.changepoint_id, 0);
        assert_eq!(association.associated_events.len(), 1);
        assert_eq!(association.associated_events[0].event_id, EventId::Int(1));
        assert_eq!(association.associated_events[0].days_difference, 0);
    }

    #[test]
    fn test_adjacent_dates_do_not_associate() {
        let cps = vec![change_point(0, Some("2020-03-01"))];
        let events = vec![event(1, Some("2020-03-02"), "Price war")];

        let index = AssociationIndex::build(&cps, &events);
        assert!(index.is_empty());
        assert!(index.get(0).is_none());
        assert!(index.events_for(0).is_empty());
        assert!(!index.is_associated(&EventId::Int(1)));
    }

    #[test]
    fn test_source_order_and_no_dedup_on_shared_date() {
        let cps = vec![
            change_point(0, Some("2008-09-15")),
            change_point(1, Some("2014-11-27")),
            change_point(2, Some("2008-09-15")),
        ];
        let events = vec![
            event(10, Some("2008-09-15"), "Lehman collapse"),
            event(11, Some("2014-11-27"), "OPEC holds output"),
            event(12, Some("2008-09-15"), "Merrill sale"),
        ];

        let index = AssociationIndex::build(&cps, &events);
        assert_eq!(index.len(), 3);
        let names: Vec<_> = index
            .events_for(0)
            .iter()
            .map(|e| e.event_name.as_str())
            .collect();
        assert_eq!(names, vec!["Lehman collapse", "Merrill sale"]);
        assert_eq!(index.changepoints_for(&EventId::Int(10)), &[0, 2]);
        assert_eq!(index.changepoints_for(&EventId::Int(11)), &[1]);
    }

    #[test]
    fn test_undated_records_never_associate() {
        let cps = vec![change_point(0, None), change_point(1, Some("2020-01-01"))];
        let events = vec![event(1, None, "Undated"), event(2, Some("2020-01-02"), "Later")];

        let index = AssociationIndex::build(&cps, &events);
        assert!(index.is_empty());
        assert!(index.associated_event_ids().is_empty());
    }

    #[test]
    fn test_window_reports_signed_day_difference() {
        let cps = vec![change_point(0, Some("2020-03-10"))];
        let events = vec![
            event(1, Some("2020-03-12"), "After"),
            event(2, Some("2020-03-07"), "Before"),
            event(3, Some("2020-03-20"), "Outside"),
        ];

        let index = AssociationIndex::build_with_window(&cps, &events, 3);
        let linked: Vec<_> = index
            .events_for(0)
            .iter()
            .map(|e| (e.event_id.clone(), e.days_difference))
            .collect();
        assert_eq!(linked, vec![(EventId::Int(2), -3), (EventId::Int(1), 2)]);
    }

    #[test]
    fn test_every_same_date_pair_links_and_no_other() {
        let days = ["2020-01-01", "2020-01-02", "2020-01-03"];
        let cps: Vec<_> = days
            .iter()
            .enumerate()
            .map(|(i, d)| change_point(i, Some(d)))
            .collect();
        let events: Vec<_> = days
            .iter()
            .rev()
            .enumerate()
            .map(|(i, d)| event(i as i64, Some(d), "e"))
            .collect();

        let index = AssociationIndex::build(&cps, &events);
        for cp in &cps {
            for ev in &events {
                let linked = index
                    .events_for(cp.index)
                    .iter()
                    .any(|a| a.event_id == ev.id);
                assert_eq!(linked, cp.date == ev.date);
                assert_eq!(
                    index.changepoints_for(&ev.id).contains(&cp.index),
                    cp.date == ev.date
                );
            }
        }
    }
}
