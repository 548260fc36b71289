use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::Event;
use crate::services::association_index::AssociationIndex;

/// A single event predicate. Predicates are independent of each other and
/// compose by logical AND.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPredicate {
    /// Keep events dated on or after the date.
    StartDate(NaiveDate),
    /// Keep events dated on or before the date.
    EndDate(NaiveDate),
    /// Keep events whose canonical type contains the lowercase substring.
    EventType(String),
    /// Keep events whose name or description contains the lowercase substring.
    Search(String),
    /// Keep events linked to at least one change point.
    AssociatedOnly,
}

impl EventPredicate {
    pub fn matches(&self, event: &Event, index: &AssociationIndex) -> bool {
        match self {
            EventPredicate::StartDate(start) => event.date.is_some_and(|d| d >= *start),
            EventPredicate::EndDate(end) => event.date.is_some_and(|d| d <= *end),
            EventPredicate::EventType(needle) => event.event_type.as_str().contains(needle.as_str()),
            EventPredicate::Search(needle) => {
                event.name.to_lowercase().contains(needle.as_str())
                    || event
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(needle.as_str()))
            }
            EventPredicate::AssociatedOnly => index.is_associated(&event.id),
        }
    }
}

/// The active filter set of the dashboard. Absent fields pass everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub event_type: Option<String>,
    pub search_query: Option<String>,
    #[serde(default)]
    pub associated_only: bool,
}

impl EventFilter {
    /// Predicates for the fields that are set. Blank strings are treated as
    /// absent; text predicates are lowercased once here.
    pub fn predicates(&self) -> Vec<EventPredicate> {
        let text = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_lowercase)
        };

        let mut predicates = Vec::new();
        if let Some(start) = self.start_date {
            predicates.push(EventPredicate::StartDate(start));
        }
        if let Some(end) = self.end_date {
            predicates.push(EventPredicate::EndDate(end));
        }
        if let Some(event_type) = text(&self.event_type) {
            predicates.push(EventPredicate::EventType(event_type));
        }
        if let Some(query) = text(&self.search_query) {
            predicates.push(EventPredicate::Search(query));
        }
        if self.associated_only {
            predicates.push(EventPredicate::AssociatedOnly);
        }
        predicates
    }

    pub fn is_empty(&self) -> bool {
        self.predicates().is_empty()
    }

    /// Matching events, most recent first.
    pub fn apply(&self, events: &[Event], index: &AssociationIndex) -> Vec<Event> {
        apply_predicates(events, &self.predicates(), index)
    }
}

/// Matching events in source order. The input is not modified.
pub fn select_matching(
    events: &[Event],
    predicates: &[EventPredicate],
    index: &AssociationIndex,
) -> Vec<Event> {
    events
        .iter()
        .filter(|event| predicates.iter().all(|p| p.matches(event, index)))
        .cloned()
        .collect()
}

/// Matching events sorted by date descending. Ties keep source order;
/// undated events sort last.
pub fn apply_predicates(
    events: &[Event],
    predicates: &[EventPredicate],
    index: &AssociationIndex,
) -> Vec<Event> {
    let mut selected = select_matching(events, predicates, index);
    sort_most_recent_first(&mut selected);
    selected
}

pub fn sort_most_recent_first(events: &mut [Event]) {
    // `sort_by` is stable; `None` orders below any date.
    events.sort_by(|a, b| b.date.cmp(&a.date));
}
