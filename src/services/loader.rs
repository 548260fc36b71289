//! Normalizes raw upstream payloads into the canonical domain records.
//!
//! Every ambiguous field has one declared resolution table below: the first
//! listed key holding a non-null value wins. A value that is present but cannot
//! be parsed into its canonical type degrades to `None` and is reported as an
//! [`IntegrityWarning`]. The only hard failure is a structural one
//! ([`AppError::MalformedPayload`]).

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value};
use tracing::warn;

use crate::errors::AppError;
use crate::external::artifact_source::Artifact;
use crate::models::{
    change_point_by_index, ChangePoint, ConfidenceInterval, DiagnosticMetric, Diagnostics, Event,
    EventId, EventType, ImpactLevel, ImpactRecord, IntegrityWarning, PriceImpact, PricePoint,
    VolatilityImpact, WarningKind,
};

// Historical series
const SERIES_DATES: &[&str] = &["dates", "date"];
const SERIES_PRICES: &[&str] = &["prices", "price", "Price"];
const SERIES_LOG_RETURNS: &[&str] = &["log_returns", "logReturns", "returns"];

// List wrappers when a collection arrives as an object
const CHANGE_POINT_LISTS: &[&str] = &["change_points", "changepoints", "data"];
const EVENT_LISTS: &[&str] = &["events", "data"];
const IMPACT_LISTS: &[&str] = &["impact_analysis", "impacts", "data"];

// Change points
const CP_INDEX: &[&str] = &["index", "id", "changepoint_id"];
const CP_DATE: &[&str] = &["date", "changepoint_date", "tau_date"];
const CP_PROBABILITY: &[&str] = &["probability", "prob", "posterior_probability"];
const CP_PRICE: &[&str] = &["price_at_changepoint", "priceAtChangepoint", "price"];
const CP_INTERVAL: &[&str] = &["confidence_interval", "confidenceInterval", "ci"];
const INTERVAL_LOWER: &[&str] = &["lower", "start"];
const INTERVAL_UPPER: &[&str] = &["upper", "end"];

// Events
const EVENT_ID: &[&str] = &["id", "event_id", "eventId"];
const EVENT_DATE: &[&str] = &["date", "event_date", "eventDate"];
const EVENT_NAME: &[&str] = &["name", "event", "event_name", "eventName"];
const EVENT_TYPE: &[&str] = &["type", "event_type", "category"];
const EVENT_IMPACT: &[&str] = &["impact_level", "impactLevel", "impact"];
const EVENT_DESCRIPTION: &[&str] = &["description", "details"];

// Impact records
const IMPACT_CP_ID: &[&str] = &["changepoint_id", "changepointId", "id"];
const IMPACT_CP_DATE: &[&str] = &["changepoint_date", "changepointDate", "date"];
const IMPACT_PRICE: &[&str] = &["price_impact", "priceImpact"];
const IMPACT_VOLATILITY: &[&str] = &["volatility_impact", "volatilityImpact"];
const BEFORE_MEAN: &[&str] = &["before_mean", "beforeMean"];
const AFTER_MEAN: &[&str] = &["after_mean", "afterMean"];
const BEFORE_STD: &[&str] = &["before_std", "beforeStd"];
const AFTER_STD: &[&str] = &["after_std", "afterStd"];
const CHANGE_PERCENT: &[&str] = &["change_percent", "changePercent", "change_pct"];
const SIGNIFICANCE: &[&str] = &["significance"];

// Summary
const SUMMARY_DIAGNOSTICS: &[&str] = &["model_diagnostics", "diagnostics", "model_performance"];
const SUMMARY_TOTAL_CHANGEPOINTS: &[&str] = &["total_changepoints"];
const SUMMARY_TOTAL_EVENTS: &[&str] = &["total_events"];

/// First non-null value among `fields`, in table order.
pub fn resolve<'a>(record: &'a Map<String, Value>, fields: &[&str]) -> Option<&'a Value> {
    fields
        .iter()
        .filter_map(|field| record.get(*field))
        .find(|value| !value.is_null())
}

/// Parse an ISO calendar date. Timestamps with a time part (`2020-03-01T00:00:00`)
/// keep only the date.
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.len() > 10 && !matches!(raw.as_bytes()[10], b'T' | b' ') {
        return None;
    }
    let day = raw.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

// Strings are ISO dates, integers are epoch milliseconds.
fn date_value(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::String(s) => parse_calendar_date(s),
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|dt| dt.date_naive()),
        _ => None,
    }
}

fn flag(warnings: &mut Vec<IntegrityWarning>, warning: IntegrityWarning) {
    warn!(
        "Integrity warning ({:?}) in {} {} field {}: {}",
        warning.kind, warning.artifact, warning.record, warning.field, warning.detail
    );
    warnings.push(warning);
}

/// Typed field access over one raw record, reporting unparseable values.
struct RecordReader<'a, 'w> {
    artifact: Artifact,
    record: String,
    prefix: &'static str,
    fields: &'a Map<String, Value>,
    warnings: &'w mut Vec<IntegrityWarning>,
}

impl<'a, 'w> RecordReader<'a, 'w> {
    fn new(
        artifact: Artifact,
        record: String,
        fields: &'a Map<String, Value>,
        warnings: &'w mut Vec<IntegrityWarning>,
    ) -> Self {
        Self {
            artifact,
            record,
            prefix: "",
            fields,
            warnings,
        }
    }

    fn nested<'c>(
        &'c mut self,
        prefix: &'static str,
        fields: &'a Map<String, Value>,
    ) -> RecordReader<'a, 'c> {
        RecordReader {
            artifact: self.artifact,
            record: self.record.clone(),
            prefix,
            fields,
            warnings: &mut *self.warnings,
        }
    }

    fn flag(&mut self, kind: WarningKind, table: &[&str], detail: String) {
        let field = match (self.prefix, table.first()) {
            ("", Some(name)) => name.to_string(),
            (prefix, Some(name)) => format!("{}.{}", prefix, name),
            (prefix, None) => prefix.to_string(),
        };
        flag(
            self.warnings,
            IntegrityWarning::new(kind, self.artifact.name(), self.record.clone(), field, detail),
        );
    }

    fn value(&self, table: &[&str]) -> Option<&'a Value> {
        resolve(self.fields, table)
    }

    fn date(&mut self, table: &[&str]) -> Option<NaiveDate> {
        let value = self.value(table)?;
        let parsed = date_value(value);
        if parsed.is_none() {
            self.flag(WarningKind::InvalidField, table, format!("unparseable date {}", value));
        }
        parsed
    }

    fn number(&mut self, table: &[&str]) -> Option<f64> {
        let value = self.value(table)?;
        let parsed = value.as_f64();
        if parsed.is_none() {
            self.flag(WarningKind::InvalidField, table, format!("expected a number, got {}", value));
        }
        parsed
    }

    fn text(&mut self, table: &[&str]) -> Option<String> {
        let value = self.value(table)?;
        match value.as_str() {
            Some(s) => Some(s.to_string()),
            None => {
                self.flag(WarningKind::InvalidField, table, format!("expected a string, got {}", value));
                None
            }
        }
    }

    fn object(&mut self, table: &[&str]) -> Option<&'a Map<String, Value>> {
        let value = self.value(table)?;
        let parsed = value.as_object();
        if parsed.is_none() {
            self.flag(WarningKind::InvalidField, table, format!("expected an object, got {}", value));
        }
        parsed
    }
}

fn records<'a>(
    payload: &'a Value,
    artifact: Artifact,
    wrappers: &[&str],
) -> Result<&'a Vec<Value>, AppError> {
    match payload {
        Value::Array(items) => Ok(items),
        Value::Object(map) => resolve(map, wrappers)
            .and_then(Value::as_array)
            .ok_or_else(|| {
                AppError::malformed(
                    artifact.name(),
                    format!("expected a list or an object with one of {:?}", wrappers),
                )
            }),
        _ => Err(AppError::malformed(artifact.name(), "expected a list of records")),
    }
}

/// Load the historical price series.
///
/// The date and price arrays are required and must have equal length. Entries
/// with an unusable date or price, or out of ascending date order, are skipped
/// with a warning.
pub fn load_price_series(
    payload: &Value,
    warnings: &mut Vec<IntegrityWarning>,
) -> Result<Vec<PricePoint>, AppError> {
    let artifact = Artifact::HistoricalData;
    let record = payload
        .as_object()
        .ok_or_else(|| AppError::malformed(artifact.name(), "expected an object"))?;

    let dates = resolve(record, SERIES_DATES)
        .and_then(Value::as_array)
        .ok_or_else(|| AppError::malformed(artifact.name(), "missing dates array"))?;
    let prices = resolve(record, SERIES_PRICES)
        .and_then(Value::as_array)
        .ok_or_else(|| AppError::malformed(artifact.name(), "missing prices array"))?;

    if dates.len() != prices.len() {
        return Err(AppError::malformed(
            artifact.name(),
            format!(
                "dates ({}) and prices ({}) differ in length",
                dates.len(),
                prices.len()
            ),
        ));
    }

    let log_returns = match resolve(record, SERIES_LOG_RETURNS) {
        Some(Value::Array(values)) if values.len() == dates.len() => Some(values),
        Some(other) => {
            let detail = match other.as_array() {
                Some(values) => format!(
                    "{} log returns for {} dates; ignoring log returns",
                    values.len(),
                    dates.len()
                ),
                None => "log returns are not a list; ignoring".to_string(),
            };
            flag(
                warnings,
                IntegrityWarning::new(
                    WarningKind::MisalignedSeries,
                    artifact.name(),
                    "series",
                    SERIES_LOG_RETURNS[0],
                    detail,
                ),
            );
            None
        }
        None => None,
    };

    let mut points: Vec<PricePoint> = Vec::with_capacity(dates.len());
    for (i, (raw_date, raw_price)) in dates.iter().zip(prices).enumerate() {
        let record = format!("dates[{}]", i);

        let Some(date) = date_value(raw_date) else {
            flag(
                warnings,
                IntegrityWarning::new(
                    WarningKind::InvalidField,
                    artifact.name(),
                    record,
                    SERIES_DATES[0],
                    format!("unparseable date {}", raw_date),
                ),
            );
            continue;
        };

        let Some(price) = raw_price.as_f64() else {
            flag(
                warnings,
                IntegrityWarning::new(
                    WarningKind::InvalidField,
                    artifact.name(),
                    record,
                    SERIES_PRICES[0],
                    format!("expected a number, got {}", raw_price),
                ),
            );
            continue;
        };

        if let Some(last) = points.last() {
            if date <= last.date {
                flag(
                    warnings,
                    IntegrityWarning::new(
                        WarningKind::MisalignedSeries,
                        artifact.name(),
                        record,
                        SERIES_DATES[0],
                        format!("{} does not follow {}", date, last.date),
                    ),
                );
                continue;
            }
        }

        let log_return = log_returns.and_then(|values| values[i].as_f64());
        points.push(PricePoint::new(date, price, log_return));
    }

    Ok(points)
}

/// Load change points. `index` is always the position in the upstream list.
pub fn load_change_points(
    payload: &Value,
    warnings: &mut Vec<IntegrityWarning>,
) -> Result<Vec<ChangePoint>, AppError> {
    let artifact = Artifact::ChangePoints;
    let items = records(payload, artifact, CHANGE_POINT_LISTS)?;

    let mut change_points = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let record = format!("{}[{}]", artifact.name(), index);
        let Some(fields) = item.as_object() else {
            flag(
                warnings,
                IntegrityWarning::new(
                    WarningKind::InvalidField,
                    artifact.name(),
                    record,
                    "",
                    "record is not an object",
                ),
            );
            continue;
        };

        let mut reader = RecordReader::new(artifact, record, fields, warnings);

        if let Some(declared) = reader.value(CP_INDEX) {
            if declared.as_u64() != Some(index as u64) {
                reader.flag(
                    WarningKind::InvalidField,
                    CP_INDEX,
                    format!("declared {} but detection position is {}", declared, index),
                );
            }
        }

        let date = reader.date(CP_DATE);
        let probability = reader.number(CP_PROBABILITY);
        if let Some(p) = probability {
            if !(0.0..=1.0).contains(&p) {
                reader.flag(
                    WarningKind::OutOfRange,
                    CP_PROBABILITY,
                    format!("probability {} outside [0, 1]", p),
                );
            }
        }
        let price_at_changepoint = reader.number(CP_PRICE);
        let confidence_interval = read_interval(&mut reader);

        change_points.push(ChangePoint {
            index,
            date,
            probability,
            price_at_changepoint,
            confidence_interval,
        });
    }

    Ok(change_points)
}

// Accepts `{lower, upper}` or a two-element `[lower, upper]` list.
fn read_interval(reader: &mut RecordReader<'_, '_>) -> Option<ConfidenceInterval> {
    let value = reader.value(CP_INTERVAL)?;
    let bounds = match value {
        Value::Object(map) => {
            let mut nested = reader.nested(CP_INTERVAL[0], map);
            (nested.date(INTERVAL_LOWER), nested.date(INTERVAL_UPPER))
        }
        Value::Array(items) if items.len() == 2 => (date_value(&items[0]), date_value(&items[1])),
        _ => (None, None),
    };

    match bounds {
        (Some(lower), Some(upper)) => {
            if lower > upper {
                reader.flag(
                    WarningKind::OutOfRange,
                    CP_INTERVAL,
                    format!("lower bound {} after upper bound {}", lower, upper),
                );
            }
            Some(ConfidenceInterval { lower, upper })
        }
        _ => {
            reader.flag(
                WarningKind::InvalidField,
                CP_INTERVAL,
                format!("unusable confidence interval {}", value),
            );
            None
        }
    }
}

/// Load events, normalizing the type to its canonical lowercase form.
pub fn load_events(
    payload: &Value,
    warnings: &mut Vec<IntegrityWarning>,
) -> Result<Vec<Event>, AppError> {
    let artifact = Artifact::Events;
    let items = records(payload, artifact, EVENT_LISTS)?;

    let mut seen: HashSet<EventId> = HashSet::with_capacity(items.len());
    let mut events = Vec::with_capacity(items.len());
    for (position, item) in items.iter().enumerate() {
        let record = format!("{}[{}]", artifact.name(), position);
        let Some(fields) = item.as_object() else {
            flag(
                warnings,
                IntegrityWarning::new(
                    WarningKind::InvalidField,
                    artifact.name(),
                    record,
                    "",
                    "record is not an object",
                ),
            );
            continue;
        };

        let mut reader = RecordReader::new(artifact, record, fields, warnings);

        let id = match reader.value(EVENT_ID) {
            Some(Value::Number(n)) if n.as_i64().is_some() => n.as_i64().map(EventId::Int),
            Some(Value::String(s)) if !s.trim().is_empty() => Some(EventId::Text(s.clone())),
            Some(other) => {
                reader.flag(
                    WarningKind::InvalidField,
                    EVENT_ID,
                    format!("unusable id {}; using #{}", other, position),
                );
                None
            }
            None => {
                reader.flag(
                    WarningKind::MissingField,
                    EVENT_ID,
                    format!("no id; using #{}", position),
                );
                None
            }
        }
        // "#<position>" cannot collide with a numeric upstream id
        .unwrap_or_else(|| EventId::Text(format!("#{}", position)));

        if !seen.insert(id.clone()) {
            reader.flag(
                WarningKind::DuplicateId,
                EVENT_ID,
                format!("event id {} appears more than once", id),
            );
        }

        let date = reader.date(EVENT_DATE);
        let name = reader.text(EVENT_NAME).unwrap_or_else(|| {
            reader.flag(WarningKind::MissingField, EVENT_NAME, "no event name".to_string());
            String::new()
        });
        let event_type = reader
            .text(EVENT_TYPE)
            .map(|raw| EventType::from_string(&raw))
            .unwrap_or(EventType::Other);
        let impact_level = reader.text(EVENT_IMPACT).and_then(|raw| {
            let level = ImpactLevel::from_string(&raw);
            if level.is_none() {
                reader.flag(
                    WarningKind::InvalidField,
                    EVENT_IMPACT,
                    format!("unrecognized impact level {:?}", raw),
                );
            }
            level
        });
        let description = reader
            .text(EVENT_DESCRIPTION)
            .filter(|text| !text.trim().is_empty());

        events.push(Event {
            id,
            date,
            name,
            event_type,
            impact_level,
            description,
        });
    }

    Ok(events)
}

/// Load impact records and check each against the change points of the batch.
/// Dangling or missing change point ids are kept and reported.
pub fn load_impact_records(
    payload: Option<&Value>,
    change_points: &[ChangePoint],
    warnings: &mut Vec<IntegrityWarning>,
) -> Result<Vec<ImpactRecord>, AppError> {
    let artifact = Artifact::ImpactAnalysis;
    let Some(payload) = payload else {
        return Ok(Vec::new());
    };
    let items = records(payload, artifact, IMPACT_LISTS)?;

    let mut impacts = Vec::with_capacity(items.len());
    for (position, item) in items.iter().enumerate() {
        let record = format!("{}[{}]", artifact.name(), position);
        let Some(fields) = item.as_object() else {
            flag(
                warnings,
                IntegrityWarning::new(
                    WarningKind::InvalidField,
                    artifact.name(),
                    record,
                    "",
                    "record is not an object",
                ),
            );
            continue;
        };

        let mut reader = RecordReader::new(artifact, record, fields, warnings);

        let changepoint_id = match reader.value(IMPACT_CP_ID) {
            Some(value) => {
                let id = value.as_u64().map(|id| id as usize);
                if id.is_none() {
                    reader.flag(
                        WarningKind::InvalidField,
                        IMPACT_CP_ID,
                        format!("unusable change point id {}", value),
                    );
                }
                id
            }
            None => {
                reader.flag(
                    WarningKind::MissingField,
                    IMPACT_CP_ID,
                    "no change point id".to_string(),
                );
                None
            }
        };

        let change_point = changepoint_id.and_then(|id| change_point_by_index(change_points, id));
        if let (Some(id), None) = (changepoint_id, change_point) {
            reader.flag(
                WarningKind::DanglingReference,
                IMPACT_CP_ID,
                format!(
                    "change point {} does not exist ({} in batch)",
                    id,
                    change_points.len()
                ),
            );
        }

        let changepoint_date = reader
            .date(IMPACT_CP_DATE)
            .or_else(|| change_point.and_then(|cp| cp.date));

        let price_impact = match reader.object(IMPACT_PRICE) {
            Some(map) => {
                let mut nested = reader.nested(IMPACT_PRICE[0], map);
                PriceImpact {
                    before_mean: nested.number(BEFORE_MEAN),
                    after_mean: nested.number(AFTER_MEAN),
                    change_percent: nested.number(CHANGE_PERCENT),
                    significance: nested.text(SIGNIFICANCE),
                }
            }
            None => PriceImpact::default(),
        };

        let volatility_impact = match reader.object(IMPACT_VOLATILITY) {
            Some(map) => {
                let mut nested = reader.nested(IMPACT_VOLATILITY[0], map);
                VolatilityImpact {
                    before_std: nested.number(BEFORE_STD),
                    after_std: nested.number(AFTER_STD),
                    change_percent: nested.number(CHANGE_PERCENT),
                    significance: nested.text(SIGNIFICANCE),
                }
            }
            None => VolatilityImpact::default(),
        };

        impacts.push(ImpactRecord {
            changepoint_id,
            changepoint_date,
            price_impact,
            volatility_impact,
        });
    }

    Ok(impacts)
}

/// Diagnostics come from their own artifact; when that is absent or empty the
/// copy embedded in the summary is used. The four convergence metrics are
/// resolved here; a present value that is not a number is reported and left
/// unresolved.
pub fn load_diagnostics(
    payload: Option<&Value>,
    summary: Option<&Value>,
    warnings: &mut Vec<IntegrityWarning>,
) -> Diagnostics {
    let direct = payload
        .and_then(Value::as_object)
        .filter(|map| !map.is_empty())
        .map(|map| (Artifact::ModelDiagnostics, map));
    let embedded = || {
        summary
            .and_then(Value::as_object)
            .and_then(|map| resolve(map, SUMMARY_DIAGNOSTICS))
            .and_then(Value::as_object)
            .map(|map| (Artifact::Summary, map))
    };

    let Some((artifact, map)) = direct.or_else(embedded) else {
        return Diagnostics::default();
    };

    let mut reader = RecordReader::new(artifact, "model_diagnostics".to_string(), map, warnings);
    DiagnosticMetric::all()
        .into_iter()
        .fold(Diagnostics::new(map.clone()), |diagnostics, metric| {
            let value = reader.number(metric.fields());
            diagnostics.with_metric(metric, value)
        })
}

/// Compare upstream summary counts with the loaded collections.
pub fn check_summary(
    summary: Option<&Value>,
    change_points: &[ChangePoint],
    events: &[Event],
    warnings: &mut Vec<IntegrityWarning>,
) {
    let Some(map) = summary.and_then(Value::as_object) else {
        return;
    };

    let checks = [
        (SUMMARY_TOTAL_CHANGEPOINTS, change_points.len()),
        (SUMMARY_TOTAL_EVENTS, events.len()),
    ];
    for (table, loaded) in checks {
        let Some(declared) = resolve(map, table).and_then(Value::as_u64) else {
            continue;
        };
        if declared != loaded as u64 {
            flag(
                warnings,
                IntegrityWarning::new(
                    WarningKind::SummaryMismatch,
                    Artifact::Summary.name(),
                    "summary",
                    table[0],
                    format!("summary declares {} but {} were loaded", declared, loaded),
                ),
            );
        }
    }
}
