mod price_point;
mod change_point;
mod event;
mod association;
mod impact;
mod integrity;
mod summary;
pub mod diagnostics;
pub mod display;

pub use price_point::{PricePoint, PriceSeriesStats};
pub use change_point::{change_point_by_index, ChangePoint, ConfidenceInterval};
pub use event::{Event, EventId, EventType, ImpactLevel};
pub use association::{AssociatedEvent, Association};
pub use impact::{ImpactRecord, PriceImpact, VolatilityImpact};
pub use integrity::{IntegrityWarning, WarningKind};
pub use summary::{AssociationStats, DataPeriod, EventTypeStats, ImpactAggregates, Summary};
pub use diagnostics::{
    ConvergenceVerdict, DiagnosticMetric, Diagnostics, DiagnosticsReport, MetricStatus,
};
pub use display::{
    ChangePointCard, ConfidenceLabel, DashboardView, Direction, EventDisplay, ImpactDisplay,
    Truncated,
};
