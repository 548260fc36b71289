use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// A record refers to a change point that is not in the batch.
    DanglingReference,
    /// A numeric value lies outside its natural domain.
    OutOfRange,
    /// A field was present but could not be parsed into its canonical type.
    InvalidField,
    /// A required identity field was absent.
    MissingField,
    /// An identity was seen more than once in the same batch.
    DuplicateId,
    /// Series entries out of date order or arrays of unequal length.
    MisalignedSeries,
    /// Upstream summary counts disagree with the loaded collections.
    SummaryMismatch,
}

/// Non-fatal data-integrity problem localized to one record and field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntegrityWarning {
    pub kind: WarningKind,
    pub artifact: String,
    pub record: String,
    pub field: String,
    pub detail: String,
}

impl IntegrityWarning {
    pub fn new(
        kind: WarningKind,
        artifact: impl Into<String>,
        record: impl Into<String>,
        field: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            artifact: artifact.into(),
            record: record.into(),
            field: field.into(),
            detail: detail.into(),
        }
    }
}
