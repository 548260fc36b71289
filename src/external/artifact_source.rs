use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Precomputed analysis artifacts produced by the upstream modeling pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    HistoricalData,
    ChangePoints,
    Events,
    ImpactAnalysis,
    ModelDiagnostics,
    Summary,
}

impl Artifact {
    pub fn name(&self) -> &'static str {
        match self {
            Artifact::HistoricalData => "historical_data",
            Artifact::ChangePoints => "change_points",
            Artifact::Events => "events",
            Artifact::ImpactAnalysis => "impact_analysis",
            Artifact::ModelDiagnostics => "model_diagnostics",
            Artifact::Summary => "summary",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.json", self.name())
    }

    /// Path of the artifact on the upstream REST service.
    pub fn api_path(&self) -> &'static str {
        match self {
            Artifact::HistoricalData => "api/historical-data",
            Artifact::ChangePoints => "api/change-points",
            Artifact::Events => "api/events",
            Artifact::ImpactAnalysis => "api/impact-analysis",
            Artifact::ModelDiagnostics => "api/model-diagnostics",
            Artifact::Summary => "api/summary",
        }
    }

    /// Required artifacts abort the load cycle when absent.
    pub fn is_required(&self) -> bool {
        matches!(
            self,
            Artifact::HistoricalData | Artifact::ChangePoints | Artifact::Events
        )
    }

    pub fn all() -> [Artifact; 6] {
        [
            Artifact::HistoricalData,
            Artifact::ChangePoints,
            Artifact::Events,
            Artifact::ImpactAnalysis,
            Artifact::ModelDiagnostics,
            Artifact::Summary,
        ]
    }
}

#[derive(Debug, Error)]
pub enum ArtifactSourceError {
    #[error("network error: {0}")]
    Network(String),

    #[error("bad status: {0}")]
    BadStatus(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("parse error: {0}")]
    Parse(String),
}

#[async_trait]
pub trait ArtifactSource: Send + Sync {
    /// Fetch one artifact as raw JSON. `Ok(None)` means the artifact does not
    /// exist at the source.
    async fn fetch(&self, artifact: Artifact) -> Result<Option<Value>, ArtifactSourceError>;

    /// Short human-readable description for logs.
    fn describe(&self) -> String;
}
