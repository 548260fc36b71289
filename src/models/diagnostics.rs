use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Sampler convergence metrics the dashboard interprets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticMetric {
    RHat,
    EffectiveSampleSize,
    DivergentTransitions,
    EnergyBfmi,
}

impl DiagnosticMetric {
    /// Upstream key names in resolution order. The first key holding a
    /// non-null value wins.
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            DiagnosticMetric::RHat => &["r_hat_max", "rhat_max", "r_hat", "rhat"],
            DiagnosticMetric::EffectiveSampleSize => {
                &["ess_bulk_min", "ess_min", "ess_bulk", "ess"]
            }
            DiagnosticMetric::DivergentTransitions => &[
                "n_divergent",
                "divergences",
                "divergent_transitions",
                "n_divergences",
            ],
            DiagnosticMetric::EnergyBfmi => &["energy_bfmi_min", "energy_bfmi", "bfmi"],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DiagnosticMetric::RHat => "R-hat",
            DiagnosticMetric::EffectiveSampleSize => "Effective sample size",
            DiagnosticMetric::DivergentTransitions => "Divergent transitions",
            DiagnosticMetric::EnergyBfmi => "Energy BFMI",
        }
    }

    pub fn all() -> [DiagnosticMetric; 4] {
        [
            DiagnosticMetric::RHat,
            DiagnosticMetric::EffectiveSampleSize,
            DiagnosticMetric::DivergentTransitions,
            DiagnosticMetric::EnergyBfmi,
        ]
    }
}

/// Convergence metrics resolved and validated by the loader, alongside the
/// upstream mapping as received.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    pub r_hat: Option<f64>,
    pub effective_sample_size: Option<f64>,
    pub divergent_transitions: Option<f64>,
    pub energy_bfmi: Option<f64>,
    raw: Map<String, Value>,
}

impl Diagnostics {
    /// Diagnostics with no metric resolved yet.
    pub fn new(raw: Map<String, Value>) -> Self {
        Self {
            raw,
            ..Default::default()
        }
    }

    pub fn with_metric(mut self, metric: DiagnosticMetric, value: Option<f64>) -> Self {
        match metric {
            DiagnosticMetric::RHat => self.r_hat = value,
            DiagnosticMetric::EffectiveSampleSize => self.effective_sample_size = value,
            DiagnosticMetric::DivergentTransitions => self.divergent_transitions = value,
            DiagnosticMetric::EnergyBfmi => self.energy_bfmi = value,
        }
        self
    }

    pub fn get(&self, metric: DiagnosticMetric) -> Option<f64> {
        match metric {
            DiagnosticMetric::RHat => self.r_hat,
            DiagnosticMetric::EffectiveSampleSize => self.effective_sample_size,
            DiagnosticMetric::DivergentTransitions => self.divergent_transitions,
            DiagnosticMetric::EnergyBfmi => self.energy_bfmi,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// The upstream mapping, served verbatim by `/api/model-diagnostics`.
    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }
}

/// Overall convergence verdict derived from R-hat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConvergenceVerdict {
    Good,
    Warning,
    Unknown,
}

impl ConvergenceVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConvergenceVerdict::Good => "Good",
            ConvergenceVerdict::Warning => "Warning",
            ConvergenceVerdict::Unknown => "N/A",
        }
    }
}

/// Display status of a single diagnostic metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricStatus {
    pub metric: DiagnosticMetric,
    pub value: Option<f64>,
    pub label: String,
    /// `None` when the metric was not reported.
    pub healthy: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsReport {
    pub verdict: ConvergenceVerdict,
    pub statuses: Vec<MetricStatus>,
    pub recommendations: Vec<String>,
}
