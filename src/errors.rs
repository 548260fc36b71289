use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use thiserror::Error;

use crate::external::artifact_source::{Artifact, ArtifactSourceError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Malformed payload in {artifact}: {detail}")]
    MalformedPayload { artifact: String, detail: String },
    #[error("Transport failure fetching {artifact}: {detail}")]
    TransportFailure { artifact: String, detail: String },
    #[error("Analysis data not loaded: {0}")]
    NotLoaded(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not found")]
    NotFound,
}

impl AppError {
    pub fn malformed(artifact: impl Into<String>, detail: impl Into<String>) -> Self {
        AppError::MalformedPayload {
            artifact: artifact.into(),
            detail: detail.into(),
        }
    }

    pub fn transport(artifact: impl Into<String>, detail: impl Into<String>) -> Self {
        AppError::TransportFailure {
            artifact: artifact.into(),
            detail: detail.into(),
        }
    }

    /// Map a source failure for `artifact`. Undecodable bodies are structural
    /// problems; everything else is transport.
    pub fn from_source(artifact: Artifact, err: ArtifactSourceError) -> Self {
        match err {
            ArtifactSourceError::Parse(detail) => AppError::malformed(artifact.name(), detail),
            other => AppError::transport(artifact.name(), other.to_string()),
        }
    }

    /// True for the failures that abort a load cycle.
    pub fn is_load_failure(&self) -> bool {
        matches!(
            self,
            AppError::MalformedPayload { .. } | AppError::TransportFailure { .. }
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotLoaded(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::TransportFailure { .. } => StatusCode::BAD_GATEWAY,
            AppError::MalformedPayload { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
