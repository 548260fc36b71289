use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::external::artifact_source::{Artifact, ArtifactSource, ArtifactSourceError};

/// Fetches artifacts from an upstream REST service that echoes the stored
/// analysis results (e.g. `GET {base}/api/change-points`).
pub struct HttpArtifactSource {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpArtifactSource {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, ArtifactSourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ArtifactSourceError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: with_trailing_slash(base_url),
        })
    }

    fn artifact_url(&self, artifact: Artifact) -> Result<Url, ArtifactSourceError> {
        self.base_url
            .join(artifact.api_path())
            .map_err(|e| ArtifactSourceError::Network(format!("invalid artifact url: {}", e)))
    }
}

// Url::join replaces the last path segment unless the base ends with '/'.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[async_trait]
impl ArtifactSource for HttpArtifactSource {
    async fn fetch(&self, artifact: Artifact) -> Result<Option<Value>, ArtifactSourceError> {
        let url = self.artifact_url(artifact)?;
        debug!("GET {}", url);

        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ArtifactSourceError::Network(e.to_string()))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(ArtifactSourceError::BadStatus(format!(
                "{} returned {}",
                url,
                resp.status()
            )));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ArtifactSourceError::Network(e.to_string()))?;

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| ArtifactSourceError::Parse(format!("{}: {}", url, e)))
    }

    fn describe(&self) -> String {
        format!("upstream at {}", self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_urls_keep_base_path() {
        let base = Url::parse("http://analysis.local:5000/v1").unwrap();
        let source = HttpArtifactSource::new(base, Duration::from_secs(5)).unwrap();

        assert_eq!(
            source.artifact_url(Artifact::ChangePoints).unwrap().as_str(),
            "http://analysis.local:5000/v1/api/change-points"
        );
        assert_eq!(
            source.artifact_url(Artifact::HistoricalData).unwrap().as_str(),
            "http://analysis.local:5000/v1/api/historical-data"
        );
    }
}
