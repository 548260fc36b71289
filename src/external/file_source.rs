use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::external::artifact_source::{Artifact, ArtifactSource, ArtifactSourceError};

/// Reads artifacts from `<dir>/<artifact>.json`.
pub struct FileArtifactSource {
    dir: PathBuf,
}

impl FileArtifactSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl ArtifactSource for FileArtifactSource {
    async fn fetch(&self, artifact: Artifact) -> Result<Option<Value>, ArtifactSourceError> {
        let path = self.dir.join(artifact.file_name());
        debug!("Reading {} from {}", artifact.name(), path.display());

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ArtifactSourceError::Io(format!("{}: {}", path.display(), e)));
            }
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| ArtifactSourceError::Parse(format!("{}: {}", path.display(), e)))
    }

    fn describe(&self) -> String {
        format!("files at {}", self.dir.display())
    }
}
