use std::sync::Arc;

use crate::external::artifact_source::ArtifactSource;
use crate::services::snapshot_service::SnapshotStore;

#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn ArtifactSource>,
    pub snapshots: SnapshotStore,
}

impl AppState {
    pub fn new(source: Arc<dyn ArtifactSource>) -> Self {
        Self {
            source,
            snapshots: SnapshotStore::new(),
        }
    }
}
