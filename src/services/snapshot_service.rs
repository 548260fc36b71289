use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{error, info};

use crate::errors::AppError;
use crate::external::artifact_source::{Artifact, ArtifactSource};
use crate::models::{
    ChangePoint, Diagnostics, Event, ImpactRecord, IntegrityWarning, PricePoint, Summary,
};
use crate::services::association_index::AssociationIndex;
use crate::services::{loader, metrics};

/// Immutable result of one load cycle. Every derived view is computed from a
/// single snapshot; a reload builds a new one instead of patching this.
#[derive(Debug)]
pub struct DashboardSnapshot {
    pub prices: Vec<PricePoint>,
    pub change_points: Vec<ChangePoint>,
    pub events: Vec<Event>,
    pub associations: AssociationIndex,
    pub impacts: Vec<ImpactRecord>,
    pub diagnostics: Diagnostics,
    pub warnings: Vec<IntegrityWarning>,
    pub loaded_at: DateTime<Utc>,
}

impl DashboardSnapshot {
    /// Run the loader and the association index over already-fetched payloads.
    pub fn from_payloads(
        historical: &Value,
        change_points: &Value,
        events: &Value,
        impacts: Option<&Value>,
        diagnostics: Option<&Value>,
        summary: Option<&Value>,
    ) -> Result<Self, AppError> {
        let mut warnings = Vec::new();

        let prices = loader::load_price_series(historical, &mut warnings)?;
        let change_points = loader::load_change_points(change_points, &mut warnings)?;
        let events = loader::load_events(events, &mut warnings)?;
        let impacts = loader::load_impact_records(impacts, &change_points, &mut warnings)?;
        let diagnostics = loader::load_diagnostics(diagnostics, summary, &mut warnings);
        loader::check_summary(summary, &change_points, &events, &mut warnings);

        let associations = AssociationIndex::build(&change_points, &events);

        Ok(Self {
            prices,
            change_points,
            events,
            associations,
            impacts,
            diagnostics,
            warnings,
            loaded_at: Utc::now(),
        })
    }

    pub fn summary(&self) -> Summary {
        metrics::summary(
            &self.prices,
            &self.change_points,
            &self.events,
            &self.associations,
            &self.diagnostics,
            self.loaded_at,
        )
    }
}

async fn fetch(source: &dyn ArtifactSource, artifact: Artifact) -> Result<Option<Value>, AppError> {
    let payload = source.fetch(artifact).await.map_err(|e| {
        let err = AppError::from_source(artifact, e);
        error!("Failed to fetch {}: {}", artifact.name(), err);
        err
    })?;

    if payload.is_none() {
        if artifact.is_required() {
            error!("Required artifact {} is missing", artifact.name());
            return Err(AppError::transport(artifact.name(), "artifact not found"));
        }
        info!("Optional artifact {} not present", artifact.name());
    }
    Ok(payload)
}

async fn fetch_required(source: &dyn ArtifactSource, artifact: Artifact) -> Result<Value, AppError> {
    fetch(source, artifact)
        .await?
        .ok_or_else(|| AppError::transport(artifact.name(), "artifact not found"))
}

/// Fetch every artifact concurrently and build a snapshot once all of them
/// have arrived. Any failure aborts the whole cycle.
pub async fn load_snapshot(source: &dyn ArtifactSource) -> Result<DashboardSnapshot, AppError> {
    info!("Loading analysis artifacts from {}", source.describe());

    let (historical, change_points, events, impacts, diagnostics, summary) = tokio::try_join!(
        fetch_required(source, Artifact::HistoricalData),
        fetch_required(source, Artifact::ChangePoints),
        fetch_required(source, Artifact::Events),
        fetch(source, Artifact::ImpactAnalysis),
        fetch(source, Artifact::ModelDiagnostics),
        fetch(source, Artifact::Summary),
    )?;

    let snapshot = DashboardSnapshot::from_payloads(
        &historical,
        &change_points,
        &events,
        impacts.as_ref(),
        diagnostics.as_ref(),
        summary.as_ref(),
    )
    .map_err(|e| {
        error!("Failed to normalize artifacts: {}", e);
        e
    })?;

    info!(
        "Loaded {} prices, {} change points, {} events, {} associations, {} impact records ({} integrity warnings)",
        snapshot.prices.len(),
        snapshot.change_points.len(),
        snapshot.events.len(),
        snapshot.associations.len(),
        snapshot.impacts.len(),
        snapshot.warnings.len()
    );

    Ok(snapshot)
}

#[derive(Default)]
struct StoreState {
    current: Option<Arc<DashboardSnapshot>>,
    last_error: Option<String>,
}

/// Holds the latest successful snapshot. Readers get a whole `Arc` and never
/// observe a partially replaced snapshot.
#[derive(Clone, Default)]
pub struct SnapshotStore {
    state: Arc<RwLock<StoreState>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Result<Arc<DashboardSnapshot>, AppError> {
        let state = self.state.read();
        match (&state.current, &state.last_error) {
            (Some(snapshot), _) => Ok(Arc::clone(snapshot)),
            (None, Some(err)) => Err(AppError::NotLoaded(err.clone())),
            (None, None) => Err(AppError::NotLoaded(
                "no load cycle has completed".to_string(),
            )),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state.read().current.is_some()
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.read().last_error.clone()
    }

    pub fn replace(&self, snapshot: DashboardSnapshot) -> Arc<DashboardSnapshot> {
        let snapshot = Arc::new(snapshot);
        let mut state = self.state.write();
        state.current = Some(Arc::clone(&snapshot));
        state.last_error = None;
        snapshot
    }

    /// A failed cycle keeps the previous snapshot in place.
    pub fn record_failure(&self, err: &AppError) {
        self.state.write().last_error = Some(err.to_string());
    }
}

/// Run a load cycle and swap the result in. No retry: the caller decides
/// whether to reload again.
pub async fn reload(
    source: &dyn ArtifactSource,
    store: &SnapshotStore,
) -> Result<Arc<DashboardSnapshot>, AppError> {
    match load_snapshot(source).await {
        Ok(snapshot) => Ok(store.replace(snapshot)),
        Err(e) => {
            store.record_failure(&e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;

    use crate::external::artifact_source::ArtifactSourceError;

    struct StaticSource {
        artifacts: HashMap<Artifact, Value>,
        failing: Option<Artifact>,
    }

    #[async_trait]
    impl ArtifactSource for StaticSource {
        async fn fetch(&self, artifact: Artifact) -> Result<Option<Value>, ArtifactSourceError> {
            if self.failing == Some(artifact) {
                return Err(ArtifactSourceError::Network("connection refused".into()));
            }
            Ok(self.artifacts.get(&artifact).cloned())
        }

        fn describe(&self) -> String {
            "static".to_string()
        }
    }

    fn source() -> StaticSource {
        let mut artifacts = HashMap::new();
        artifacts.insert(
            Artifact::HistoricalData,
            json!({"dates": ["2020-02-28", "2020-03-01"], "prices": [50.5, 45.2]}),
        );
        artifacts.insert(
            Artifact::ChangePoints,
            json!([{"date": "2020-03-01", "probability": 0.85}]),
        );
        artifacts.insert(
            Artifact::Events,
            json!([{"id": 1, "date": "2020-03-01", "name": "OPEC+ talks collapse", "type": "Geopolitical"}]),
        );
        StaticSource {
            artifacts,
            failing: None,
        }
    }

    #[tokio::test]
    async fn test_load_snapshot_builds_associations() {
        let snapshot = load_snapshot(&source()).await.unwrap();
        assert_eq!(snapshot.prices.len(), 2);
        assert_eq!(snapshot.associations.len(), 1);
        assert!(snapshot.impacts.is_empty());
        assert!(snapshot.diagnostics.is_empty());
        assert_eq!(snapshot.summary().associated_events, 1);
    }

    #[tokio::test]
    async fn test_missing_required_artifact_aborts() {
        let mut src = source();
        src.artifacts.remove(&Artifact::Events);
        let err = load_snapshot(&src).await.unwrap_err();
        assert!(matches!(err, AppError::TransportFailure { .. }));
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_previous_snapshot() {
        let store = SnapshotStore::new();
        assert!(store.current().is_err());

        let first = reload(&source(), &store).await.unwrap();
        assert!(store.is_ready());

        let mut broken = source();
        broken.failing = Some(Artifact::ChangePoints);
        let err = reload(&broken, &store).await.unwrap_err();
        assert!(err.is_load_failure());

        let current = store.current().unwrap();
        assert!(Arc::ptr_eq(&first, &current));
        assert!(store.last_error().unwrap().contains("change_points"));
    }

    #[tokio::test]
    async fn test_malformed_payload_aborts_cycle() {
        let mut src = source();
        src.artifacts.insert(
            Artifact::HistoricalData,
            json!({"dates": ["2020-02-28"], "prices": []}),
        );
        let store = SnapshotStore::new();
        let err = reload(&src, &store).await.unwrap_err();
        assert!(matches!(err, AppError::MalformedPayload { .. }));
        assert!(matches!(store.current(), Err(AppError::NotLoaded(_))));
    }

    #[tokio::test]
    async fn test_warnings_recorded_once_per_problem() {
        let mut src = source();
        src.artifacts.insert(
            Artifact::ChangePoints,
            json!([{"date": "2020-03-01", "probability": 1.4}]),
        );
        src.artifacts.insert(
            Artifact::ModelDiagnostics,
            json!({"r_hat_max": "1.3", "ess_bulk_min": 900}),
        );
        let store = SnapshotStore::new();
        let snapshot = reload(&src, &store).await.unwrap();

        assert_eq!(snapshot.warnings.len(), 2);
        assert_eq!(snapshot.diagnostics.r_hat, None);
        assert_eq!(snapshot.diagnostics.effective_sample_size, Some(900.0));
        assert_eq!(store.current().unwrap().warnings, snapshot.warnings);
    }
}
