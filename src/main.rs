use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use changepoint_dashboard::app;
use changepoint_dashboard::config::{AppConfig, ArtifactSourceKind};
use changepoint_dashboard::external::artifact_source::ArtifactSource;
use changepoint_dashboard::external::file_source::FileArtifactSource;
use changepoint_dashboard::external::http_source::HttpArtifactSource;
use changepoint_dashboard::logging::{self, LoggingConfig};
use changepoint_dashboard::services::snapshot_service;
use changepoint_dashboard::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging FIRST
    logging::init_logging(LoggingConfig::from_env())?;

    let config = AppConfig::from_env();
    config.validate().map_err(anyhow::Error::msg)?;

    let source_kind = config.source_kind().map_err(anyhow::Error::msg)?;
    let source: Arc<dyn ArtifactSource> = match source_kind {
        ArtifactSourceKind::Files => {
            tracing::info!("Using artifact source: files in {}", config.artifact_dir.display());
            Arc::new(FileArtifactSource::new(config.artifact_dir.clone()))
        }
        ArtifactSourceKind::Http => {
            let base_url = config.upstream_base_url().map_err(anyhow::Error::msg)?;
            tracing::info!("Using artifact source: upstream service at {}", base_url);
            Arc::new(
                HttpArtifactSource::new(base_url, config.upstream_timeout())
                    .context("Failed to build upstream HTTP client")?,
            )
        }
    };

    let state = AppState::new(source);

    // The server starts even when the first load fails; /api/reload retries on demand.
    if let Err(e) = snapshot_service::reload(state.source.as_ref(), &state.snapshots).await {
        tracing::error!("Initial load failed, serving without analysis data: {}", e);
    }

    let app = app::create_app(state);

    let addr = config.socket_addr().map_err(anyhow::Error::msg)?;
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Change point dashboard running at http://{}/", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
