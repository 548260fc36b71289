use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Request spans from `TraceLayer` are logged at debug.
const DEFAULT_LOG_LEVEL: &str = "info,tower_http=debug";

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub loki_enabled: bool,
    pub loki_url: Option<String>,
    pub service_name: String,
    pub environment: String,
    pub log_level: String,
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            loki_enabled: lookup("LOKI_ENABLED")
                .and_then(|v| v.trim().to_lowercase().parse().ok())
                .unwrap_or(false),
            loki_url: lookup("LOKI_URL").filter(|v| !v.trim().is_empty()),
            service_name: lookup("SERVICE_NAME")
                .unwrap_or_else(|| "changepoint-dashboard".to_string()),
            environment: lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            log_level: lookup("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        EnvFilter::try_new(&self.log_level)
            .map_err(|e| format!("Invalid RUST_LOG {:?}: {}", self.log_level, e))?;

        if self.loki_enabled {
            let loki_url = self
                .loki_url
                .as_deref()
                .ok_or_else(|| "LOKI_ENABLED is true but LOKI_URL is not set".to_string())?;
            url::Url::parse(loki_url).map_err(|e| format!("Invalid LOKI_URL {}: {}", loki_url, e))?;
        }
        Ok(())
    }

    /// Loki is only used when enabled, configured and compiled in.
    pub fn ships_to_loki(&self) -> bool {
        cfg!(feature = "loki") && self.loki_enabled && self.loki_url.is_some()
    }
}

pub fn init_logging(config: LoggingConfig) -> anyhow::Result<()> {
    config.validate().map_err(anyhow::Error::msg)?;

    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_level)?)
        .with(tracing_subscriber::fmt::layer());

    #[cfg(feature = "loki")]
    let registry = registry.with(loki_layer(&config)?);

    registry.try_init()?;

    if config.ships_to_loki() {
        tracing::info!(
            "Logging initialized for {} ({}), shipping to Loki",
            config.service_name,
            config.environment
        );
    } else {
        tracing::info!(
            "Console logging initialized for {} ({})",
            config.service_name,
            config.environment
        );
    }
    Ok(())
}

/// `None` keeps the subscriber console-only.
#[cfg(feature = "loki")]
fn loki_layer(config: &LoggingConfig) -> anyhow::Result<Option<tracing_loki::Layer>> {
    let Some(loki_url) = config.loki_url.as_deref().filter(|_| config.loki_enabled) else {
        return Ok(None);
    };

    let (layer, task) = tracing_loki::builder()
        .label("service", &config.service_name)?
        .label("environment", &config.environment)?
        .build_url(url::Url::parse(loki_url)?)?;

    // Ships buffered log lines to Loki
    tokio::spawn(task);
    Ok(Some(layer))
}
