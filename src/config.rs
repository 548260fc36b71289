use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

/// Where analysis artifacts are loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactSourceKind {
    Files,
    Http,
}

impl ArtifactSourceKind {
    pub fn from_string(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "files" | "file" => Some(ArtifactSourceKind::Files),
            "http" => Some(ArtifactSourceKind::Http),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactSourceKind::Files => "files",
            ArtifactSourceKind::Http => "http",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Raw `ARTIFACT_SOURCE` value; checked by `validate`.
    pub artifact_source: String,
    pub artifact_dir: PathBuf,
    pub upstream_url: Option<String>,
    pub upstream_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            host: lookup("DASHBOARD_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: lookup("DASHBOARD_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(5000),
            artifact_source: lookup("ARTIFACT_SOURCE").unwrap_or_else(|| "files".to_string()),
            artifact_dir: lookup("ARTIFACT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./data/results")),
            upstream_url: lookup("UPSTREAM_URL").filter(|v| !v.trim().is_empty()),
            upstream_timeout_secs: lookup("UPSTREAM_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        let kind = self.source_kind()?;
        self.socket_addr()?;

        if kind == ArtifactSourceKind::Http {
            self.upstream_base_url()?;
        }
        if self.upstream_timeout_secs == 0 {
            return Err("UPSTREAM_TIMEOUT_SECS must be greater than 0".to_string());
        }
        Ok(())
    }

    pub fn source_kind(&self) -> Result<ArtifactSourceKind, String> {
        ArtifactSourceKind::from_string(&self.artifact_source).ok_or_else(|| {
            format!(
                "Invalid ARTIFACT_SOURCE: {}. Must be 'files' or 'http'",
                self.artifact_source
            )
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|_| format!("Invalid DASHBOARD_HOST: {}", self.host))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn upstream_base_url(&self) -> Result<Url, String> {
        let raw = self
            .upstream_url
            .as_deref()
            .ok_or_else(|| "ARTIFACT_SOURCE is http but UPSTREAM_URL is not set".to_string())?;
        Url::parse(raw).map_err(|e| format!("Invalid UPSTREAM_URL {}: {}", raw, e))
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]);
        assert!(config.validate().is_ok());
        assert_eq!(config.source_kind().unwrap(), ArtifactSourceKind::Files);
        assert_eq!(config.socket_addr().unwrap().to_string(), "0.0.0.0:5000");
        assert_eq!(config.artifact_dir, PathBuf::from("./data/results"));
        assert_eq!(config.upstream_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_http_source_requires_upstream_url() {
        let missing = config(&[("ARTIFACT_SOURCE", "http")]);
        assert!(missing.validate().unwrap_err().contains("UPSTREAM_URL"));

        let ok = config(&[
            ("ARTIFACT_SOURCE", "HTTP"),
            ("UPSTREAM_URL", "http://localhost:5000"),
        ]);
        assert!(ok.validate().is_ok());
        assert_eq!(ok.source_kind().unwrap(), ArtifactSourceKind::Http);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(config(&[("ARTIFACT_SOURCE", "s3")]).validate().is_err());
        assert!(config(&[("DASHBOARD_HOST", "not-an-ip")]).validate().is_err());
        assert!(config(&[("UPSTREAM_TIMEOUT_SECS", "0")]).validate().is_err());
        assert!(config(&[("ARTIFACT_SOURCE", "http"), ("UPSTREAM_URL", "::nope")])
            .validate()
            .is_err());
    }

    #[test]
    fn test_unparseable_port_falls_back() {
        assert_eq!(config(&[("DASHBOARD_PORT", "abc")]).port, 5000);
        assert_eq!(config(&[("DASHBOARD_PORT", "8080")]).port, 8080);
    }
}
