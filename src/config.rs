//! Application configuration loaded from environment variables.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::ServiceError;
use crate::store::StatsScope;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Server Configuration ===
    /// Address the HTTP server binds to.
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port.
    #[serde(default = "default_port")]
    pub port: u16,

    // === Health Probe ===
    /// Downstream liveness URL polled by `/healthz`.
    #[serde(default = "default_probe_url")]
    pub probe_url: String,

    /// Upper bound on a single probe request, in milliseconds.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    // === Statistics ===
    /// Whether statistics are store-wide or per sensor.
    #[serde(default)]
    pub stats_scope: StatsScope,

    // === Observability ===
    /// Install the Prometheus recorder and expose `/metrics`.
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_probe_url() -> String {
    "http://localhost:8080/healthz".to_string()
}

fn default_probe_timeout_ms() -> u64 {
    2000
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            probe_url: default_probe_url(),
            probe_timeout_ms: default_probe_timeout_ms(),
            stats_scope: StatsScope::default(),
            metrics_enabled: default_true(),
        }
    }
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), ServiceError> {
        self.bind_addr()?;
        self.parsed_probe_url()?;

        if self.probe_timeout_ms == 0 {
            return Err(ServiceError::InvalidConfig(
                "PROBE_TIMEOUT_MS must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Socket address to listen on.
    pub fn bind_addr(&self) -> Result<SocketAddr, ServiceError> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|_| ServiceError::InvalidConfig(format!("HOST is not an IP address: {}", self.host)))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// Probe URL, checked to be http or https.
    pub fn parsed_probe_url(&self) -> Result<Url, ServiceError> {
        let url = Url::parse(&self.probe_url)?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ServiceError::InvalidConfig(format!(
                "PROBE_URL must use http or https, got {other}"
            ))),
        }
    }

    /// Probe timeout as a duration.
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}
