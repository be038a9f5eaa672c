//! Downstream liveness probe.
//!
//! `/healthz` does not judge readiness itself; it asks a configured URL and
//! translates the answer. The only ready signal is `204 No Content`. Anything
//! else, including a request that runs past the timeout, is a failure.

use std::time::Duration;

use reqwest::StatusCode;
use strum::IntoStaticStr;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::Config;
use crate::error::ServiceError;

/// Why a probe did not report ready.
#[derive(Error, Debug, Clone, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ProbeFailure {
    /// No response within the configured timeout.
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),

    /// Connection or transport error.
    #[error("probe request failed: {0}")]
    Unreachable(String),

    /// Downstream answered with something other than 204.
    #[error("probe returned status {0}, expected 204")]
    UnexpectedStatus(u16),
}

impl ProbeFailure {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        self.into()
    }
}

/// Result of a single probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Downstream reported ready.
    Ready,
    /// Downstream is not ready, or could not be asked.
    Failed(ProbeFailure),
}

/// HTTP client bound to one liveness URL.
#[derive(Debug, Clone)]
pub struct HealthProbe {
    /// HTTP client with the probe timeout applied.
    http: reqwest::Client,
    /// URL to GET.
    url: Url,
    /// Request timeout.
    timeout: Duration,
}

impl HealthProbe {
    /// Create a probe for `url` with a bounded request timeout.
    pub fn new(url: Url, timeout: Duration) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        Ok(Self { http, url, timeout })
    }

    /// Create a probe from application config.
    pub fn from_config(config: &Config) -> Result<Self, ServiceError> {
        Self::new(config.parsed_probe_url()?, config.probe_timeout())
    }

    /// URL being probed.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Timeout applied to each probe.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run the probe once.
    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn check(&self) -> ProbeOutcome {
        let request = self.http.get(self.url.clone()).send();

        let outcome = match tokio::time::timeout(self.timeout, request).await {
            Err(_) => ProbeOutcome::Failed(ProbeFailure::Timeout(self.timeout)),
            Ok(Err(e)) if e.is_timeout() => ProbeOutcome::Failed(ProbeFailure::Timeout(self.timeout)),
            Ok(Err(e)) => ProbeOutcome::Failed(ProbeFailure::Unreachable(e.to_string())),
            Ok(Ok(response)) if response.status() == StatusCode::NO_CONTENT => ProbeOutcome::Ready,
            Ok(Ok(response)) => {
                ProbeOutcome::Failed(ProbeFailure::UnexpectedStatus(response.status().as_u16()))
            }
        };

        match &outcome {
            ProbeOutcome::Ready => debug!("Probe reported ready"),
            ProbeOutcome::Failed(reason) => warn!(reason = %reason, "Probe failed"),
        }

        outcome
    }
}
