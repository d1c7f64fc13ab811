//! HTTPS reachability probe for ingress hosts.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

/// Default total time budget for one probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Extra time allowed past the client timeout before the probe gives up on its own.
const PROBE_GRACE: Duration = Duration::from_millis(500);

/// Outcome of a single probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reachability {
    /// The host answered with this HTTP status.
    Reachable(u16),
    /// Timeout, DNS, TLS or connection failure.
    Unreachable(String),
}

/// Something that can test whether a host answers HTTP.
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    /// Probe `hostname` once. Never fails; problems come back as `Unreachable`.
    async fn probe(&self, hostname: &str) -> Reachability;
}

/// Probe that issues one HTTPS GET with a bounded timeout.
#[derive(Debug, Clone)]
pub struct HttpsProbe {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpsProbe {
    /// Create a probe with the given total timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built (TLS backend setup).
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self { client, timeout })
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Probe a fully formed URL. [`ReachabilityProbe::probe`] always calls
    /// this with an `https://` URL.
    pub async fn probe_url(&self, url: &str) -> Reachability {
        debug!(url, timeout_ms = self.timeout.as_millis(), "Probing endpoint");

        let request = self.client.get(url).send();
        match tokio::time::timeout(self.timeout + PROBE_GRACE, request).await {
            Ok(Ok(response)) => Reachability::Reachable(response.status().as_u16()),
            Ok(Err(err)) => {
                let reason = if err.is_timeout() {
                    format!("timed out after {}s", self.timeout.as_secs_f32())
                } else if err.is_connect() {
                    "connection failed (DNS/network)".to_string()
                } else {
                    err.to_string()
                };
                Reachability::Unreachable(reason)
            }
            Err(_) => Reachability::Unreachable(format!(
                "timed out after {}s",
                self.timeout.as_secs_f32()
            )),
        }
    }
}

#[async_trait]
impl ReachabilityProbe for HttpsProbe {
    async fn probe(&self, hostname: &str) -> Reachability {
        self.probe_url(&format!("https://{hostname}")).await
    }
}
