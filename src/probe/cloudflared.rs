//! Readiness probe for cloudflared tunnel connectors.
//!
//! Scrapes the connector's `/ready` endpoint, which answers with
//! `{"status":200,"readyConnections":4,"connectorId":"..."}`. The tunnel counts
//! as healthy when both the HTTP status and the embedded status are 200 and at
//! least one connection is ready.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use url::{ParseError, Url};

use crate::config::{ProbeSpec, HTTP_CLIENT_TIMEOUT_SECS};

use super::{Probe, ProbeDetails, ProbeError, ProbeResult};

/// Kind string under which this probe is registered
pub const CLOUDFLARED_TUNNEL_KIND: &str = "cloudflared-tunnel-connector";

/// Body returned by the connector's readiness endpoint.
///
/// Missing fields decode as zero/empty, which evaluates as unhealthy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReadyResponse {
    pub status: i64,
    pub ready_connections: i64,
    pub connector_id: String,
}

impl ReadyResponse {
    fn is_healthy(&self) -> bool {
        self.status == 200 && self.ready_connections > 0
    }
}

#[derive(Debug)]
pub struct CloudflaredTunnelProbe {
    kind: String,
    scrape_target: String,
    notify_target: String,
    interval: u64,
    client: reqwest::Client,
}

impl CloudflaredTunnelProbe {
    /// Create a probe for `spec` with the standard client timeout.
    pub fn new(spec: &ProbeSpec) -> Result<Self, reqwest::Error> {
        Self::with_client_timeout(spec, Duration::from_secs(HTTP_CLIENT_TIMEOUT_SECS))
    }

    /// Create a probe whose HTTP client gives up after `timeout`.
    pub fn with_client_timeout(spec: &ProbeSpec, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            kind: spec.kind.clone(),
            scrape_target: spec.scrape_target.clone(),
            notify_target: spec.notify_target.clone(),
            interval: spec.effective_interval(),
            client,
        })
    }

    pub fn scrape_target(&self) -> &str {
        &self.scrape_target
    }

    /// Only a target with no scheme at all is rejected. Anything that looks
    /// like an absolute URL but cannot be requested (bad port, non-http scheme)
    /// is an unreachable endpoint and ends up in [`connect_failure`](Self::connect_failure).
    fn parse_target(&self) -> Result<Result<Url, String>, ProbeError> {
        match Url::parse(&self.scrape_target) {
            Ok(url) => Ok(Ok(url)),
            Err(ParseError::RelativeUrlWithoutBase) => Err(ProbeError::InvalidTarget {
                target: self.scrape_target.clone(),
                reason: ParseError::RelativeUrlWithoutBase.to_string(),
            }),
            Err(e) => Ok(Err(e.to_string())),
        }
    }

    async fn scrape(&self, url: Url) -> ProbeResult {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => return self.connect_failure(&e.to_string()),
        };

        let status = response.status();
        if status != StatusCode::OK {
            let mut details = ProbeDetails::new();
            details.insert("status_code".to_string(), status.as_u16().into());
            return ProbeResult::unhealthy(
                format!("HTTP status {} from {}", status.as_u16(), self.scrape_target),
                details,
            );
        }

        let parsed = match response.bytes().await {
            Ok(body) => serde_json::from_slice::<ReadyResponse>(&body).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match parsed {
            Ok(ready) => self.evaluate(&ready),
            Err(error) => ProbeResult::unhealthy(
                format!("Failed to parse response from {}: {}", self.scrape_target, error),
                error_details(&error),
            ),
        }
    }

    fn evaluate(&self, ready: &ReadyResponse) -> ProbeResult {
        let healthy = ready.is_healthy();

        tracing::info!(
            status = ready.status,
            ready_connections = ready.ready_connections,
            connector_id = %ready.connector_id,
            healthy,
            "Cloudflared tunnel healthcheck completed"
        );

        let mut details = ProbeDetails::new();
        details.insert("status".to_string(), ready.status.into());
        details.insert("readyConnections".to_string(), ready.ready_connections.into());
        details.insert("connectorId".to_string(), ready.connector_id.clone().into());

        if healthy {
            ProbeResult::healthy(
                format!(
                    "Tunnel healthy with {} ready connections",
                    ready.ready_connections
                ),
                details,
            )
        } else {
            ProbeResult::unhealthy(
                format!(
                    "Tunnel unhealthy: status={}, readyConnections={}",
                    ready.status, ready.ready_connections
                ),
                details,
            )
        }
    }

    fn connect_failure(&self, error: &str) -> ProbeResult {
        ProbeResult::unhealthy(
            format!("Failed to connect to {}: {}", self.scrape_target, error),
            error_details(error),
        )
    }
}

fn error_details(error: &str) -> ProbeDetails {
    let mut details = ProbeDetails::new();
    details.insert("error".to_string(), error.into());
    details
}

#[async_trait]
impl Probe for CloudflaredTunnelProbe {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn notify_target(&self) -> &str {
        &self.notify_target
    }

    fn interval(&self) -> u64 {
        self.interval
    }

    async fn check(&self, deadline: Duration) -> Result<ProbeResult, ProbeError> {
        tracing::debug!(url = %self.scrape_target, "Starting cloudflared tunnel healthcheck");

        let url = match self.parse_target()? {
            Ok(url) => url,
            Err(error) => return Ok(self.connect_failure(&error)),
        };

        match tokio::time::timeout(deadline, self.scrape(url)).await {
            Ok(result) => Ok(result),
            Err(_) => Ok(self.connect_failure(&format!("deadline of {:?} exceeded", deadline))),
        }
    }
}
