//! Probe capability and the result types shared by every probe kind.
//!
//! A probe performs one health check against an external endpoint and reports
//! a [`ProbeResult`]. Ordinary failures (connection refused, timeouts, bad
//! status codes, malformed payloads) are encoded in the result as
//! `healthy == false`; only request construction problems surface as
//! [`ProbeError`].
//!
//! Key re-exports:
//! - [`CloudflaredTunnelProbe`] - readiness probe for cloudflared tunnel connectors
//! - [`ProbeRegistry`] - builds probes from [`ProbeSpec`](crate::config::ProbeSpec)s

mod cloudflared;
mod registry;

pub use cloudflared::{CloudflaredTunnelProbe, ReadyResponse, CLOUDFLARED_TUNNEL_KIND};
pub use registry::{ProbeConstructor, ProbeRegistry, RegistryError};

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Scalar details attached to a result, keyed by field name
pub type ProbeDetails = BTreeMap<String, serde_json::Value>;

/// Outcome of a single probe check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeResult {
    pub healthy: bool,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub details: ProbeDetails,
}

impl ProbeResult {
    /// A healthy result stamped with the current time
    pub fn healthy(message: impl Into<String>, details: ProbeDetails) -> Self {
        Self {
            healthy: true,
            message: message.into(),
            timestamp: Utc::now(),
            details,
        }
    }

    /// An unhealthy result stamped with the current time
    pub fn unhealthy(message: impl Into<String>, details: ProbeDetails) -> Self {
        Self {
            healthy: false,
            message: message.into(),
            timestamp: Utc::now(),
            details,
        }
    }
}

/// Hard failure of a check, raised only when the request itself cannot be built.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    #[error("invalid target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },
}

/// One health-check capability bound to a single spec.
///
/// Implementations own their HTTP client and are never mutated after
/// construction, so `check` may run concurrently with itself.
#[async_trait]
pub trait Probe: Send + Sync + fmt::Debug {
    /// Stable identifier matching the configured kind
    fn kind(&self) -> &str;

    /// URL to ping after a healthy check; empty means no notification
    fn notify_target(&self) -> &str;

    /// Seconds between checks, always greater than zero
    fn interval(&self) -> u64;

    /// Perform one check, finishing within `deadline`.
    async fn check(&self, deadline: Duration) -> Result<ProbeResult, ProbeError>;
}
