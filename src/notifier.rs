//! Success notifier.
//!
//! Pings a monitoring URL after a healthy check. Best effort: one GET with a
//! bounded timeout, the outcome is logged and never retried.

use std::time::Duration;

use reqwest::StatusCode;
use tokio::task::JoinHandle;

use crate::config::NOTIFY_TIMEOUT_SECS;

/// What happened to a single notification attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// No target configured
    Skipped,
    /// The target answered (any status)
    Delivered(StatusCode),
    /// The request could not be built or sent
    Failed(String),
}

/// Sends success pings. Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct Notifier {
    client: reqwest::Client,
}

impl Notifier {
    /// Create a notifier with the standard timeout.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_timeout(Duration::from_secs(NOTIFY_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Ping `target` once. An empty target is a no-op.
    pub async fn notify(&self, target: &str) -> NotifyOutcome {
        if target.is_empty() {
            return NotifyOutcome::Skipped;
        }

        let request = match self.client.get(target).build() {
            Ok(request) => request,
            Err(e) => {
                tracing::error!(url = %target, error = %e, "Failed to create ping request");
                return NotifyOutcome::Failed(e.to_string());
            }
        };

        match self.client.execute(request).await {
            Ok(response) => {
                let status = response.status();
                tracing::info!(
                    url = %target,
                    status_code = status.as_u16(),
                    "Successfully pinged success URL"
                );
                NotifyOutcome::Delivered(status)
            }
            Err(e) => {
                tracing::error!(url = %target, error = %e, "Failed to ping success URL");
                NotifyOutcome::Failed(e.to_string())
            }
        }
    }

    /// Fire-and-forget variant of [`notify`](Self::notify).
    ///
    /// The returned handle may be dropped; the ping still runs to completion.
    pub fn dispatch(&self, target: &str) -> JoinHandle<NotifyOutcome> {
        let notifier = self.clone();
        let target = target.to_string();
        tokio::spawn(async move { notifier.notify(&target).await })
    }
}
