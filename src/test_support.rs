//! Shared fixtures for unit tests: mock HTTP endpoints and stub probes.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;

use crate::config::ProbeSpec;
use crate::probe::{Probe, ProbeDetails, ProbeError, ProbeRegistry, ProbeResult, RegistryError};

/// Kind under which [`StubProbe`] is registered
pub const STUB_KIND: &str = "stub";

/// Serve `router` on an ephemeral localhost port.
pub async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// URL on a localhost port nothing listens on.
pub async fn closed_port_url(path: &str) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}{}", addr, path)
}

/// Number of checks started, keyed by scrape target
#[derive(Debug, Clone, Default)]
pub struct CheckLog(Arc<Mutex<HashMap<String, usize>>>);

impl CheckLog {
    pub fn count(&self, target: &str) -> usize {
        self.0.lock().unwrap().get(target).copied().unwrap_or(0)
    }

    fn record(&self, target: &str) {
        *self.0.lock().unwrap().entry(target.to_string()).or_default() += 1;
    }
}

/// Probe whose behaviour is chosen by the scheme of its scrape target:
/// `healthy://`, `unhealthy://`, `error://` or `hang://`.
#[derive(Debug)]
pub struct StubProbe {
    target: String,
    notify_target: String,
    interval: u64,
    log: CheckLog,
}

#[async_trait]
impl Probe for StubProbe {
    fn kind(&self) -> &str {
        STUB_KIND
    }

    fn notify_target(&self) -> &str {
        &self.notify_target
    }

    fn interval(&self) -> u64 {
        self.interval
    }

    async fn check(&self, _deadline: Duration) -> Result<ProbeResult, ProbeError> {
        self.log.record(&self.target);

        if self.target.starts_with("healthy://") {
            Ok(ProbeResult::healthy("stub healthy", ProbeDetails::new()))
        } else if self.target.starts_with("error://") {
            Err(ProbeError::InvalidTarget {
                target: self.target.clone(),
                reason: "stub error".to_string(),
            })
        } else if self.target.starts_with("hang://") {
            std::future::pending().await
        } else {
            Ok(ProbeResult::unhealthy("stub unhealthy", ProbeDetails::new()))
        }
    }
}

/// Default registry plus the stub kind, recording checks into `log`.
pub fn stub_registry(log: &CheckLog) -> ProbeRegistry {
    let log = log.clone();
    let mut registry = ProbeRegistry::default();
    registry.register(
        STUB_KIND,
        Arc::new(
            move |spec: &ProbeSpec| -> Result<Box<dyn Probe>, RegistryError> {
                Ok(Box::new(StubProbe {
                    target: spec.scrape_target.clone(),
                    notify_target: spec.notify_target.clone(),
                    interval: spec.effective_interval(),
                    log: log.clone(),
                }))
            },
        ),
    );
    registry
}

pub fn stub_spec(target: &str, interval_seconds: i64) -> ProbeSpec {
    ProbeSpec {
        kind: STUB_KIND.to_string(),
        scrape_target: target.to_string(),
        notify_target: String::new(),
        interval_seconds,
    }
}
