//! Probe orchestrator.
//!
//! Owns every probe built from configuration and runs one scheduling task per
//! probe. Each schedule checks its probe once immediately and then every
//! `interval()` seconds, dispatching each check as its own task so a slow or
//! hung endpoint never delays any other tick. Healthy results are handed to
//! the [`Notifier`].
//!
//! All schedules share a single [`CancellationToken`]; [`Orchestrator::stop`]
//! cancels it and waits for every schedule to exit. Checks already in flight
//! finish (or hit their deadline) in the background.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span};
use uuid::Uuid;

use crate::config::{ProbeSpec, CHECK_DEADLINE_SECS};
use crate::notifier::Notifier;
use crate::probe::{Probe, ProbeRegistry, RegistryError};

/// Lifecycle of an [`Orchestrator`]. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    Created,
    Initialized,
    Running,
    Stopped,
}

impl fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrchestratorState::Created => write!(f, "created"),
            OrchestratorState::Initialized => write!(f, "initialized"),
            OrchestratorState::Running => write!(f, "running"),
            OrchestratorState::Stopped => write!(f, "stopped"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("failed to create probe {kind}: {source}")]
    Build {
        kind: String,
        #[source]
        source: RegistryError,
    },

    #[error("cannot {operation} an orchestrator that is {state}")]
    InvalidState {
        operation: &'static str,
        state: OrchestratorState,
    },
}

#[derive(Debug)]
pub struct Orchestrator {
    registry: ProbeRegistry,
    notifier: Notifier,
    check_deadline: Duration,
    state: OrchestratorState,
    probes: Vec<Arc<dyn Probe>>,
    schedules: Vec<JoinHandle<()>>,
    shutdown: CancellationToken,
}

impl Orchestrator {
    pub fn new(registry: ProbeRegistry, notifier: Notifier) -> Self {
        Self {
            registry,
            notifier,
            check_deadline: Duration::from_secs(CHECK_DEADLINE_SECS),
            state: OrchestratorState::Created,
            probes: Vec::new(),
            schedules: Vec::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Override the per-check deadline (default 30 seconds).
    pub fn with_check_deadline(mut self, deadline: Duration) -> Self {
        self.check_deadline = deadline;
        self
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    pub fn probe_count(&self) -> usize {
        self.probes.len()
    }

    /// Number of scheduling tasks that have not exited yet
    pub fn running_schedules(&self) -> usize {
        self.schedules.iter().filter(|h| !h.is_finished()).count()
    }

    /// Build one probe per spec.
    ///
    /// Either every probe is built or none is kept: the first failure is
    /// returned and the orchestrator stays in `Created`.
    pub fn initialize(&mut self, specs: &[ProbeSpec]) -> Result<(), OrchestratorError> {
        self.expect_state(OrchestratorState::Created, "initialize")?;

        tracing::info!("Initializing healthcheck orchestrator");

        let mut probes: Vec<Arc<dyn Probe>> = Vec::with_capacity(specs.len());
        for spec in specs {
            let probe = self
                .registry
                .build(spec)
                .map_err(|source| OrchestratorError::Build {
                    kind: spec.kind.clone(),
                    source,
                })?;

            tracing::info!(
                kind = probe.kind(),
                scrape_url = %spec.scrape_target,
                ping_url = %spec.notify_target,
                interval_secs = probe.interval(),
                "Created probe"
            );

            probes.push(Arc::from(probe));
        }

        self.probes = probes;
        self.state = OrchestratorState::Initialized;

        tracing::info!(
            probe_count = self.probes.len(),
            "Healthcheck orchestrator initialized"
        );
        Ok(())
    }

    /// Spawn one scheduling task per probe. Must be called inside a tokio runtime.
    pub fn start(&mut self) -> Result<(), OrchestratorError> {
        self.expect_state(OrchestratorState::Initialized, "start")?;

        tracing::info!("Starting healthcheck orchestrator");

        for probe in &self.probes {
            let handle = tokio::spawn(run_schedule(
                Arc::clone(probe),
                self.notifier.clone(),
                self.check_deadline,
                self.shutdown.clone(),
            ));
            self.schedules.push(handle);
        }

        self.state = OrchestratorState::Running;
        tracing::info!(
            schedules = self.schedules.len(),
            "Healthcheck orchestrator started"
        );
        Ok(())
    }

    /// Signal every schedule to end and wait until all of them have exited.
    ///
    /// Calling this again after it returned is a no-op.
    pub async fn stop(&mut self) {
        match self.state {
            OrchestratorState::Stopped => {
                tracing::debug!("Healthcheck orchestrator already stopped");
                return;
            }
            OrchestratorState::Created | OrchestratorState::Initialized => {
                self.state = OrchestratorState::Stopped;
                return;
            }
            OrchestratorState::Running => {}
        }

        tracing::info!("Stopping healthcheck orchestrator");
        self.shutdown.cancel();

        let results = futures::future::join_all(self.schedules.iter_mut()).await;
        for result in results {
            if let Err(e) = result {
                tracing::error!(error = %e, "Probe schedule terminated abnormally");
            }
        }

        self.state = OrchestratorState::Stopped;
        tracing::info!("Healthcheck orchestrator stopped");
    }

    fn expect_state(
        &self,
        expected: OrchestratorState,
        operation: &'static str,
    ) -> Result<(), OrchestratorError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(OrchestratorError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        // Schedules must not outlive their owner
        self.shutdown.cancel();
    }
}

/// Tick loop for a single probe: check now, then once per interval.
async fn run_schedule(
    probe: Arc<dyn Probe>,
    notifier: Notifier,
    deadline: Duration,
    shutdown: CancellationToken,
) {
    let period = Duration::from_secs(probe.interval().max(1));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::debug!(
        kind = probe.kind(),
        interval_secs = period.as_secs(),
        "Probe schedule starting"
    );

    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                tracing::debug!(kind = probe.kind(), "Probe schedule shutting down");
                break;
            }
            _ = ticker.tick() => {
                tokio::spawn(run_check(Arc::clone(&probe), notifier.clone(), deadline));
            }
        }
    }
}

/// One bounded check; healthy results trigger a fire-and-forget notification.
async fn run_check(probe: Arc<dyn Probe>, notifier: Notifier, deadline: Duration) {
    let span = tracing::info_span!(
        "probe.check",
        check_id = %Uuid::new_v4(),
        kind = probe.kind(),
        duration_ms = tracing::field::Empty,
    );

    async move {
        let start = Instant::now();
        let outcome = tokio::time::timeout(deadline, probe.check(deadline)).await;
        Span::current().record("duration_ms", start.elapsed().as_millis() as u64);

        match outcome {
            Ok(Ok(result)) => {
                tracing::info!(
                    scraper_type = probe.kind(),
                    healthy = result.healthy,
                    message = %result.message,
                    timestamp = %result.timestamp,
                    details = ?result.details,
                    "Healthcheck completed"
                );

                if result.healthy {
                    notifier.dispatch(probe.notify_target());
                }
            }
            Ok(Err(e)) => {
                tracing::error!(
                    scraper_type = probe.kind(),
                    error = %e,
                    "Healthcheck failed with error"
                );
            }
            Err(_) => {
                tracing::error!(
                    scraper_type = probe.kind(),
                    deadline_ms = deadline.as_millis() as u64,
                    "Healthcheck exceeded its deadline"
                );
            }
        }
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::probe::CLOUDFLARED_TUNNEL_KIND;
    use crate::test_support::{stub_registry, stub_spec, CheckLog};

    fn orchestrator(log: &CheckLog) -> Orchestrator {
        Orchestrator::new(stub_registry(log), Notifier::new().unwrap())
    }

    fn cloudflared_spec() -> ProbeSpec {
        ProbeSpec {
            kind: CLOUDFLARED_TUNNEL_KIND.to_string(),
            scrape_target: "http://localhost:8080/ready".to_string(),
            notify_target: "http://localhost:8081/ping".to_string(),
            interval_seconds: 120,
        }
    }

    #[test]
    fn test_new_orchestrator_is_created_and_empty() {
        let orch = orchestrator(&CheckLog::default());
        assert_eq!(orch.state(), OrchestratorState::Created);
        assert_eq!(orch.probe_count(), 0);
        assert_eq!(orch.running_schedules(), 0);
    }

    #[test]
    fn test_initialize_builds_every_probe() {
        let mut orch = orchestrator(&CheckLog::default());

        orch.initialize(&[cloudflared_spec(), stub_spec("healthy://a", 5)])
            .unwrap();

        assert_eq!(orch.state(), OrchestratorState::Initialized);
        assert_eq!(orch.probe_count(), 2);
    }

    #[test]
    fn test_initialize_unknown_kind_commits_nothing() {
        let mut orch = orchestrator(&CheckLog::default());
        let mut bad = cloudflared_spec();
        bad.kind = "unknown-scraper-type".to_string();

        let err = orch
            .initialize(&[cloudflared_spec(), bad])
            .unwrap_err();

        assert!(err
            .to_string()
            .contains("unknown probe kind: unknown-scraper-type"));
        assert_eq!(orch.state(), OrchestratorState::Created);
        assert_eq!(orch.probe_count(), 0);
    }

    #[test]
    fn test_initialize_twice_is_rejected() {
        let mut orch = orchestrator(&CheckLog::default());
        orch.initialize(&[]).unwrap();

        let err = orch.initialize(&[]).unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::InvalidState {
                operation: "initialize",
                state: OrchestratorState::Initialized
            }
        ));
    }

    #[tokio::test]
    async fn test_start_before_initialize_is_rejected() {
        let mut orch = orchestrator(&CheckLog::default());
        assert!(orch.start().is_err());
        assert_eq!(orch.state(), OrchestratorState::Created);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_check_runs_immediately() {
        let log = CheckLog::default();
        let mut orch = orchestrator(&log);
        orch.initialize(&[stub_spec("healthy://a", 60)]).unwrap();

        orch.start().unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(log.count("healthy://a"), 1);
        orch.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedules_are_independent_per_interval() {
        let log = CheckLog::default();
        let mut orch = orchestrator(&log);
        orch.initialize(&[stub_spec("healthy://fast", 1), stub_spec("unhealthy://slow", 100)])
            .unwrap();

        orch.start().unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert!(log.count("healthy://fast") >= 2);
        assert_eq!(log.count("unhealthy://slow"), 1);
        orch.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_check_does_not_delay_other_schedules() {
        let log = CheckLog::default();
        let mut orch = orchestrator(&log).with_check_deadline(Duration::from_secs(2));
        orch.initialize(&[stub_spec("hang://stuck", 1), stub_spec("healthy://fast", 1)])
            .unwrap();

        orch.start().unwrap();
        tokio::time::sleep(Duration::from_millis(3500)).await;

        // Hung checks keep being dispatched on their own schedule too
        assert!(log.count("hang://stuck") >= 3);
        assert!(log.count("healthy://fast") >= 3);

        let stopped = tokio::time::timeout(Duration::from_secs(1), orch.stop()).await;
        assert!(stopped.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_errors_do_not_end_the_schedule() {
        let log = CheckLog::default();
        let mut orch = orchestrator(&log);
        orch.initialize(&[stub_spec("error://broken", 1)]).unwrap();

        orch.start().unwrap();
        tokio::time::sleep(Duration::from_millis(2500)).await;

        assert!(log.count("error://broken") >= 3);
        assert_eq!(orch.running_schedules(), 1);
        orch.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_joins_every_schedule() {
        let log = CheckLog::default();
        let mut orch = orchestrator(&log);
        orch.initialize(&[
            stub_spec("healthy://a", 1),
            stub_spec("unhealthy://b", 2),
            stub_spec("hang://c", 3),
        ])
        .unwrap();

        orch.start().unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(orch.running_schedules(), 3);

        orch.stop().await;

        assert_eq!(orch.state(), OrchestratorState::Stopped);
        assert_eq!(orch.running_schedules(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_ticks_after_stop() {
        let log = CheckLog::default();
        let mut orch = orchestrator(&log);
        orch.initialize(&[stub_spec("healthy://a", 1)]).unwrap();

        orch.start().unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        orch.stop().await;
        let after_stop = log.count("healthy://a");

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(log.count("healthy://a"), after_stop);
    }

    #[tokio::test]
    async fn test_stop_twice_is_a_noop() {
        let mut orch = orchestrator(&CheckLog::default());
        orch.initialize(&[]).unwrap();
        orch.start().unwrap();

        orch.stop().await;
        orch.stop().await;

        assert_eq!(orch.state(), OrchestratorState::Stopped);
        assert!(orch.start().is_err());
    }

    #[tokio::test]
    async fn test_stop_before_start_marks_stopped() {
        let mut orch = orchestrator(&CheckLog::default());
        orch.stop().await;
        assert_eq!(orch.state(), OrchestratorState::Stopped);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(OrchestratorState::Running.to_string(), "running");
        let err = OrchestratorError::InvalidState {
            operation: "start",
            state: OrchestratorState::Stopped,
        };
        assert_eq!(err.to_string(), "cannot start an orchestrator that is stopped");
    }
}
