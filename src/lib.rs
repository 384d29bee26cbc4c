//! healthcheck - periodic endpoint probes with success pings
//!
//! Runs a set of independently scheduled health probes (for example the
//! readiness endpoint of a cloudflared tunnel connector) and pings a
//! monitoring URL each time a probe reports healthy.
//!
//! ```text
//! AppConfig ──► Orchestrator::initialize ──► ProbeRegistry::build ──► Box<dyn Probe>
//!                     │
//!                     └─ start: one schedule task per probe
//!                            ├─ tick ──► Probe::check(deadline) ──► ProbeResult
//!                            └─ healthy ──► Notifier::dispatch(ping_url)
//! ```

pub mod config;
pub mod error;
pub mod notifier;
pub mod orchestrator;
pub mod probe;
pub mod shutdown;

#[cfg(test)]
mod test_support;

pub use config::{AppConfig, ProbeSpec};
pub use error::AppError;
pub use notifier::{Notifier, NotifyOutcome};
pub use orchestrator::{Orchestrator, OrchestratorError, OrchestratorState};
pub use probe::{Probe, ProbeError, ProbeRegistry, ProbeResult};
