//! Termination signal handling.
//!
//! Handles SIGTERM and SIGINT (Ctrl+C). The entry point waits here, then
//! stops the orchestrator before exiting.

use std::fmt;
use std::io;

/// Signal that ended the wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    Interrupt,
    Terminate,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownSignal::Interrupt => write!(f, "SIGINT"),
            ShutdownSignal::Terminate => write!(f, "SIGTERM"),
        }
    }
}

/// Wait until the process receives SIGINT or SIGTERM.
///
/// Fails only if a signal handler cannot be installed.
pub async fn wait_for_signal() -> io::Result<ShutdownSignal> {
    #[cfg(unix)]
    let mut terminate =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    #[cfg(unix)]
    let terminated = async {
        terminate.recv().await;
    };

    #[cfg(not(unix))]
    let terminated = std::future::pending::<()>();

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            Ok(ShutdownSignal::Interrupt)
        }
        _ = terminated => Ok(ShutdownSignal::Terminate),
    }
}
