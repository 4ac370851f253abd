//! OS signal handling.
//!
//! # Responsibilities
//! - Listen for SIGINT and (on Unix) SIGTERM
//! - First signal triggers graceful shutdown
//! - Second signal forces exit with status 130

use tokio::task::JoinHandle;

use crate::lifecycle::shutdown::Shutdown;

/// Exit status used when stopped by an interrupt.
pub const INTERRUPTED_EXIT_CODE: u8 = 130;

/// Wait for the next termination signal and return its name.
pub async fn wait_for_signal() -> std::io::Result<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result.map(|_| "SIGINT"),
            _ = term.recv() => Ok("SIGTERM"),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.map(|_| "SIGINT")
    }
}

/// Spawn the handler that turns signals into shutdown requests.
pub fn spawn_signal_handler(shutdown: Shutdown) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let signal = match wait_for_signal().await {
                Ok(signal) => signal,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to listen for signals");
                    return;
                }
            };
            if shutdown.trigger() {
                tracing::warn!(signal, "Signal received, shutting down (repeat to force)");
            } else {
                tracing::error!(signal, "Second signal received, forcing exit");
                std::process::exit(i32::from(INTERRUPTED_EXIT_CODE));
            }
        }
    })
}
