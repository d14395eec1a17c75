//! Termination signals.
//!
//! Handlers are registered when [`install`] returns, before the forward is
//! requested, so a signal arriving between `expose` and the wait is kept.

use std::future::Future;
use std::io;

/// Register for SIGINT and SIGTERM and return a future that resolves on the
/// first of them.
#[cfg(unix)]
pub fn install() -> io::Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    Ok(async move {
        tokio::select! {
            _ = interrupt.recv() => tracing::debug!("SIGINT received"),
            _ = terminate.recv() => tracing::debug!("SIGTERM received"),
        }
    })
}

/// Register for Ctrl-C and return a future that resolves when it arrives.
#[cfg(windows)]
pub fn install() -> io::Result<impl Future<Output = ()>> {
    let mut ctrl_c = tokio::signal::windows::ctrl_c()?;

    Ok(async move {
        ctrl_c.recv().await;
        tracing::debug!("Ctrl-C received");
    })
}

#[cfg(all(test, unix))]
mod tests {
    use std::time::Duration;

    use nix::sys::signal::{Signal, raise};

    #[tokio::test]
    async fn test_resolves_on_sigterm() {
        let shutdown = super::install().unwrap();
        raise(Signal::SIGTERM).unwrap();

        tokio::time::timeout(Duration::from_secs(5), shutdown)
            .await
            .expect("shutdown future did not resolve");
    }
}
