//! Shutdown signal plumbing.
//!
//! A watch channel carries a single "shutting down" flag from the OS signal
//! handler to the HTTP server's graceful-shutdown future.

use tokio::signal;
use tokio::sync::watch;

/// Hands out shutdown futures and flips the flag on SIGINT/SIGTERM.
pub struct ShutdownSignal {
    tx: watch::Sender<bool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// A future that resolves once shutdown has been requested.
    pub fn wait(&self) -> impl std::future::Future<Output = ()> + Send + 'static {
        let mut rx = self.tx.subscribe();
        async move {
            // Either the flag flips or the sender is gone; both mean stop.
            while !*rx.borrow() {
                if rx.changed().await.is_err() {
                    return;
                }
            }
        }
    }

    /// Trigger shutdown programmatically.
    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }

    /// Block until SIGINT or SIGTERM arrives, then trigger shutdown.
    pub async fn listen_for_signals(&self) {
        let ctrl_c = signal::ctrl_c();

        #[cfg(unix)]
        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => { tracing::info!("received SIGINT, shutting down"); }
            _ = terminate => { tracing::info!("received SIGTERM, shutting down"); }
        }

        self.trigger();
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn wait_resolves_after_trigger() {
        let shutdown = ShutdownSignal::new();
        let wait = shutdown.wait();
        shutdown.trigger();
        wait.await;
    }

    #[tokio::test]
    async fn multiple_waiters_all_resolve() {
        let shutdown = ShutdownSignal::new();
        let a = shutdown.wait();
        let b = shutdown.wait();
        shutdown.trigger();
        a.await;
        b.await;
    }
}
