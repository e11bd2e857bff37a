//! Confirmation gate before the first mutation.
//!
//! The gate waits a fixed interval and races it against a cancellation
//! future. In the CLI the cancellation future is Ctrl+C; tests inject
//! `std::future::ready(())` or `std::future::pending()`.

use std::future::Future;
use std::time::Duration;

use tracing::info;

/// Default wait before changes are applied.
pub const DEFAULT_DELAY: Duration = Duration::from_secs(5);

/// Outcome of the gate window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// The window elapsed without cancellation
    Proceed,
    /// Cancellation arrived before the window elapsed
    Cancelled,
}

/// A cancellable delay window.
#[derive(Debug, Clone, Copy)]
pub struct ConfirmationGate {
    delay: Duration,
}

impl Default for ConfirmationGate {
    fn default() -> Self {
        Self::new(DEFAULT_DELAY)
    }
}

impl ConfirmationGate {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Wait for the window to elapse unless `cancel` resolves first.
    ///
    /// A cancellation that is already resolved wins even with a zero delay.
    pub async fn wait<F>(&self, pending_changes: usize, cancel: F) -> GateDecision
    where
        F: Future<Output = ()>,
    {
        info!(
            pending_changes,
            delay_secs = self.delay.as_secs_f64(),
            "waiting before applying changes"
        );
        tokio::select! {
            biased;
            _ = cancel => GateDecision::Cancelled,
            _ = tokio::time::sleep(self.delay) => GateDecision::Proceed,
        }
    }
}

/// Resolves when the process receives an interrupt.
///
/// Never resolves if the signal handler cannot be installed.
pub async fn interrupt() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
