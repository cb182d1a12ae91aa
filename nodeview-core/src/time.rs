//! Time provider abstraction.
//!
//! The dashboard client needs time for exactly two things: the fixed
//! reconnect delay of the STOMP session and optional per-call HTTP timeouts.
//! Abstracting both behind a trait lets tests drive the reconnect loop with
//! short delays (or a paused clock) without touching the session logic.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during time operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeError {
    /// The operation timed out.
    #[error("operation timed out")]
    Elapsed,
}

/// Provider trait for sleeping, timeouts, and elapsed-time queries.
///
/// Single-threaded cooperative model: no `Send` bounds anywhere. `Clone` is
/// required so providers can be handed to background tasks cheaply.
#[async_trait(?Send)]
pub trait TimeProvider: Clone {
    /// Sleep for the specified duration.
    async fn sleep(&self, duration: Duration);

    /// Elapsed time since the provider was created.
    ///
    /// Used for relative measurements only; this is not wall-clock time.
    fn now(&self) -> Duration;

    /// Run a future with a timeout.
    ///
    /// Returns `Ok(result)` if the future completes within the timeout,
    /// or `Err(TimeError::Elapsed)` if it does not.
    async fn timeout<F, T>(&self, duration: Duration, future: F) -> Result<T, TimeError>
    where
        F: std::future::Future<Output = T>;
}

/// Real time provider backed by Tokio's timer.
#[derive(Debug, Clone)]
pub struct TokioTimeProvider {
    /// Start time for calculating elapsed duration
    start_time: std::time::Instant,
}

impl TokioTimeProvider {
    /// Create a new Tokio time provider.
    pub fn new() -> Self {
        Self {
            start_time: std::time::Instant::now(),
        }
    }
}

impl Default for TokioTimeProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl TimeProvider for TokioTimeProvider {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn now(&self) -> Duration {
        self.start_time.elapsed()
    }

    async fn timeout<F, T>(&self, duration: Duration, future: F) -> Result<T, TimeError>
    where
        F: std::future::Future<Output = T>,
    {
        match tokio::time::timeout(duration, future).await {
            Ok(result) => Ok(result),
            Err(_) => Err(TimeError::Elapsed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tokio_provider_now_advances() {
        let time = TokioTimeProvider::new();
        let before = time.now();
        time.sleep(Duration::from_millis(10)).await;
        assert!(time.now() > before);
    }

    #[tokio::test]
    async fn timeout_elapses_on_pending_future() {
        let time = TokioTimeProvider::new();
        let result = time
            .timeout(Duration::from_millis(10), std::future::pending::<()>())
            .await;
        assert_eq!(result, Err(TimeError::Elapsed));
    }

    #[tokio::test]
    async fn timeout_passes_through_completed_future() {
        let time = TokioTimeProvider::new();
        let result = time
            .timeout(Duration::from_secs(1), std::future::ready(42))
            .await;
        assert_eq!(result, Ok(42));
    }
}
