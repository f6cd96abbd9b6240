//! Wall-clock budgets for network waits.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use super::error::{Phase, TransportError};

/// A point in time after which a wait is abandoned.
///
/// Built on tokio's clock, so paused-time tests advance it deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Deadline(Instant);

impl Deadline {
    /// A deadline `budget` from now.
    pub fn after(budget: Duration) -> Self {
        Self(Instant::now() + budget)
    }

    pub fn at(instant: Instant) -> Self {
        Self(instant)
    }

    pub fn instant(&self) -> Instant {
        self.0
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.0
    }

    /// Time left, zero once expired.
    pub fn remaining(&self) -> Duration {
        self.0.saturating_duration_since(Instant::now())
    }

    /// Run `fut` to completion unless the deadline passes first.
    ///
    /// `received` is reported in the timeout error so callers can tell a
    /// stalled transfer from one that never started.
    pub async fn run<F: Future>(
        self,
        phase: Phase,
        received: u64,
        fut: F,
    ) -> Result<F::Output, TransportError> {
        tokio::time::timeout_at(self.0, fut)
            .await
            .map_err(|_| TransportError::Timeout { phase, received })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn expires_after_budget() {
        let deadline = Deadline::after(Duration::from_secs(3));
        assert!(!deadline.is_expired());
        assert_eq!(deadline.remaining(), Duration::from_secs(3));

        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(deadline.is_expired());
        assert_eq!(deadline.remaining(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn run_times_out() {
        let deadline = Deadline::after(Duration::from_millis(500));
        let result = deadline
            .run(Phase::Response, 0, std::future::pending::<()>())
            .await;
        assert!(matches!(
            result,
            Err(TransportError::Timeout {
                phase: Phase::Response,
                received: 0
            })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn run_passes_through() {
        let deadline = Deadline::after(Duration::from_secs(1));
        assert_eq!(deadline.run(Phase::Body, 0, async { 7 }).await.unwrap(), 7);
    }
}
