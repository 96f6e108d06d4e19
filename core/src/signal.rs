use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Read-only view of a race's deadline and cancellation state.
///
/// Providers receive this; only the holder of the underlying
/// [`CancellationToken`] (the coordinator) can end the race.
#[derive(Debug, Clone)]
pub struct RaceSignal {
    token: CancellationToken,
    deadline: Instant,
}

impl RaceSignal {
    #[must_use]
    pub fn new(token: CancellationToken, deadline: Instant) -> Self {
        Self { token, deadline }
    }

    /// True once the race has been decided or the coordinator gave up.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    #[must_use]
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Time left before the deadline, zero once it has passed.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Drives `fut` until it completes, the race is cancelled, or the deadline passes.
    ///
    /// Returns `None` if the race ended first; `fut` is dropped in that case.
    pub async fn guard<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            () = self.token.cancelled() => None,
            () = tokio::time::sleep_until(self.deadline) => None,
            output = fut => Some(output),
        }
    }
}
