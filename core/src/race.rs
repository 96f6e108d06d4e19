use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use lookout_types::{
    FailureKind, Outcome, ProviderFailure, Query, RacePhase, RaceReport, ResultEnvelope,
};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::{Provider, RaceSignal};

/// Deadline used when the caller has no opinion.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);
/// How long losing tasks get to exit on their own before they are aborted.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_millis(250);

/// What a provider task hands back. Each task sends at most one.
#[derive(Debug)]
enum TaskReport {
    Succeeded(ResultEnvelope),
    Failed(ProviderFailure),
}

/// A single-shot race over a fixed set of providers.
///
/// [`Race::run`] consumes the coordinator, so an outcome can only ever be
/// produced once per constructed race.
pub struct Race {
    providers: Vec<Arc<dyn Provider>>,
    timeout: Duration,
    grace: Duration,
}

impl std::fmt::Debug for Race {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Race")
            .field(
                "providers",
                &self.providers.iter().map(|p| p.id().as_str()).collect::<Vec<_>>(),
            )
            .field("timeout", &self.timeout)
            .field("grace", &self.grace)
            .finish()
    }
}

impl Race {
    pub fn new(providers: impl IntoIterator<Item = Arc<dyn Provider>>, timeout: Duration) -> Self {
        Self {
            providers: providers.into_iter().collect(),
            timeout,
            grace: DEFAULT_GRACE_PERIOD,
        }
    }

    #[must_use]
    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Runs every provider concurrently against `query` and decides the outcome.
    ///
    /// Returns as soon as the first envelope arrives, the deadline passes, or
    /// every provider has failed. Losing tasks are cancelled and wound down in
    /// the background; the caller is never held up by them.
    pub async fn run(self, query: Query) -> RaceReport {
        let started = Instant::now();
        let launched = self.providers.len();
        let mut phase = RacePhase::Pending;

        if launched == 0 {
            advance(&mut phase, RacePhase::AllFailed);
            tracing::warn!(%query, "Race started with no providers");
            return RaceReport {
                outcome: Outcome::AllFailed,
                failures: Vec::new(),
                launched,
                elapsed: started.elapsed(),
            };
        }

        let deadline = started + self.timeout;
        let token = CancellationToken::new();
        let signal = RaceSignal::new(token.clone(), deadline);
        // One slot per provider: no task can block on send after we stop reading.
        let (tx, mut rx) = mpsc::channel(launched);

        let mut tasks = JoinSet::new();
        for provider in self.providers {
            tasks.spawn(run_attempt(provider, query.clone(), signal.clone(), tx.clone()));
        }
        drop(tx);
        advance(&mut phase, RacePhase::Racing);
        tracing::debug!(%query, launched, timeout_ms = self.timeout.as_millis(), "Race launched");

        let mut failures = Vec::new();
        let expiry = time::sleep_until(deadline);
        tokio::pin!(expiry);

        let outcome = loop {
            tokio::select! {
                // A report already in the channel beats a deadline firing in the same poll.
                biased;
                report = rx.recv() => match report {
                    Some(TaskReport::Succeeded(envelope)) => break Outcome::Won(envelope),
                    Some(TaskReport::Failed(failure)) => {
                        failures.push(failure);
                        if failures.len() == launched {
                            break Outcome::AllFailed;
                        }
                    }
                    // Tasks only go quiet once the race has ended or run out of time.
                    None if Instant::now() >= deadline => break Outcome::TimedOut,
                    None => break Outcome::AllFailed,
                },
                () = &mut expiry => break Outcome::TimedOut,
            }
        };

        token.cancel();
        advance(&mut phase, outcome.phase());

        let elapsed = started.elapsed();
        match &outcome {
            Outcome::Won(envelope) => tracing::info!(
                %query,
                provider = %envelope.provider(),
                elapsed_ms = elapsed.as_millis(),
                "Race won"
            ),
            Outcome::TimedOut => tracing::info!(
                %query,
                failed = failures.len(),
                launched,
                elapsed_ms = elapsed.as_millis(),
                "Race timed out"
            ),
            Outcome::AllFailed => tracing::info!(
                %query,
                launched,
                elapsed_ms = elapsed.as_millis(),
                "All providers failed"
            ),
        }

        reap(tasks, self.grace);

        RaceReport {
            outcome,
            failures,
            launched,
            elapsed,
        }
    }
}

/// Races `providers` for `query` under `timeout` and returns only the outcome.
pub async fn race(query: &Query, providers: &[Arc<dyn Provider>], timeout: Duration) -> Outcome {
    Race::new(providers.iter().cloned(), timeout)
        .run(query.clone())
        .await
        .outcome
}

async fn run_attempt(
    provider: Arc<dyn Provider>,
    query: Query,
    signal: RaceSignal,
    tx: mpsc::Sender<TaskReport>,
) {
    let id = provider.id().clone();
    let attempt = AssertUnwindSafe(provider.attempt(&query, &signal)).catch_unwind();

    let result = tokio::select! {
        biased;
        () = signal.cancelled() => {
            tracing::debug!(provider = %id, "Abandoning attempt, race already decided");
            return;
        }
        result = attempt => match result {
            Ok(result) => result,
            Err(panic) => Err(ProviderFailure::new(
                id.clone(),
                FailureKind::Panicked,
                panic_message(panic.as_ref()),
            )),
        },
    };

    let report = match result {
        Ok(envelope) => {
            if signal.is_cancelled() {
                tracing::debug!(provider = %id, "Discarding late result");
                return;
            }
            TaskReport::Succeeded(envelope)
        }
        Err(failure)
            if failure.kind() == FailureKind::Cancelled
                && (signal.is_cancelled() || signal.is_expired()) =>
        {
            tracing::debug!(provider = %id, "Attempt stopped at the deadline");
            return;
        }
        Err(failure) => {
            tracing::warn!(
                provider = %id,
                kind = %failure.kind(),
                error = %failure.message(),
                "Provider attempt failed"
            );
            TaskReport::Failed(failure)
        }
    };

    // Capacity equals the number of tasks, so this only fails once the
    // coordinator has already returned and dropped the receiver.
    if tx.try_send(report).is_err() {
        tracing::debug!(provider = %id, "Coordinator gone, dropping report");
    }
}

/// Gives cancelled tasks `grace` to exit on their own, then aborts the rest.
fn reap(mut tasks: JoinSet<()>, grace: Duration) {
    if tasks.is_empty() {
        return;
    }

    tokio::spawn(async move {
        let drained = time::timeout(grace, async {
            while tasks.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            tracing::warn!(
                remaining = tasks.len(),
                "Aborting provider tasks that ignored cancellation"
            );
            tasks.shutdown().await;
        }
    });
}

fn advance(phase: &mut RacePhase, to: RacePhase) {
    match phase.transition(to) {
        Ok(next) => {
            tracing::debug!(from = ?*phase, to = ?next, "Race transition");
            *phase = next;
        }
        Err(e) => tracing::error!(%e, "Race state machine violated"),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "provider panicked".to_string()
    }
}
