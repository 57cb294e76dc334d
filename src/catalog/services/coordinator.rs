//! Concurrent test runs over the registry.
//!
//! A fixed pool of workers pulls selected entries from a shared queue,
//! probes each one (with retries for transport failures), and produces an
//! adapter when discovery found something to adapt. Workers never touch the
//! registry: they send outcomes to the coordinator, which is the only
//! writer. It reconciles each outcome, saves periodically, and acknowledges
//! the worker so it can take the next entry.

use crate::catalog::{
    domain::{
        CatalogReport, EntryRunState, GenerationResult, ProbeResult, ServerEntry, StepStatus,
        reconcile,
    },
    ports::{AdapterGenerator, DiscoveryProber, RegistryStore, RegistryStoreError},
};
use mockable::Clock;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Retry schedule for transport failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per entry, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles after each retry.
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    /// Returns the delay after failed attempt number `attempt` (1-based).
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.initial_backoff.saturating_mul(1_u32 << exponent)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

/// Parameters of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Select every entry instead of only untested ones.
    pub force: bool,
    /// Number of workers.
    pub max_in_flight: usize,
    /// Bound on a single discovery attempt.
    pub probe_timeout: Duration,
    /// Retry schedule.
    pub retry: RetryPolicy,
    /// Reconciliations between saves.
    pub save_every: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            force: false,
            max_in_flight: 4,
            probe_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            save_every: 1,
        }
    }
}

/// Generation error observed for a server that still counts as working.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedGeneration {
    /// Server name.
    pub server: String,
    /// Generator diagnostic.
    pub reason: String,
}

/// Outcome of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Entries selected for testing.
    pub selected: usize,
    /// Entries reconciled before the run ended.
    pub reconciled: usize,
    /// Whether the run was cancelled.
    pub cancelled: bool,
    /// Generation failures, in reconciliation order.
    pub generation_failures: Vec<FailedGeneration>,
    /// Registry report after the run.
    pub report: CatalogReport,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            formatter,
            "tested {} of {} selected entries{}",
            self.reconciled,
            self.selected,
            if self.cancelled { " (cancelled)" } else { "" }
        )?;
        for failure in &self.generation_failures {
            writeln!(
                formatter,
                "  generation failed for {}: {}",
                failure.server, failure.reason
            )?;
        }
        self.report.fmt(formatter)
    }
}

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum RunCoordinatorError {
    /// Loading or saving the registry failed.
    #[error(transparent)]
    Store(#[from] RegistryStoreError),
    /// A worker task ended abnormally.
    #[error("worker task failed: {0}")]
    Worker(String),
}

/// Result type for coordinator operations.
pub type RunCoordinatorResult<T> = Result<T, RunCoordinatorError>;

struct Outcome {
    index: usize,
    probe: ProbeResult,
    generation: Option<GenerationResult>,
    reconciled: oneshot::Sender<()>,
}

struct Worker<P, G> {
    queue: Arc<Mutex<VecDeque<(usize, ServerEntry)>>>,
    prober: Arc<P>,
    generator: Arc<G>,
    outcomes: mpsc::Sender<Outcome>,
    cancel: CancellationToken,
    probe_timeout: Duration,
    retry: RetryPolicy,
}

impl<P, G> Worker<P, G>
where
    P: DiscoveryProber + 'static,
    G: AdapterGenerator + 'static,
{
    fn next_entry(&self) -> Option<(usize, ServerEntry)> {
        if self.cancel.is_cancelled() {
            return None;
        }
        self.queue.lock().ok()?.pop_front()
    }

    async fn run(self) {
        while let Some((index, entry)) = self.next_entry() {
            let mut state = EntryRunState::Pending;
            state = advance(state, EntryRunState::Probing);

            let Some(probe) = self.probe_with_retry(&entry).await else {
                state = advance(state, EntryRunState::Pending);
                debug!(server = %entry.name(), %state, "probe aborted by cancellation");
                break;
            };

            let generation = match probe.status() {
                StepStatus::Success
                    if !probe.tools().is_empty() || self.generator.permits_empty_stub() =>
                {
                    state = advance(state, EntryRunState::Generating);
                    Some(self.generate(&entry, &probe).await)
                }
                StepStatus::Success => {
                    state = advance(state, EntryRunState::SkippedGeneration);
                    Some(GenerationResult::skipped())
                }
                StepStatus::Failure | StepStatus::Skipped | StepStatus::NotAttempted => {
                    state = advance(state, EntryRunState::SkippedGeneration);
                    None
                }
            };
            debug!(server = %entry.name(), %state, "attempt finished");

            let (reconciled, acknowledged) = oneshot::channel();
            let outcome = Outcome {
                index,
                probe,
                generation,
                reconciled,
            };
            if self.outcomes.send(outcome).await.is_err() || acknowledged.await.is_err() {
                break;
            }
        }
    }

    async fn probe_with_retry(&self, entry: &ServerEntry) -> Option<ProbeResult> {
        let mut attempt = 1;
        loop {
            let result = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return None,
                result = self.prober.probe(entry, self.probe_timeout) => result,
            };
            if !result.is_retryable() || attempt >= self.retry.max_attempts {
                return Some(result.with_attempts(attempt));
            }

            let delay = self.retry.backoff(attempt);
            warn!(
                server = %entry.name(),
                attempt,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = result.error().map_or("", |error| error.detail()),
                "transport failure, retrying"
            );
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => return None,
                () = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }

    async fn generate(&self, entry: &ServerEntry, probe: &ProbeResult) -> GenerationResult {
        let generator = Arc::clone(&self.generator);
        let target = entry.clone();
        let tools = probe.tools().to_vec();
        tokio::task::spawn_blocking(move || generator.generate(&target, &tools))
            .await
            .unwrap_or_else(|err| GenerationResult::failure(format!("generator task failed: {err}")))
    }
}

fn advance(state: EntryRunState, target: EntryRunState) -> EntryRunState {
    state.advance(target).unwrap_or_else(|err| {
        error!(%err, "run state machine violated");
        target
    })
}

/// Runs test passes over the registry.
#[derive(Clone)]
pub struct RunCoordinator<R, P, G, C>
where
    R: RegistryStore,
    P: DiscoveryProber,
    G: AdapterGenerator,
    C: Clock + Send + Sync,
{
    store: Arc<R>,
    prober: Arc<P>,
    generator: Arc<G>,
    clock: Arc<C>,
    options: RunOptions,
}

impl<R, P, G, C> RunCoordinator<R, P, G, C>
where
    R: RegistryStore,
    P: DiscoveryProber + 'static,
    G: AdapterGenerator + 'static,
    C: Clock + Send + Sync,
{
    /// Creates a coordinator.
    #[must_use]
    pub const fn new(
        store: Arc<R>,
        prober: Arc<P>,
        generator: Arc<G>,
        clock: Arc<C>,
        options: RunOptions,
    ) -> Self {
        Self {
            store,
            prober,
            generator,
            clock,
            options,
        }
    }

    /// Returns the run options.
    #[must_use]
    pub const fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Tests every selected entry and folds the outcomes into the registry.
    ///
    /// Without `force`, only untested entries are selected, so repeating a
    /// completed run probes nothing and leaves the registry untouched. When
    /// `cancel` fires, workers stop taking entries and abandon in-flight
    /// probes; entries already reconciled stay saved and the rest remain
    /// pending.
    ///
    /// # Errors
    ///
    /// Returns [`RunCoordinatorError::Store`] when the registry cannot be
    /// loaded or saved. Workers are stopped before the error is returned.
    pub async fn run(&self, cancel: CancellationToken) -> RunCoordinatorResult<RunSummary> {
        let mut entries = self.store.load().await?;
        let selected: VecDeque<(usize, ServerEntry)> = entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| self.options.force || !entry.tested())
            .map(|(index, entry)| (index, entry.clone()))
            .collect();
        let selected_count = selected.len();

        if selected_count == 0 {
            info!(total = entries.len(), "no entries selected");
            return Ok(RunSummary {
                selected: 0,
                reconciled: 0,
                cancelled: cancel.is_cancelled(),
                generation_failures: Vec::new(),
                report: CatalogReport::from_entries(&entries),
            });
        }

        let worker_count = self.options.max_in_flight.clamp(1, selected_count);
        info!(
            selected = selected_count,
            total = entries.len(),
            workers = worker_count,
            force = self.options.force,
            "run started"
        );

        let queue = Arc::new(Mutex::new(selected));
        let (outcomes, mut incoming) = mpsc::channel(worker_count);
        let mut workers = JoinSet::new();
        for _ in 0..worker_count {
            let worker = Worker {
                queue: Arc::clone(&queue),
                prober: Arc::clone(&self.prober),
                generator: Arc::clone(&self.generator),
                outcomes: outcomes.clone(),
                cancel: cancel.clone(),
                probe_timeout: self.options.probe_timeout,
                retry: self.options.retry,
            };
            workers.spawn(worker.run());
        }
        drop(outcomes);

        let save_every = self.options.save_every.max(1);
        let mut reconciled = 0;
        let mut unsaved = 0;
        let mut generation_failures = Vec::new();

        while let Some(outcome) = incoming.recv().await {
            let Some(current) = entries.get(outcome.index) else {
                error!(index = outcome.index, "outcome for unknown entry ignored");
                continue;
            };
            let next = reconcile(
                current,
                &outcome.probe,
                outcome.generation.as_ref(),
                &*self.clock,
            );
            log_reconciled(&next, &outcome);
            if next.actually_working()
                && let Some(reason) = outcome
                    .generation
                    .as_ref()
                    .filter(|result| result.status() == StepStatus::Failure)
                    .and_then(GenerationResult::error)
            {
                generation_failures.push(FailedGeneration {
                    server: next.name().as_str().to_owned(),
                    reason: reason.to_owned(),
                });
            }
            if let Some(slot) = entries.get_mut(outcome.index) {
                *slot = next;
            }
            reconciled += 1;
            unsaved += 1;

            if unsaved >= save_every {
                self.save(&entries).await?;
                unsaved = 0;
            }
            if outcome.reconciled.send(()).is_err() {
                debug!(index = outcome.index, "worker gone before acknowledgement");
            }
        }

        while let Some(joined) = workers.join_next().await {
            joined.map_err(|err| RunCoordinatorError::Worker(err.to_string()))?;
        }

        if unsaved > 0 {
            self.save(&entries).await?;
        }

        let cancelled = cancel.is_cancelled();
        if cancelled {
            warn!(reconciled, selected = selected_count, "run cancelled");
        } else {
            info!(reconciled, "run finished");
        }
        Ok(RunSummary {
            selected: selected_count,
            reconciled,
            cancelled,
            generation_failures,
            report: CatalogReport::from_entries(&entries),
        })
    }

    async fn save(&self, entries: &[ServerEntry]) -> RunCoordinatorResult<()> {
        self.store.save(entries).await.inspect_err(|err| {
            error!(%err, "registry save failed, aborting run");
        })?;
        debug!(entries = entries.len(), "registry saved");
        Ok(())
    }
}

fn log_reconciled(entry: &ServerEntry, outcome: &Outcome) {
    info!(
        server = %entry.name(),
        discovery = %entry.discovery_status(),
        generation = %entry.generation_status(),
        tools = entry.tool_count(),
        attempts = outcome.probe.attempts(),
        elapsed_ms = u64::try_from(outcome.probe.elapsed().as_millis()).unwrap_or(u64::MAX),
        working = entry.actually_working(),
        reason = entry.failure_reason().unwrap_or(""),
        "entry reconciled"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, 100)]
    #[case(2, 200)]
    #[case(3, 400)]
    #[case(4, 800)]
    fn backoff_doubles_per_attempt(#[case] attempt: u32, #[case] expected_ms: u64) {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
        };
        assert_eq!(policy.backoff(attempt), Duration::from_millis(expected_ms));
    }

    #[test]
    fn backoff_saturates() {
        let policy = RetryPolicy {
            max_attempts: u32::MAX,
            initial_backoff: Duration::from_secs(u64::MAX / 2),
        };
        assert_eq!(policy.backoff(40), Duration::MAX);
    }
}
