//! Scripted discovery prober.

use crate::catalog::{
    domain::{NO_VALID_LOCATION, ProbeError, ProbeResult, ServerEntry},
    ports::DiscoveryProber,
};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

/// Prober that replays queued results per server name.
///
/// Entries without a usable location are skipped without consuming the
/// script, matching a real prober. A server with an exhausted script gets
/// a protocol failure.
#[derive(Debug, Clone, Default)]
pub struct ScriptedProber {
    scripts: Arc<Mutex<HashMap<String, VecDeque<ProbeResult>>>>,
    delay: Duration,
    probes: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
}

impl ScriptedProber {
    /// Creates a prober with no scripts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every probe wait `delay` before answering.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Queues `result` for the server named `server`.
    #[must_use]
    pub fn script(self, server: &str, result: ProbeResult) -> Self {
        if let Ok(mut scripts) = self.scripts.lock() {
            scripts.entry(server.to_owned()).or_default().push_back(result);
        }
        self
    }

    /// Number of probe calls so far.
    #[must_use]
    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    /// Highest number of concurrently running probes observed.
    #[must_use]
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn next_result(&self, server: &str) -> ProbeResult {
        self.scripts
            .lock()
            .ok()
            .and_then(|mut scripts| scripts.get_mut(server).and_then(VecDeque::pop_front))
            .unwrap_or_else(|| {
                ProbeResult::failure(
                    ProbeError::protocol(format!("no scripted result for '{server}'")),
                    Duration::ZERO,
                )
            })
    }
}

#[async_trait]
impl DiscoveryProber for ScriptedProber {
    async fn probe(&self, entry: &ServerEntry, _timeout: Duration) -> ProbeResult {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if !matches!(entry.parsed_location(), Some(Ok(_))) {
            return ProbeResult::skipped(NO_VALID_LOCATION);
        }

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        let _guard = InFlightGuard(Arc::clone(&self.in_flight));

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.next_result(entry.name().as_str())
    }
}

struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
