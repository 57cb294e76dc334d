//! Discovery port.

use crate::catalog::domain::{ProbeResult, ServerEntry};
use async_trait::async_trait;
use std::time::Duration;

/// Contract for asking a server which tools it exposes.
///
/// Probing never fails as a call: every outcome, including an unusable
/// location, is reported through the returned [`ProbeResult`].
#[async_trait]
pub trait DiscoveryProber: Send + Sync {
    /// Performs one discovery attempt bounded by `timeout`.
    async fn probe(&self, entry: &ServerEntry, timeout: Duration) -> ProbeResult;
}
