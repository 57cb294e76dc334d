//! Folding attempt outcomes into entry state.

use super::{GenerationResult, ProbeResult, ServerEntry, StepStatus, entry::AttemptFields};
use mockable::Clock;

/// Failure reason for entries without a usable location.
pub const NO_VALID_LOCATION: &str = "no valid location provided";

/// Failure reason for servers that answered with an empty tool list.
pub const NO_TOOLS_EXPOSED: &str = "reachable but exposes no tools";

const UNSPECIFIED_DISCOVERY_FAILURE: &str = "discovery failed";
const UNSPECIFIED_GENERATION_FAILURE: &str = "adapter generation failed";

/// Returns the next state of `entry` after one attempt.
///
/// The entry becomes tested, statuses are copied from the results, and the
/// tool count is the length of the probe's tool list. A missing generation
/// result means generation was not attempted. When the entry is not
/// working, exactly one failure reason is chosen in this order: skipped
/// discovery, failed discovery, zero tools, failed generation.
#[must_use]
pub fn reconcile(
    entry: &ServerEntry,
    probe: &ProbeResult,
    generation: Option<&GenerationResult>,
    clock: &impl Clock,
) -> ServerEntry {
    let generation_status = generation.map_or(StepStatus::NotAttempted, GenerationResult::status);
    let tool_count = probe.tools().len();

    entry.with_attempt(AttemptFields {
        discovery_status: probe.status(),
        generation_status,
        tool_count,
        failure_reason: failure_reason(probe, generation),
        tested_at: clock.utc(),
    })
}

fn failure_reason(probe: &ProbeResult, generation: Option<&GenerationResult>) -> Option<String> {
    match probe.status() {
        StepStatus::Skipped | StepStatus::NotAttempted => Some(NO_VALID_LOCATION.to_owned()),
        StepStatus::Failure => Some(
            probe
                .error()
                .map_or(UNSPECIFIED_DISCOVERY_FAILURE, |error| error.detail())
                .to_owned(),
        ),
        StepStatus::Success if probe.tools().is_empty() => Some(NO_TOOLS_EXPOSED.to_owned()),
        StepStatus::Success => generation
            .filter(|result| result.status() == StepStatus::Failure)
            .map(|result| {
                result
                    .error()
                    .unwrap_or(UNSPECIFIED_GENERATION_FAILURE)
                    .to_owned()
            }),
    }
}
