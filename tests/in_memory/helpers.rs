//! Shared helpers for in-memory catalog integration tests.

use census::catalog::{
    domain::{ProbeError, ProbeResult, ServerEntry, ServerName, ToolSchema},
    services::{RetryPolicy, RunOptions},
};
use rstest::fixture;
use serde_json::json;
use std::time::Duration;

/// Run options with fast retries and two workers.
#[fixture]
pub fn options() -> RunOptions {
    RunOptions {
        force: false,
        max_in_flight: 2,
        probe_timeout: Duration::from_secs(1),
        retry: RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1),
        },
        save_every: 1,
    }
}

/// Builds a pending registry entry.
pub fn entry(name: &str, location: Option<&str>) -> ServerEntry {
    ServerEntry::new(
        ServerName::new(name).expect("valid server name"),
        location.map(str::to_owned),
    )
}

/// Builds a successful probe listing `names`.
///
/// Every tool takes a required `query` string and an optional `limit`.
pub fn listing(names: &[&str]) -> ProbeResult {
    let tools = names
        .iter()
        .map(|name| {
            ToolSchema::new(
                *name,
                format!("{name} tool"),
                json!({
                    "type": "object",
                    "properties": {
                        "query": {"type": "string"},
                        "limit": {"type": "integer"}
                    },
                    "required": ["query"]
                }),
            )
            .expect("valid tool schema")
        })
        .collect();
    ProbeResult::success(tools, Duration::from_millis(15))
}

/// Builds a retryable transport failure.
pub fn timed_out() -> ProbeResult {
    ProbeResult::failure(
        ProbeError::transport("timed out after 30000ms"),
        Duration::from_millis(30),
    )
}
