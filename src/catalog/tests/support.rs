//! Shared fixtures for catalog unit tests.

use crate::catalog::{
    domain::{ServerEntry, ServerName, ToolSchema},
    services::{RetryPolicy, RunOptions},
};
use chrono::{DateTime, Local, TimeZone, Utc};
use mockable::Clock;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

pub(super) struct FixedClock(DateTime<Utc>);

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.0.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.0
    }
}

pub(super) fn fixed_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock(
        Utc.with_ymd_and_hms(2025, 10, 21, 9, 30, 0)
            .single()
            .expect("valid timestamp"),
    ))
}

pub(super) fn pending(name: &str, location: Option<&str>) -> ServerEntry {
    ServerEntry::new(
        ServerName::new(name).expect("valid server name"),
        location.map(str::to_owned),
    )
}

pub(super) fn tools(names: &[&str]) -> Vec<ToolSchema> {
    names
        .iter()
        .map(|name| {
            ToolSchema::new(
                *name,
                format!("Tool {name}"),
                json!({
                    "type": "object",
                    "properties": {"query": {"type": "string"}},
                    "required": ["query"]
                }),
            )
            .expect("valid tool")
        })
        .collect()
}

pub(super) fn fast_options() -> RunOptions {
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
