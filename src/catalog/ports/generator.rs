//! Adapter generation port.

use crate::catalog::domain::{GenerationResult, ServerEntry, ToolSchema};

/// Contract for turning a discovered tool surface into an adapter.
#[cfg_attr(test, mockall::automock)]
pub trait AdapterGenerator: Send + Sync {
    /// Produces an adapter for `entry` exposing `tools`.
    fn generate(&self, entry: &ServerEntry, tools: &[ToolSchema]) -> GenerationResult;

    /// Whether an adapter with no tools may be produced.
    fn permits_empty_stub(&self) -> bool {
        false
    }
}
