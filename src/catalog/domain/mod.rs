//! Domain model for the server catalog.
//!
//! Registry entries, server locations, discovered tool schemas, attempt
//! outcomes, adapter manifests, and the reconciliation rules that fold an
//! attempt back into an entry. Nothing here performs I/O.

mod adapter;
mod entry;
mod error;
mod generation;
mod ids;
mod location;
mod probe;
mod reconcile;
mod report;
mod run_state;
mod status;
mod tool;

pub use adapter::{
    AdapterManifest, AdapterMode, DEFAULT_MOCK_TEMPLATE, EntryPoint, GenerationError,
    SynthesisOptions, entry_point_identifier,
};
pub use entry::{PersistedServerEntry, ServerEntry, ensure_unique_names, is_actually_working};
pub use error::{CatalogDomainError, ParseStepStatusError};
pub use generation::GenerationResult;
pub use ids::ServerName;
pub use location::{ServerLocation, StdioLocation};
pub use probe::{ProbeError, ProbeErrorKind, ProbeResult, ServerInfo};
pub use reconcile::{NO_TOOLS_EXPOSED, NO_VALID_LOCATION, reconcile};
pub use report::{CatalogReport, ReportOutcome, WorkingServer};
pub use run_state::EntryRunState;
pub use status::StepStatus;
pub use tool::{ParameterSpec, ToolSchema};
