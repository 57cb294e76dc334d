//! Orchestration services for the server catalog.

mod catalog;
mod coordinator;

pub use catalog::{CatalogService, CatalogServiceError, CatalogServiceResult};
pub use coordinator::{
    FailedGeneration, RetryPolicy, RunCoordinator, RunCoordinatorError, RunOptions, RunSummary,
};
