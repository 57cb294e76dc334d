//! In-memory adapters for tests and dry runs.

mod generator;
mod prober;
mod registry;

pub use generator::InMemoryAdapterGenerator;
pub use prober::ScriptedProber;
pub use registry::InMemoryRegistryStore;
