//! Port contracts for the server catalog.

mod generator;
mod prober;
mod registry;

#[cfg(test)]
pub use generator::MockAdapterGenerator;
pub use generator::AdapterGenerator;
pub use prober::DiscoveryProber;
pub use registry::{RegistryStore, RegistryStoreError, RegistryStoreResult};
