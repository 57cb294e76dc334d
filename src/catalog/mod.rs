//! MCP server catalog: discovery, adapter generation, and status tracking.
//!
//! This module keeps a persisted registry of tool-providing servers, probes
//! each one for its declared tools, synthesizes a uniform local adapter from
//! what was discovered, and reconciles the outcome back into the registry.
//! The module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
