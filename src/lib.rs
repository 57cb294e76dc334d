//! Census: discovery and adapter generation for catalogued MCP servers.
//!
//! This crate keeps a persisted registry of tool-providing servers, probes
//! each one for the tools it exposes, synthesizes a uniform local adapter
//! per server, and records which servers actually work.
//!
//! # Architecture
//!
//! Census follows hexagonal architecture principles:
//!
//! - **Domain**: Pure catalog logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for storage, discovery, generation
//! - **Adapters**: Concrete implementations (JSON files, JSON-RPC, memory)
//!
//! # Modules
//!
//! - [`catalog`]: Registry model, ports, adapters, and run orchestration
//! - [`config`]: Pipeline settings loaded from TOML

pub mod catalog;
pub mod config;
