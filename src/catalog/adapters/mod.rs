//! Adapter implementations for catalog ports.

pub mod artifacts;
mod atomic;
pub mod json_file;
pub mod memory;
pub mod module;
pub mod rpc;
