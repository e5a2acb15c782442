//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod cache_store;
pub mod credentials;
pub mod dispatcher;
pub mod forwarder;
pub mod tool_source;
