//! Domain layer for toolgate
//!
//! This crate contains the core model of the tool-call gateway: tool
//! definitions with their handler strategies, call results, the consumable
//! result cache, and the background task lifecycle. It has no dependencies
//! on infrastructure or I/O concerns.
//!
//! # Core Concepts
//!
//! ## Handler
//!
//! Every tool is bound to exactly one execution strategy, modeled as the
//! closed [`tool::HandlerConfig`] union (proxy, function, http, script,
//! chain, forward). Adding a strategy is a compile-time-checked change.
//!
//! ## Consumption
//!
//! A finished call result is delivered to a caller **at most once**. The
//! [`cache::CacheEntry`] tracks this with its `consumed` flag; a consumed
//! entry is eligible for eviction regardless of remaining TTL.

pub mod cache;
pub mod task;
pub mod tool;

// Re-export commonly used types
pub use cache::{CacheEntry, CacheStatus};
pub use task::{TaskRecord, TaskStatus};
pub use tool::{
    call_key::CallKey,
    entities::{
        ChainErrorHandling, ChainHandler, ChainMode, ForwardHandler, FunctionHandler,
        HandlerConfig, HttpAuth, HttpHandler, ProxyHandler, ResponseMapping, ScriptHandler,
        ToolDefinition,
    },
    value_objects::{CallOutcome, ContentItem, ToolCallResult},
};
