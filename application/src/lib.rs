//! Application layer for toolgate
//!
//! This crate contains the gateway use cases and the port definitions their
//! adapters implement. It depends only on the domain layer.
//!
//! The central use case is [`gateway::ToolGateway`]: it decides how a call
//! runs (via the dispatcher port), what happens when it runs too long (the
//! deadline race that never cancels the work), and how a late result is
//! delivered exactly once (the consumable cache).

pub mod cache;
pub mod gateway;
pub mod ports;
pub mod registry;
pub mod tasks;

// Re-export commonly used types
pub use cache::{CacheLifecycle, LifecycleHandle};
pub use gateway::{CallOptions, GatewayError, ToolGateway};
pub use ports::{
    cache_store::{CacheStoreError, CacheStorePort},
    credentials::{CredentialResolverPort, PlatformCredential},
    dispatcher::{DispatchError, DispatcherPort},
    forwarder::{ForwardError, ToolForwarderPort},
    tool_source::{ConfigChange, ToolSourceError, ToolSourcePort},
};
pub use registry::ToolRegistry;
pub use tasks::{TaskManager, TaskStats};
