//! Infrastructure layer for toolgate
//!
//! This crate contains adapters that implement the ports defined in the
//! application layer: the handler dispatcher over the six execution
//! strategies, the cache stores, configuration file loading, and the
//! composition root wiring a gateway together.

pub mod bootstrap;
pub mod cache_store;
pub mod config;
pub mod credentials;
pub mod dispatch;
pub mod tool_source;

// Re-export commonly used types
pub use bootstrap::{BootstrapError, GatewayBuilder};
pub use cache_store::{JsonFileCacheStore, MemoryCacheStore};
pub use config::{ConfigLoader, ConfigValidationError, FileConfig, FileGatewayConfig, FileToolConfig};
pub use credentials::ConfigCredentialResolver;
pub use dispatch::{FunctionRegistry, HandlerDispatcher, ToolFunction};
pub use tool_source::StaticToolSource;
