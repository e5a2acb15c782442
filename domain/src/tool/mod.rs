//! Tool domain module
//!
//! Contains the tool definition model (entities), call result value objects,
//! and the deterministic call key used to correlate polls with earlier calls.

pub mod call_key;
pub mod entities;
pub mod value_objects;

pub use call_key::CallKey;
pub use entities::{HandlerConfig, ToolDefinition};
pub use value_objects::{CallOutcome, ContentItem, ToolCallResult};
