//! Gateway configuration
//!
//! Tool definitions and gateway settings come from a TOML file merged over
//! defaults by [`ConfigLoader`]. The handler table of each `[tools.<name>]`
//! section maps directly onto the domain's closed handler union; chain
//! references and proxy shapes are validated at load time so configuration
//! errors surface at registration, not at first call.

pub mod file_config;
pub mod loader;

pub use file_config::{
    ConfigValidationError, FileConfig, FileGatewayConfig, FilePlatformConfig, FileToolConfig,
};
pub use loader::ConfigLoader;
