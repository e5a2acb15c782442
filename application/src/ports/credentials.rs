//! Credential resolver port
//!
//! Supplies bearer tokens and base URLs for proxy platforms. A missing
//! credential is a configuration error surfaced as an error result by the
//! proxy handler, never a crash.

/// Credential material for one proxy platform
#[derive(Debug, Clone)]
pub struct PlatformCredential {
    /// Bearer token sent with proxy requests
    pub token: String,
    /// Platform base URL, when not overridden per tool
    pub base_url: Option<String>,
}

/// Port for the secrets/configuration lookup
pub trait CredentialResolverPort: Send + Sync {
    /// Credential for a platform identifier, if configured
    fn resolve(&self, platform: &str) -> Option<PlatformCredential>;
}
