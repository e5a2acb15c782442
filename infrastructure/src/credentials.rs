//! Credential resolver backed by the loaded configuration

use std::collections::BTreeMap;

use toolgate_application::ports::credentials::{CredentialResolverPort, PlatformCredential};

use crate::config::file_config::FilePlatformConfig;

/// Resolves proxy platform credentials from `[gateway.platforms]`
#[derive(Debug, Clone, Default)]
pub struct ConfigCredentialResolver {
    platforms: BTreeMap<String, FilePlatformConfig>,
}

impl ConfigCredentialResolver {
    pub fn new(platforms: BTreeMap<String, FilePlatformConfig>) -> Self {
        Self { platforms }
    }
}

impl CredentialResolverPort for ConfigCredentialResolver {
    fn resolve(&self, platform: &str) -> Option<PlatformCredential> {
        let config = self.platforms.get(platform)?;
        if config.token.is_empty() {
            return None;
        }
        Some(PlatformCredential {
            token: config.token.clone(),
            base_url: config.base_url.clone(),
        })
    }
}
