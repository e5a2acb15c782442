//! Configuration file loader with multi-source merging

use super::file_config::FileConfig;
use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use std::path::PathBuf;

/// Configuration loader that handles file discovery and merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority
    ///
    /// Priority (highest to lowest):
    /// 1. Explicit config path (if provided)
    /// 2. Project root: `./toolgate.toml` or `./.toolgate.toml`
    /// 3. XDG config: `$XDG_CONFIG_HOME/toolgate/config.toml`
    /// 4. Default values
    pub fn load(config_path: Option<&PathBuf>) -> Result<FileConfig, Box<figment::Error>> {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(&global_path));
            }
        }

        for filename in &["toolgate.toml", ".toolgate.toml"] {
            let path = PathBuf::from(filename);
            if path.exists() {
                figment = figment.merge(Toml::file(&path));
                break;
            }
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment.extract().map_err(Box::new)
    }

    /// Load only default configuration
    pub fn load_defaults() -> FileConfig {
        FileConfig::default()
    }

    /// Parse configuration from a TOML string merged over defaults
    pub fn load_str(toml: &str) -> Result<FileConfig, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(FileConfig::default()))
            .merge(Toml::string(toml))
            .extract()
            .map_err(Box::new)
    }

    /// Get the global config file path
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("toolgate").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolgate_domain::tool::entities::HandlerConfig;

    #[test]
    fn test_load_defaults() {
        let config = ConfigLoader::load_defaults();
        assert!(config.tools.is_empty());
        assert_eq!(config.gateway.call_timeout_secs, 8);
    }

    #[test]
    fn test_load_str_merges_over_defaults() {
        let config = ConfigLoader::load_str(
            r#"
            [gateway]
            call_timeout_secs = 15

            [gateway.platforms.coze]
            token = "pat_test"

            [tools.weather]
            description = "Current weather"
            [tools.weather.handler]
            type = "http"
            url = "https://weather.example.com/v1/now"
            method = "GET"
            retry_count = 2

            [tools.digest]
            description = "Chained digest"
            [tools.digest.handler]
            type = "chain"
            tools = ["weather"]
            mode = "parallel"
            "#,
        )
        .unwrap();

        assert_eq!(config.gateway.call_timeout_secs, 15);
        // Untouched defaults survive the merge
        assert_eq!(config.gateway.sweep_interval_secs, 60);
        assert_eq!(config.gateway.platforms["coze"].token, "pat_test");

        let weather = &config.tools["weather"];
        match &weather.handler {
            HandlerConfig::Http(http) => {
                assert_eq!(http.method.as_deref(), Some("GET"));
                assert_eq!(http.retry_count, 2);
            }
            other => panic!("expected http handler, got {}", other.kind()),
        }
        assert!(matches!(
            config.tools["digest"].handler,
            HandlerConfig::Chain(_)
        ));
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_load_str_rejects_unknown_handler_type() {
        let result = ConfigLoader::load_str(
            r#"
            [tools.bad]
            [tools.bad.handler]
            type = "carrier-pigeon"
            "#,
        );
        assert!(result.is_err());
    }
}
