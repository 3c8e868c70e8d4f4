//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("HTTP client setup failed: {0}")]
    HttpClient(#[from] reqwest::Error),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<GatewayConfig, ConfigError> {
    let config: GatewayConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config() {
        let config = parse_config(
            r#"
            [site]
            site_id = "5af975a0d747572ef39eb049"
            "#,
        )
        .unwrap();

        assert_eq!(config.site.site_id, "5af975a0d747572ef39eb049");
        assert_eq!(config.site.locale_cookie, "locale");
        assert_eq!(config.metadata.max_retries, 10);
        assert_eq!(config.render.health_interval_secs, 60);
        assert_eq!(config.seo.cache_days, 1);
        assert!(config.bootstrap.is_none());
    }

    #[test]
    fn test_missing_site_id_is_fatal() {
        let err = parse_config("[listener]\nbind_address = \"127.0.0.1:9000\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("site_id"));
    }

    #[test]
    fn test_bootstrap_section() {
        let config = parse_config(
            r#"
            [site]
            site_id = "abc"

            [folders]
            espanol = "es"

            [bootstrap]
            snippet = "<script src=\"//cdn.example.com/s.js\"></script>"

            [bootstrap.meta]
            localeDetection = "subdir"
            original = "en"
            default = "en"
            localeKeys = ["es", "fr"]

            [bootstrap.keywords.about]
            es = "sobre"
            "#,
        )
        .unwrap();

        let data = config.bootstrap.unwrap();
        assert_eq!(data.meta.locale_keys, vec!["es", "fr"]);
        assert_eq!(data.keywords["about"]["es"], "sobre");
        assert_eq!(config.folders["espanol"], "es");
    }

    #[test]
    fn test_parse_error() {
        let err = parse_config("[site\nsite_id=").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
