//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate endpoints parse as absolute URLs
//! - Validate value ranges (intervals and timeouts > 0)
//! - Keep the render timeout inside the request timeout
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.site.site_id.trim().is_empty() {
        errors.push(ValidationError::new("site.site_id", "a site identifier is required"));
    }

    for (field, endpoint) in [
        ("metadata.endpoint", &config.metadata.endpoint),
        ("render.endpoint", &config.render.endpoint),
    ] {
        if let Err(e) = url::Url::parse(endpoint) {
            errors.push(ValidationError::new(field, format!("invalid URL '{}': {}", endpoint, e)));
        }
    }

    if let Some(root) = &config.site.root_url {
        if url::Url::parse(root).is_err() {
            errors.push(ValidationError::new("site.root_url", format!("invalid URL '{}'", root)));
        }
    }

    if !config.sub_dir.base.is_empty() && !config.sub_dir.base.starts_with('/') {
        errors.push(ValidationError::new("sub_dir.base", "must start with '/'"));
    }

    if !config.site.refresh_path.starts_with('/') {
        errors.push(ValidationError::new("site.refresh_path", "must start with '/'"));
    }

    let positives = [
        ("render.health_interval_secs", config.render.health_interval_secs),
        ("render.health_timeout_secs", config.render.health_timeout_secs),
        ("render.timeout_secs", config.render.timeout_secs),
        ("metadata.timeout_secs", config.metadata.timeout_secs),
        ("timeouts.request_secs", config.timeouts.request_secs),
    ];
    for (field, value) in positives {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than zero"));
        }
    }

    // The request timeout must leave room for the render fallback.
    if config.render.timeout_secs >= config.timeouts.request_secs {
        errors.push(ValidationError::new(
            "render.timeout_secs",
            format!(
                "must be shorter than timeouts.request_secs ({})",
                config.timeouts.request_secs
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
