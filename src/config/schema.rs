//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::site::meta::SiteData;

/// Root configuration for the locale gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// The single origin application requests are forwarded to.
    pub origin: OriginConfig,

    /// Timeout configuration for inbound requests.
    pub timeouts: TimeoutConfig,

    /// Site identity and locale detection options.
    pub site: SiteConfig,

    /// Sub-directory locale mode.
    pub sub_dir: SubDirConfig,

    /// Folder-name aliases, folder → locale code.
    pub folders: BTreeMap<String, String>,

    /// Crawler rendering and page cache.
    pub seo: SeoConfig,

    /// Remote site metadata API.
    pub metadata: MetadataConfig,

    /// Remote HTML render service.
    pub render: RenderConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Inline site data; when present no metadata load happens at start-up.
    pub bootstrap: Option<SiteData>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Origin application address.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OriginConfig {
    /// Origin address (e.g., "127.0.0.1:3000").
    pub address: String,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:3000".to_string(),
        }
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 60 }
    }
}

/// Site identity and request-level locale options.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Site identifier at the metadata and render services. Required.
    pub site_id: String,

    /// Canonical root URL used when building alternate links.
    pub root_url: Option<String>,

    /// Explicit locale used by the sub-directory and custom fallbacks.
    pub locale: Option<String>,

    /// Locale forced on every request, bypassing detection.
    pub force_locale: Option<String>,

    /// Request header that forces a locale.
    pub locale_header: String,

    /// Cookie holding the visitor's chosen locale.
    pub locale_cookie: String,

    /// Hosts are pipe-encoded by an upstream translation proxy.
    pub translation_proxy: bool,

    /// Reserved path that triggers a metadata refresh (POST).
    pub refresh_path: String,

    /// Reserved header that triggers a metadata refresh.
    pub refresh_header: String,

    /// Header echoing the site id on handled responses.
    pub site_id_header: String,

    /// Bearer key for the purge endpoint; purging is refused without one.
    pub purge_key: Option<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            site_id: String::new(),
            root_url: None,
            locale: None,
            force_locale: None,
            locale_header: "x-locale".to_string(),
            locale_cookie: "locale".to_string(),
            translation_proxy: false,
            refresh_path: "/_locale_callback".to_string(),
            refresh_header: "x-locale-refresh".to_string(),
            site_id_header: "x-site-id".to_string(),
            purge_key: None,
        }
    }
}

/// Sub-directory locale mode (`/es/about`).
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct SubDirConfig {
    pub enabled: bool,

    /// Path the locale segment lives under (e.g. "/shop").
    pub base: String,

    /// The base is omitted for the original locale.
    pub optional: bool,
}

/// Crawler rendering and page cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SeoConfig {
    /// Enable the response rewrite pipeline.
    pub enabled: bool,

    /// Serve and store rendered pages on disk.
    pub use_cache: bool,

    /// Root of the locale-partitioned page cache.
    pub cache_dir: PathBuf,

    /// Days a cached page stays fresh.
    pub cache_days: u64,

    /// Alternate host treated as the origin (render URL and URL substitution).
    pub alt_host: Option<String>,

    /// Bodies larger than this are streamed through untouched.
    pub max_body_bytes: usize,
}

impl Default for SeoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            use_cache: true,
            cache_dir: std::env::temp_dir().join("locale-proxy-cache"),
            cache_days: 1,
            alt_host: None,
            max_body_bytes: 8 * 1024 * 1024,
        }
    }
}

/// Remote site metadata API.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// Base endpoint; the site id is appended as a path segment.
    pub endpoint: String,

    /// Channel reported to the metadata API.
    pub channel_id: String,

    /// Directory holding the `snippet.{site_id}` cache file.
    pub cache_dir: PathBuf,

    /// Retries after the first failed fetch.
    pub max_retries: u32,

    /// Delay between fetch attempts in milliseconds.
    pub retry_delay_ms: u64,

    /// Age after which a cached file triggers a background refresh.
    pub stale_after_secs: u64,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:7070/api/v1/site".to_string(),
            channel_id: "rust".to_string(),
            cache_dir: std::env::temp_dir(),
            max_retries: 10,
            retry_delay_ms: 5000,
            stale_after_secs: 4 * 60 * 60,
            timeout_secs: 10,
        }
    }
}

/// Remote render service.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Render endpoint; also checked by the health monitor.
    pub endpoint: String,

    /// Render request timeout in seconds.
    pub timeout_secs: u64,

    /// Health check interval in seconds.
    pub health_interval_secs: u64,

    /// Health check timeout in seconds.
    pub health_timeout_secs: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:7071/api/engine/seo".to_string(),
            timeout_secs: 40,
            health_interval_secs: 60,
            health_timeout_secs: 10,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
