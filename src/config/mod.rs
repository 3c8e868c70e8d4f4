//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; site metadata is what changes at runtime
//! - All fields have defaults to allow minimal configs, except the site id
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use validation::{validate_config, ValidationError};
pub use schema::GatewayConfig;
pub use schema::{
    ListenerConfig, MetadataConfig, ObservabilityConfig, OriginConfig, RenderConfig, SeoConfig,
    SiteConfig, SubDirConfig, TimeoutConfig,
};
