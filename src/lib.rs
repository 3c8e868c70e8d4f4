//! Locale gateway library: locale resolution, URL/slug translation and
//! crawler-facing response rewriting in front of a single origin.

pub mod cache;
pub mod config;
pub mod gateway;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod links;
pub mod locale;
pub mod observability;
pub mod plugins;
pub mod render;
pub mod resilience;
pub mod rewrite;
pub mod site;

pub use config::schema::GatewayConfig;
pub use gateway::Gateway;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use locale::LocaleContext;
pub use plugins::HandlerRegistry;
pub use site::PageLocals;
