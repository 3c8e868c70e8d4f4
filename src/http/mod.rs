//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request id, tracing, timeout)
//!     → middleware/locale.rs (locale, path rewrite, page locals)
//!     → rewrite pipeline (crawlers, sitemaps)
//!     → server.rs forward (origin application)
//!     → Send to client
//! ```

pub mod middleware;
pub mod request;
pub mod server;

pub use middleware::locale_middleware;
pub use request::{RequestIdExt, UuidRequestId, X_REQUEST_ID};
pub use server::HttpServer;
