//! Locale resolution subsystem.
//!
//! # Data Flow
//! ```text
//! Request headers ──► signals (cookie, Accept-Language)
//!                           │
//! Request URL ───────► resolver (strategy from site metadata) ──► locale
//!                           ▲
//!             forced locale / locale header override everything
//! ```
//!
//! # Design Decisions
//! - Resolution is a pure function of the URL, the hints and one metadata
//!   snapshot; no I/O and no shared state
//! - The forced locale and the locale header are applied by the middleware
//!   before the resolver is consulted

pub mod context;
pub mod resolver;
pub mod signals;

pub use context::LocaleContext;
pub use resolver::{CustomPatterns, LocaleHints, LocaleResolver};
pub use signals::{cookie_value, locale_from_accept_language, locale_from_cookie};
