//! Link and slug translation subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound:   localized path ──► keywords.rs to_original ──► origin path
//!                               (unchanged? to_localized ──► 301 redirect)
//!
//! Outbound:  origin URL ──► keywords.rs to_localized
//!                       ──► builder.rs link(locale) ──► localized URL
//! ```
//!
//! # Design Decisions
//! - `url.rs` keeps every URL component verbatim so links round-trip
//! - No rule for a locale means "no link", never an error

pub mod builder;
pub mod keywords;
pub mod prefix;
pub mod url;

pub use builder::{LinkBuilder, LinkOptions};
pub use keywords::KeywordMap;
pub use prefix::LocalePrefix;
pub use url::ParsedUrl;
