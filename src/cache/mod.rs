//! Rendered page cache.
//!
//! # Layout
//! ```text
//! {cache_dir}/{locale}/{md5(path + query)}
//! ```
//!
//! # Design Decisions
//! - Freshness is the file's modification time plus the configured TTL
//! - A stale entry is still returned; the caller decides to serve and refresh
//! - Locale directories are created on first write
//! - Payloads are stored exactly as the render service returned them,
//!   gzip included

pub mod page;

pub use page::{gunzip, is_gzip, CacheError, CachedPage, PageCache};
