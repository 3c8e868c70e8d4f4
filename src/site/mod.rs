//! Site metadata subsystem.
//!
//! # Data Flow
//! ```text
//! Start-up:
//!     store.rs load()
//!     → cache file valid? ── yes ──► snapshot (background refresh if stale)
//!     → no: client.rs fetch (bounded retries) → persist → snapshot
//!
//! Refresh signal:
//!     store.rs refresh() → client.rs fetch → persist → snapshot
//!
//! Requests:
//!     store.snapshot() → Arc<SiteSnapshot> held for the whole request
//! ```

pub mod client;
pub mod meta;
pub mod snapshot;
pub mod snippet;
pub mod store;

pub use client::{FetchError, MetadataClient};
pub use meta::{LocaleDetection, SiteData, SiteMeta};
pub use snapshot::{SiteSnapshot, SnapshotOptions};
pub use snippet::{PageLocals, Snippet};
pub use store::MetadataStore;
