//! Response rewrite subsystem.
//!
//! # Data Flow
//! ```text
//! request ──► policy.rs (crawler? asset? sitemap/robots?)
//!                 │
//!                 ▼
//!           pipeline.rs ──► page cache / render health
//!                 │
//!                 ▼
//!           intercept.rs (inspect head → pass through or buffer)
//!                 │
//!        ┌────────┴─────────┐
//!        ▼                  ▼
//!  substitute.rs       render service
//!  (URLs, lastmod)     (translated HTML)
//! ```

pub mod intercept;
pub mod pipeline;
pub mod policy;
pub mod substitute;

pub use intercept::{Captured, Interceptor, Mode, Sink, State};
pub use pipeline::RewritePipeline;
pub use policy::Eligibility;
pub use substitute::{bump_lastmod, origin_hosts, Substitution};
