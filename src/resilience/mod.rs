//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Metadata fetch fails:
//!     → retries.rs (bounded attempts)
//!     → backoff.rs (delay before the next attempt, with jitter)
//! ```
//!
//! # Design Decisions
//! - Every remote call carries its own timeout at the client level
//! - Attempts are bounded by count, with no overall deadline
//! - The render call is never retried; its failure falls back to original HTML

pub mod backoff;
pub mod retries;

pub use backoff::calculate_backoff;
pub use retries::{with_retry, RetryPolicy};
