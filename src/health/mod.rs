//! Render service health subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Periodic timer
//!     → GET check against the render endpoint
//!     → Update state.rs
//!
//! State (state.rs):
//!     Healthy ←→ Unhealthy, observable by the rewrite pipeline
//! ```
//!
//! # Design Decisions
//! - The service is assumed healthy until the first check says otherwise
//! - Requests read the flag; they never wait on a check
//! - The monitor and the metadata refresh are independent timers

pub mod active;
pub mod state;

pub use active::HealthMonitor;
pub use state::RenderHealth;
