//! Render service client.
//!
//! The render service receives original HTML and returns it translated.
//! Calls are gated by the shared health flag and never retried; every
//! failure makes the pipeline fall back to the original HTML.

pub mod client;

pub use client::{RenderClient, RenderError};
