//! Render service health flag.
//!
//! # States
//! - Healthy: translated HTML is requested from the render service
//! - Unhealthy: HTML rendering is skipped; URL substitution still runs
//!
//! # Design Decisions
//! - Backed by a `watch` channel so tasks can await transitions
//! - Only transitions are logged and exported

use std::sync::Arc;

use tokio::sync::watch;

use crate::observability::metrics;

/// Shared, observable health of the render service.
#[derive(Debug, Clone)]
pub struct RenderHealth {
    tx: Arc<watch::Sender<bool>>,
}

impl RenderHealth {
    /// A new flag, initially healthy.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(true);
        Self { tx: Arc::new(tx) }
    }

    pub fn is_healthy(&self) -> bool {
        *self.tx.borrow()
    }

    /// Record a check result.
    pub fn set(&self, healthy: bool) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == healthy {
                false
            } else {
                *current = healthy;
                true
            }
        });
        if changed {
            if healthy {
                tracing::info!("Render service is healthy again");
            } else {
                tracing::warn!("Render service marked unhealthy");
            }
            metrics::set_render_healthy(healthy);
        }
    }

    /// Receiver notified on every transition.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for RenderHealth {
    fn default() -> Self {
        Self::new()
    }
}
