//! Process-wide holder of the current site metadata.
//!
//! # Responsibilities
//! - Load metadata from the local cache file, falling back to the API
//! - Retry API fetches with fixed spacing, then persist the payload
//! - Refresh in the background when the cache file is stale
//! - Swap in a new snapshot atomically on every successful fetch
//!
//! # Design Decisions
//! - Snapshots are replaced by reference (`ArcSwapOption`); readers never
//!   observe a half-updated version
//! - A corrupt cache file or one written for another site is a cache miss
//! - Cache file writes are best-effort; failures are logged only

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;

use crate::config::{GatewayConfig, SubDirConfig};
use crate::observability::metrics;
use crate::plugins::HandlerRegistry;
use crate::resilience::{with_retry, RetryPolicy};
use crate::site::client::{FetchError, MetadataClient};
use crate::site::meta::SiteData;
use crate::site::snapshot::{SiteSnapshot, SnapshotOptions};

pub struct MetadataStore {
    current: ArcSwapOption<SiteSnapshot>,
    client: MetadataClient,
    site_id: String,
    cache_file: PathBuf,
    retry: RetryPolicy,
    stale_after: Duration,
    sub_dir: SubDirConfig,
    folders: BTreeMap<String, String>,
    registry: HandlerRegistry,
}

impl MetadataStore {
    pub fn new(config: &GatewayConfig, registry: HandlerRegistry) -> Result<Self, reqwest::Error> {
        let site_id = config.site.site_id.clone();
        let metadata = &config.metadata;
        Ok(Self {
            current: ArcSwapOption::empty(),
            client: MetadataClient::new(metadata, &site_id)?,
            cache_file: metadata.cache_dir.join(format!("snippet.{}", site_id)),
            retry: RetryPolicy::fixed(metadata.max_retries, Duration::from_millis(metadata.retry_delay_ms)),
            stale_after: Duration::from_secs(metadata.stale_after_secs),
            sub_dir: config.sub_dir.clone(),
            folders: config.folders.clone(),
            registry,
            site_id,
        })
    }

    /// The current snapshot, if any metadata has been loaded.
    pub fn snapshot(&self) -> Option<Arc<SiteSnapshot>> {
        self.current.load_full()
    }

    pub fn is_loaded(&self) -> bool {
        self.current.load().is_some()
    }

    pub fn cache_file(&self) -> &Path {
        &self.cache_file
    }

    /// Build a snapshot from `data` and make it current.
    pub fn install(&self, data: SiteData) -> Arc<SiteSnapshot> {
        let options = SnapshotOptions {
            sub_dir: &self.sub_dir,
            folders: &self.folders,
            registry: &self.registry,
        };
        let snapshot = Arc::new(SiteSnapshot::build(data, options));
        self.current.store(Some(Arc::clone(&snapshot)));
        snapshot
    }

    /// Load from the cache file, or fetch with retries when it is unusable.
    ///
    /// A stale but valid cache file is used immediately and refreshed in the
    /// background.
    pub async fn load(self: &Arc<Self>) -> Result<Arc<SiteSnapshot>, FetchError> {
        let Some(data) = self.read_cache().await else {
            tracing::info!(site_id = %self.site_id, "No usable metadata cache, fetching");
            return self.fetch_with(&self.retry).await;
        };

        let snapshot = self.install(data);
        tracing::info!(site_id = %self.site_id, path = %self.cache_file.display(), "Metadata loaded from cache");

        if self.cache_is_stale().await {
            tracing::info!(site_id = %self.site_id, "Metadata cache is stale, refreshing in background");
            let store = Arc::clone(self);
            tokio::spawn(async move {
                if let Err(e) = store.fetch_with(&store.retry).await {
                    tracing::warn!(error = %e, "Background metadata refresh failed");
                }
            });
        }
        Ok(snapshot)
    }

    /// Fetch once, unconditionally, and replace the current metadata.
    pub async fn refresh(&self) -> Result<Arc<SiteSnapshot>, FetchError> {
        self.fetch_with(&RetryPolicy::once()).await
    }

    async fn fetch_with(&self, policy: &RetryPolicy) -> Result<Arc<SiteSnapshot>, FetchError> {
        let result = with_retry(policy, "metadata_fetch", || self.client.fetch()).await;
        let mut data = match result {
            Ok(data) => data,
            Err(e) => {
                metrics::record_metadata_refresh("failure");
                return Err(e);
            }
        };
        metrics::record_metadata_refresh("success");

        data.id = Some(self.site_id.clone());
        self.persist(&data).await;

        let snapshot = self.install(data);
        tracing::info!(
            site_id = %self.site_id,
            locales = ?snapshot.meta().all_locales(),
            detection = snapshot.meta().locale_detection.as_str(),
            "Metadata refreshed"
        );
        Ok(snapshot)
    }

    async fn read_cache(&self) -> Option<SiteData> {
        let raw = match tokio::fs::read(&self.cache_file).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::debug!(path = %self.cache_file.display(), error = %e, "Metadata cache not readable");
                return None;
            }
        };
        let data: SiteData = match serde_json::from_slice(&raw) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(path = %self.cache_file.display(), error = %e, "Metadata cache is corrupt");
                return None;
            }
        };
        if data.id.as_deref() != Some(self.site_id.as_str()) || data.error.is_some() {
            tracing::info!(path = %self.cache_file.display(), "Metadata cache belongs to another site");
            return None;
        }
        Some(data)
    }

    async fn cache_is_stale(&self) -> bool {
        let modified = match tokio::fs::metadata(&self.cache_file).await.and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(_) => return false,
        };
        modified
            .elapsed()
            .map(|age| age >= self.stale_after)
            .unwrap_or(false)
    }

    async fn persist(&self, data: &SiteData) {
        let bytes = match serde_json::to_vec(data) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize metadata");
                return;
            }
        };
        if let Err(e) = tokio::fs::write(&self.cache_file, bytes).await {
            tracing::error!(path = %self.cache_file.display(), error = %e, "Failed to write metadata cache");
        }
    }
}

impl std::fmt::Debug for MetadataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataStore")
            .field("site_id", &self.site_id)
            .field("cache_file", &self.cache_file)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
