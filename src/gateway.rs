//! The locale gateway: everything a running instance shares.
//!
//! # Responsibilities
//! - Own the metadata store, page cache, render client and health flag
//! - Bootstrap site metadata at start-up
//! - Expose link building, alternate tags and cache purging to embedders
//! - Mount the locale middleware in front of an origin router
//!
//! # Design Decisions
//! - Cheap to clone; all shared state sits behind `Arc`
//! - Configuration errors are fatal here, per-request failures never are

use std::sync::Arc;

use axum::middleware::from_fn_with_state;
use axum::Router;
use tower::Layer;

use crate::cache::{CacheError, PageCache};
use crate::config::{validate_config, ConfigError, GatewayConfig};
use crate::health::{HealthMonitor, RenderHealth};
use crate::http::middleware::locale_middleware;
use crate::links::builder::LinkOptions;
use crate::links::url::ParsedUrl;
use crate::plugins::HandlerRegistry;
use crate::render::RenderClient;
use crate::rewrite::RewritePipeline;
use crate::site::{FetchError, MetadataStore, SiteSnapshot};

#[derive(Clone)]
pub struct Gateway {
    config: Arc<GatewayConfig>,
    store: Arc<MetadataStore>,
    pipeline: RewritePipeline,
    health: RenderHealth,
}

impl Gateway {
    /// Build a gateway. Nothing is loaded yet; see [`Gateway::bootstrap`].
    pub fn new(config: GatewayConfig, registry: HandlerRegistry) -> Result<Self, ConfigError> {
        validate_config(&config).map_err(ConfigError::Validation)?;

        let site_id = config.site.site_id.clone();
        let health = RenderHealth::new();
        let store = Arc::new(MetadataStore::new(&config, registry)?);
        let cache = PageCache::with_days(config.seo.cache_dir.clone(), config.seo.cache_days);
        let render = RenderClient::new(&config.render, &site_id, &config.sub_dir, health.clone())?;
        let pipeline = RewritePipeline::new(&config, cache, render);

        Ok(Self {
            config: Arc::new(config),
            store,
            pipeline,
            health,
        })
    }

    /// Seed the metadata: from the inline bootstrap data when configured,
    /// otherwise from the cache file or the metadata API.
    pub async fn bootstrap(&self) -> Result<Arc<SiteSnapshot>, FetchError> {
        if let Some(data) = self.config.bootstrap.clone() {
            tracing::info!(site_id = %self.config.site.site_id, "Metadata seeded from configuration");
            return Ok(self.store.install(data));
        }
        self.store.load().await
    }

    /// Run [`Gateway::bootstrap`] in the background. Until it finishes the
    /// middleware serves requests with "not loaded" locals.
    pub fn spawn_bootstrap(&self) -> tokio::task::JoinHandle<bool> {
        let gateway = self.clone();
        tokio::spawn(async move {
            match gateway.bootstrap().await {
                Ok(_) => true,
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        "Site metadata unavailable; serving pages untranslated until a refresh succeeds"
                    );
                    false
                }
            }
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<MetadataStore> {
        &self.store
    }

    pub fn pipeline(&self) -> &RewritePipeline {
        &self.pipeline
    }

    pub fn health(&self) -> &RenderHealth {
        &self.health
    }

    pub fn snapshot(&self) -> Option<Arc<SiteSnapshot>> {
        self.store.snapshot()
    }

    /// Fetch the metadata once and swap it in.
    pub async fn refresh(&self) -> Result<Arc<SiteSnapshot>, FetchError> {
        self.store.refresh().await
    }

    /// Remove every cached page.
    pub async fn purge_cache(&self) -> Result<(), CacheError> {
        tracing::info!("Purging page cache");
        self.pipeline.cache().purge_all().await
    }

    /// Remove one cached page; a missing entry is not an error.
    pub async fn purge_url(&self, url: &str, locale: &str) -> Result<(), CacheError> {
        tracing::info!(url = %url, locale = %locale, "Purging cached page");
        self.pipeline.cache().purge_url(url, locale).await
    }

    fn link_options(&self, return_full: bool) -> LinkOptions<'_> {
        LinkOptions {
            sub_dir: &self.config.sub_dir,
            folders: &self.config.folders,
            return_full,
        }
    }

    /// The equivalent of `url` in `locale`; `None` before metadata is loaded
    /// or when no rule applies.
    pub fn link(&self, locale: &str, url: &str, from_locale: Option<&str>) -> Option<String> {
        let snapshot = self.snapshot()?;
        let parsed = ParsedUrl::parse(url);
        snapshot
            .link_builder()
            .link(locale, &parsed, &self.link_options(true), from_locale)
    }

    /// `<link rel="alternate">` tags for every locale except `locale`.
    pub fn alt_tags(&self, url: &str, locale: &str) -> String {
        match self.snapshot() {
            Some(snapshot) => snapshot
                .link_builder()
                .alternate_tags(url, locale, &self.link_options(false)),
            None => String::new(),
        }
    }

    /// A monitor for the render service, sharing this gateway's health flag.
    pub fn health_monitor(&self) -> HealthMonitor {
        HealthMonitor::new(self.health.clone(), &self.config.render)
    }

    /// Wrap `origin` with the locale middleware. The middleware sits outside
    /// the router: path rewrites must happen before routing.
    pub fn router(&self, origin: Router) -> Router {
        let service = from_fn_with_state(self.clone(), locale_middleware).layer(origin);
        Router::new().fallback_service(service)
    }
}
