//! The response side of the middleware.
//!
//! # Data Flow
//! ```text
//! eligible request ──► cache lookup (pages only)
//!     fresh hit ───────────────────────────────► cached page
//!     stale hit ──► cached page now, origin + render in background (CacheOnly)
//!     miss ───────► origin ──► Interceptor
//!                               ├─ PassThrough ─────────────► origin response
//!                               ├─ UrlSubstitution ─────────► rewritten body
//!                               └─ Render ──► render service ► translated page
//!                                                  └─ failure ► original page
//! ```
//!
//! # Design Decisions
//! - The client's `Accept-Encoding` is consumed here; the origin always
//!   answers uncompressed and gzip is only negotiated for render output
//! - Cache writes are fire-and-forget
//! - A render failure never yields an empty or error response

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use axum::body::Body;
use axum::extract::Request;
use axum::http::{header, response::Parts, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use regex::Regex;

use crate::cache::{gunzip, is_gzip, PageCache};
use crate::config::{GatewayConfig, SubDirConfig};
use crate::links::builder::LinkOptions;
use crate::locale::LocaleContext;
use crate::observability::metrics;
use crate::render::RenderClient;
use crate::rewrite::intercept::{set_content_language, Captured, Interceptor, Mode, Sink, State};
use crate::rewrite::policy::{self, Eligibility};
use crate::rewrite::substitute::{bump_lastmod, origin_hosts, Substitution};
use crate::site::snapshot::SiteSnapshot;

fn sitemap_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)sitemap").expect("valid regex"))
}

/// Per-request values the pipeline works with.
#[derive(Debug, Clone)]
struct RequestFacts {
    locale: String,
    /// Path and query in origin form; the cache key.
    cache_key: String,
    /// Absolute URL reported to the render service.
    page_url: String,
    host: String,
    accept_gzip: bool,
    substitution: bool,
}

#[derive(Clone)]
pub struct RewritePipeline {
    cache: PageCache,
    render: RenderClient,
    use_cache: bool,
    alt_host: Option<String>,
    max_body_bytes: usize,
    sub_dir: SubDirConfig,
    folders: BTreeMap<String, String>,
}

impl RewritePipeline {
    pub fn new(config: &GatewayConfig, cache: PageCache, render: RenderClient) -> Self {
        Self {
            cache,
            render,
            use_cache: config.seo.use_cache,
            alt_host: config.seo.alt_host.clone().filter(|h| !h.is_empty()),
            max_body_bytes: config.seo.max_body_bytes,
            sub_dir: config.sub_dir.clone(),
            folders: config.folders.clone(),
        }
    }

    pub fn cache(&self) -> &PageCache {
        &self.cache
    }

    pub fn render_client(&self) -> &RenderClient {
        &self.render
    }

    /// Run the request through the origin (`next`) and rewrite the response
    /// for `locale`.
    pub async fn handle(&self, snapshot: Arc<SiteSnapshot>, locale: &str, mut req: Request, next: Next) -> Response {
        let path_and_query = path_and_query(&req);
        let eligibility = policy::eligibility(req.headers(), &path_and_query);
        if eligibility == Eligibility::Ignored {
            metrics::record_rewrite_decision("ignored");
            return next.run(req).await;
        }

        if let Some(context) = req.extensions_mut().get_mut::<LocaleContext>() {
            context.proxied = true;
        }
        let accept_gzip = policy::accepts_gzip(req.headers());
        req.headers_mut().remove(header::ACCEPT_ENCODING);

        let facts = self.facts(&req, locale, path_and_query, accept_gzip, eligibility == Eligibility::MachineReadable);

        let mut cached = None;
        if self.use_cache && !facts.substitution {
            match self.cache.get(&facts.locale, &facts.cache_key).await {
                Some(page) => match cached_response(page.bytes, &facts.locale, facts.accept_gzip) {
                    Some(response) if page.fresh => {
                        metrics::record_cache_lookup("hit");
                        tracing::debug!(url = %facts.cache_key, locale = %facts.locale, "Serving fresh page from cache");
                        return response;
                    }
                    Some(response) => {
                        metrics::record_cache_lookup("stale");
                        cached = Some(response);
                    }
                    None => metrics::record_cache_lookup("corrupt"),
                },
                None => metrics::record_cache_lookup("miss"),
            }
        }

        if !self.render.health().is_healthy() && !facts.substitution {
            metrics::record_rewrite_decision("render_unhealthy");
            tracing::debug!(url = %facts.cache_key, "Render service unhealthy, skipping");
            return match cached {
                Some(response) => response,
                None => next.run(req).await,
            };
        }

        if let Some(response) = cached {
            tracing::debug!(url = %facts.cache_key, locale = %facts.locale, "Serving stale page, refreshing in background");
            let pipeline = self.clone();
            tokio::spawn(async move {
                pipeline.intercept(snapshot, facts, req, next, Sink::CacheOnly).await;
            });
            return response;
        }

        match self.intercept(snapshot, facts, req, next, Sink::Client).await {
            Some(response) => response,
            None => StatusCode::BAD_GATEWAY.into_response(),
        }
    }

    fn facts(&self, req: &Request, locale: &str, cache_key: String, accept_gzip: bool, substitution: bool) -> RequestFacts {
        let host = request_host(req);
        let page_url = match &self.alt_host {
            Some(alt_host) => format!("http://{}{}", alt_host, cache_key),
            None => {
                let proto = req
                    .headers()
                    .get("x-forwarded-proto")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("http");
                format!("{}://{}{}", proto, host, cache_key)
            }
        };
        RequestFacts {
            locale: locale.to_string(),
            cache_key,
            page_url,
            host,
            accept_gzip,
            substitution,
        }
    }

    async fn intercept(
        &self,
        snapshot: Arc<SiteSnapshot>,
        facts: RequestFacts,
        req: Request,
        next: Next,
        sink: Sink,
    ) -> Option<Response> {
        let response = next.run(req).await;
        let mut interceptor = Interceptor::new(facts.substitution, sink, self.max_body_bytes);
        let (head, body) = response.into_parts();

        let mode = match interceptor.inspect(&head) {
            State::Buffering(mode) => mode,
            _ => {
                metrics::record_rewrite_decision("pass_through");
                return interceptor.deliver(Response::from_parts(head, body));
            }
        };

        let original = match interceptor.capture(body).await {
            Captured::Complete(bytes) => bytes,
            Captured::Overflow(body) => {
                metrics::record_rewrite_decision("too_large");
                return interceptor.deliver(Response::from_parts(head, body));
            }
            Captured::Failed(e) => {
                metrics::record_rewrite_decision("body_error");
                tracing::warn!(url = %facts.cache_key, error = %e, "Failed to read origin response");
                return interceptor.deliver(StatusCode::BAD_GATEWAY.into_response());
            }
        };

        let response = match mode {
            Mode::UrlSubstitution => {
                metrics::record_rewrite_decision("url_substitution");
                let payload = self.substitute(&snapshot, &facts, &head, original);
                interceptor.flush(head, payload, &facts.locale, false)
            }
            Mode::Render => self.render_page(&facts, &mut interceptor, head, original).await,
        };
        interceptor.deliver(response)
    }

    fn substitute(&self, snapshot: &SiteSnapshot, facts: &RequestFacts, head: &Parts, original: Bytes) -> Bytes {
        let Ok(text) = std::str::from_utf8(&original) else {
            tracing::debug!(url = %facts.cache_key, "Body is not UTF-8, leaving untouched");
            return original;
        };

        let mut body = text.to_string();
        let is_xml = head
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("xml"));
        if let Some(modified) = snapshot.last_modified(&facts.locale) {
            if is_xml && sitemap_pattern().is_match(&facts.cache_key) {
                body = bump_lastmod(&body, modified);
            }
        }

        let meta = snapshot.meta();
        let hosts = origin_hosts(&facts.host, self.alt_host.as_deref(), meta, &facts.locale);
        let substitution = Substitution {
            locale: &facts.locale,
            original: &meta.original,
            builder: snapshot.link_builder(),
            options: LinkOptions {
                sub_dir: &self.sub_dir,
                folders: &self.folders,
                return_full: true,
            },
            keywords: snapshot.keywords(),
            origin_hosts: &hosts,
        };
        Bytes::from(substitution.apply(&body))
    }

    async fn render_page(&self, facts: &RequestFacts, interceptor: &mut Interceptor, head: Parts, original: Bytes) -> Response {
        if original.is_empty() {
            metrics::record_rewrite_decision("empty_html");
            return interceptor.flush(head, original, &facts.locale, false);
        }

        let html = String::from_utf8_lossy(&original);
        let payload = match self.render.render(&facts.page_url, &facts.locale, &html).await {
            Ok(payload) => payload,
            Err(e) => {
                metrics::record_rewrite_decision("render_fallback");
                tracing::warn!(url = %facts.page_url, locale = %facts.locale, error = %e, "Render failed, serving original HTML");
                return interceptor.flush(head, original, &facts.locale, false);
            }
        };
        metrics::record_rewrite_decision("rendered");

        if self.use_cache {
            let cache = self.cache.clone();
            let (locale, key, stored) = (facts.locale.clone(), facts.cache_key.clone(), payload.clone());
            tokio::spawn(async move {
                if let Err(e) = cache.put(&locale, &key, &stored).await {
                    tracing::warn!(url = %key, locale = %locale, error = %e, "Failed to write page cache");
                }
            });
        }

        if interceptor.sink() == Sink::CacheOnly {
            return interceptor.flush(head, Bytes::new(), &facts.locale, false);
        }

        let encoded = is_gzip(&payload);
        if encoded && !facts.accept_gzip {
            return match gunzip(&payload) {
                Ok(plain) => interceptor.flush(head, Bytes::from(plain), &facts.locale, false),
                Err(e) => {
                    tracing::warn!(url = %facts.page_url, error = %e, "Invalid gzip from render service, serving original HTML");
                    interceptor.flush(head, original, &facts.locale, false)
                }
            };
        }
        interceptor.flush(head, payload, &facts.locale, encoded)
    }
}

/// A cached page as a complete response; `None` when the entry is unusable.
fn cached_response(bytes: Bytes, locale: &str, accept_gzip: bool) -> Option<Response> {
    let encoded = is_gzip(&bytes);
    let (payload, gzip) = if encoded && !accept_gzip {
        match gunzip(&bytes) {
            Ok(plain) => (Bytes::from(plain), false),
            Err(e) => {
                tracing::warn!(error = %e, "Corrupt gzip entry in page cache");
                return None;
            }
        }
    } else {
        (bytes, encoded)
    };

    let mut response = Response::new(Body::from(payload.clone()));
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(payload.len()));
    if gzip {
        headers.insert(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));
    }
    set_content_language(headers, locale);
    Some(response)
}

fn path_and_query(req: &Request) -> String {
    req.uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string())
}

fn request_host(req: &Request) -> String {
    req.headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| req.uri().authority().map(|a| a.to_string()))
        .unwrap_or_default()
}
