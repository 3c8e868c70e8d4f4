//! Locale middleware.
//!
//! # Responsibilities
//! - Answer the refresh callback and the key-protected purge endpoint
//! - Resolve the request's locale
//! - Rewrite the request to its origin form, or redirect to the localized one
//! - Attach `LocaleContext` and `PageLocals` for the origin
//! - Hand translated pages to the rewrite pipeline
//!
//! # Data Flow
//! ```text
//! request
//!   → refresh / purge? ──────────────────────────► 200 "OK"
//!   → metadata loaded? ── no ──► OFF locals ─────► origin
//!   → forced locale / locale header / resolver
//!   → strip sub-directory segment
//!   → keywords: to_original ─► rewrite path
//!               to_localized ► 301 (GET only)
//!   → rewrite handler: same, through links
//!   → locals ─► original locale or SEO off ──────► origin
//!            └► rewrite pipeline ────────────────► origin
//! ```

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::cache::CacheError;
use crate::gateway::Gateway;
use crate::links::builder::LinkOptions;
use crate::links::prefix::LocalePrefix;
use crate::links::url::ParsedUrl;
use crate::locale::{
    cookie_value, locale_from_accept_language, locale_from_cookie, LocaleContext, LocaleHints, LocaleResolver,
};
use crate::observability::metrics;
use crate::site::meta::LocaleDetection;
use crate::site::{PageLocals, SiteSnapshot};

/// Entry point, mounted with `axum::middleware::from_fn_with_state`.
pub async fn locale_middleware(State(gateway): State<Gateway>, req: Request, next: Next) -> Response {
    let site = &gateway.config().site;

    if is_refresh(&gateway, &req) {
        tracing::info!(path = %req.uri().path(), "Refresh signal received");
        let refresher = gateway.clone();
        tokio::spawn(async move {
            if let Err(e) = refresher.refresh().await {
                tracing::warn!(error = %e, "Metadata refresh failed");
            }
        });
        return (StatusCode::OK, "OK").into_response();
    }

    if req.method() == Method::POST && req.uri().path() == format!("{}/purge", site.refresh_path) {
        if !purge_authorized(site.purge_key.as_deref(), &req) {
            tracing::warn!("Unauthorized purge request");
            return StatusCode::UNAUTHORIZED.into_response();
        }
        return purge(&gateway, req.uri()).await;
    }

    let mut response = handle(&gateway, req, next).await;
    if let (Ok(name), Ok(value)) = (
        HeaderName::from_bytes(site.site_id_header.as_bytes()),
        HeaderValue::from_str(&site.site_id),
    ) {
        response.headers_mut().insert(name, value);
    }
    response
}

fn is_refresh(gateway: &Gateway, req: &Request) -> bool {
    let site = &gateway.config().site;
    (req.method() == Method::POST && req.uri().path() == site.refresh_path)
        || req
            .headers()
            .get(site.refresh_header.as_str())
            .is_some_and(|v| !v.is_empty())
}

fn purge_authorized(key: Option<&str>, req: &Request) -> bool {
    let Some(key) = key.filter(|k| !k.is_empty()) else {
        return false;
    };
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|given| given == key)
}

async fn purge(gateway: &Gateway, uri: &Uri) -> Response {
    let parsed = ParsedUrl::parse(&uri.to_string());
    let result = match (parsed.query_param("url"), parsed.query_param("locale")) {
        (Some(url), Some(locale)) => gateway.purge_url(&url, &locale).await,
        _ => gateway.purge_cache().await,
    };
    match result {
        Ok(()) => (StatusCode::OK, "OK").into_response(),
        Err(CacheError::InvalidLocale(locale)) => {
            tracing::warn!(locale = %locale, "Purge rejected");
            (StatusCode::BAD_REQUEST, "Invalid locale").into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Cache purge failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Purge failed").into_response()
        }
    }
}

async fn handle(gateway: &Gateway, mut req: Request, next: Next) -> Response {
    let Some(snapshot) = gateway.snapshot() else {
        tracing::debug!(path = %req.uri().path(), "Metadata not loaded yet");
        req.extensions_mut().insert(LocaleContext::new(""));
        req.extensions_mut().insert(PageLocals::not_loaded());
        return next.run(req).await;
    };

    let config = gateway.config();
    let locale = resolve_locale(gateway, &snapshot, &req);
    req.extensions_mut().insert(LocaleContext::new(locale.clone()));
    metrics::record_locale(&locale);

    if config.sub_dir.enabled {
        let path = req.uri().path();
        let stripped = strip_locale_segment(snapshot.prefix(), &config.sub_dir.base, path);
        if stripped != path {
            let target = match req.uri().query() {
                Some(query) => format!("{}?{}", stripped, query),
                None => stripped,
            };
            set_path_and_query(&mut req, &target);
        }
    }

    let keywords = snapshot.keywords();
    if keywords.has_locale(&locale) {
        let current = path_and_query(req.uri());
        if let Some(original) = keywords.to_original(&current, &locale) {
            tracing::debug!(from = %current, to = %original, locale = %locale, "Translated path to original");
            set_path_and_query(&mut req, &original);
        } else if req.method() == Method::GET {
            if let Some(translated) = keywords.to_localized(&current, &locale) {
                // `current` lost its locale segment above; put it back.
                let location = if config.sub_dir.enabled {
                    let options = LinkOptions {
                        sub_dir: &config.sub_dir,
                        folders: &config.folders,
                        return_full: false,
                    };
                    snapshot
                        .link_builder()
                        .link(&locale, &ParsedUrl::parse(&translated), &options, None)
                        .unwrap_or(translated)
                } else {
                    translated
                };
                return redirect(&location);
            }
        }
    }

    if snapshot.rewrite_handler().is_some() {
        let current = path_and_query(req.uri());
        let parsed = ParsedUrl::parse(&current);
        let builder = snapshot.link_builder();
        let options = LinkOptions {
            sub_dir: &config.sub_dir,
            folders: &config.folders,
            return_full: false,
        };
        let original = snapshot.meta().original.as_str();
        match builder.link(original, &parsed, &options, Some(&locale)) {
            Some(rewritten) if rewritten != current => set_path_and_query(&mut req, &rewritten),
            _ if req.method() == Method::GET => {
                if let Some(translated) = builder
                    .link(&locale, &parsed, &options, Some(original))
                    .filter(|t| *t != current)
                {
                    return redirect(&translated);
                }
            }
            _ => {}
        }
    }

    let locals = page_locals(gateway, &snapshot, &locale, &path_and_query(req.uri()));
    req.extensions_mut().insert(locals);

    if !config.seo.enabled {
        return next.run(req).await;
    }
    if locale == snapshot.meta().original {
        tracing::debug!(path = %req.uri().path(), "Original locale, not rewriting");
        return next.run(req).await;
    }
    if !snapshot.meta().supports(&locale) {
        tracing::debug!(path = %req.uri().path(), locale = %locale, "Unsupported locale, not rewriting");
        metrics::record_rewrite_decision("unsupported_locale");
        return next.run(req).await;
    }
    gateway.pipeline().handle(snapshot, &locale, req, next).await
}

/// Forced locale, then the locale header, then the site's detection strategy.
fn resolve_locale(gateway: &Gateway, snapshot: &Arc<SiteSnapshot>, req: &Request) -> String {
    let config = gateway.config();
    let site = &config.site;

    if let Some(forced) = site.force_locale.as_deref().filter(|l| !l.is_empty()) {
        return forced.to_string();
    }
    if let Some(from_header) = req
        .headers()
        .get(site.locale_header.as_str())
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
    {
        return from_header.to_string();
    }

    let meta = snapshot.meta();
    let mode = if config.sub_dir.enabled {
        LocaleDetection::Subdir
    } else {
        meta.locale_detection
    };

    let cookie = locale_from_cookie(
        cookie_value(req.headers(), &site.locale_cookie).as_deref(),
        &meta.all_locales(),
    );
    let detected = if meta.auto_detect {
        locale_from_accept_language(req.headers())
    } else {
        String::new()
    };
    let hints = LocaleHints {
        cookie: &cookie,
        detected: &detected,
        explicit: site.locale.as_deref(),
    };

    let resolver = LocaleResolver {
        meta,
        prefix: snapshot.prefix(),
        custom: snapshot.custom_patterns(),
        folders: &config.folders,
        sub_dir_base: &config.sub_dir.base,
        translation_proxy: site.translation_proxy,
        handler: snapshot.locale_handler(),
    };
    let url = ParsedUrl::parse(&request_href(req));
    resolver.resolve(&url, mode, hints).unwrap_or_default()
}

fn page_locals(gateway: &Gateway, snapshot: &SiteSnapshot, locale: &str, current: &str) -> PageLocals {
    let config = gateway.config();
    let full_url = match config.site.root_url.as_deref().map(ParsedUrl::parse) {
        Some(root) => format!(
            "{}://{}{}",
            root.scheme.as_deref().unwrap_or("http"),
            root.hostname().unwrap_or_default(),
            current
        ),
        None => current.to_string(),
    };
    let options = LinkOptions {
        sub_dir: &config.sub_dir,
        folders: &config.folders,
        return_full: true,
    };
    let alt_tags = snapshot.link_builder().alternate_tags(&full_url, locale, &options);
    let snippet = snapshot.snippet().for_locale(locale, &snapshot.meta().original);
    PageLocals::loaded(locale, snippet, &alt_tags)
}

/// Remove the locale or folder segment that follows the base; the base stays.
fn strip_locale_segment(prefix: &LocalePrefix, base: &str, path: &str) -> String {
    let (kept, rest) = match path.strip_prefix(base) {
        Some(rest) if !base.is_empty() && (rest.is_empty() || rest.starts_with('/')) => (base, rest),
        _ => ("", path),
    };
    match prefix.strip(rest) {
        Some(remainder) => {
            let joined = format!("{}{}", kept, remainder);
            if joined.is_empty() {
                "/".to_string()
            } else {
                joined
            }
        }
        None => path.to_string(),
    }
}

fn redirect(location: &str) -> Response {
    tracing::debug!(location = %location, "Redirecting to localized URL");
    metrics::record_rewrite_decision("redirect");
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, value)]).into_response(),
        Err(_) => StatusCode::BAD_REQUEST.into_response(),
    }
}

fn path_and_query(uri: &Uri) -> String {
    uri.path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string())
}

fn set_path_and_query(req: &mut Request, target: &str) {
    let mut parts = req.uri().clone().into_parts();
    match target.parse() {
        Ok(pq) => {
            parts.path_and_query = Some(pq);
            match Uri::from_parts(parts) {
                Ok(uri) => *req.uri_mut() = uri,
                Err(e) => tracing::warn!(target = %target, error = %e, "Cannot rewrite request URI"),
            }
        }
        Err(e) => tracing::warn!(target = %target, error = %e, "Cannot rewrite request URI"),
    }
}

/// Absolute URL of the request, as the resolver sees it.
fn request_href(req: &Request) -> String {
    let host = req
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| req.uri().authority().map(|a| a.to_string()))
        .unwrap_or_else(|| "localhost".to_string());
    let proto = req
        .headers()
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    format!("{}://{}{}", proto, host, path_and_query(req.uri()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn prefix() -> LocalePrefix {
        LocalePrefix::new(&["es".to_string(), "en".to_string()], &BTreeMap::new())
    }

    #[test]
    fn test_strip_locale_segment() {
        let prefix = prefix();
        assert_eq!(strip_locale_segment(&prefix, "", "/es/about"), "/about");
        assert_eq!(strip_locale_segment(&prefix, "", "/es"), "/");
        assert_eq!(strip_locale_segment(&prefix, "", "/about"), "/about");
        assert_eq!(strip_locale_segment(&prefix, "/shop", "/shop/es/a"), "/shop/a");
        assert_eq!(strip_locale_segment(&prefix, "/shop", "/shop/es"), "/shop");
        assert_eq!(strip_locale_segment(&prefix, "/shop", "/shopping/es"), "/shopping/es");
    }

    #[test]
    fn test_folder_segment_stripped() {
        let folders = BTreeMap::from([("espanol".to_string(), "es".to_string())]);
        let prefix = LocalePrefix::new(&["es".to_string(), "en".to_string()], &folders);
        assert_eq!(strip_locale_segment(&prefix, "", "/espanol/contact"), "/contact");
    }

    #[test]
    fn test_redirect_response() {
        let response = redirect("/sobre?locale=es");
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()["location"], "/sobre?locale=es");
    }
}
