//! Which requests enter the rewrite pipeline.

use std::sync::OnceLock;

use axum::http::{header, HeaderMap};
use regex::Regex;

fn bot_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)bot|crawler|yandex|bing|baidu|spider|facebook|twitter|80legs|google|seo|search")
            .expect("valid regex")
    })
}

fn static_asset_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\.(js|css|jpg|jpeg|png|mp3|avi|mpeg|bmp|wav|pdf|doc|xml|docx|xlsx|xls|json|kml|svg|eot|woff|woff2)(?:[?#]|$)",
        )
        .expect("valid regex")
    })
}

fn machine_readable_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)sitemap|robots").expect("valid regex"))
}

/// User agent of a known crawler.
pub fn is_bot(headers: &HeaderMap) -> bool {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|ua| bot_pattern().is_match(ua))
        .unwrap_or(false)
}

/// Request for a static asset (`/app.js`, `/logo.png?v=2`).
pub fn is_static_asset(path_and_query: &str) -> bool {
    static_asset_pattern().is_match(path_and_query)
}

/// Sitemaps and robots files get their URLs localized whatever the client.
pub fn wants_url_substitution(path_and_query: &str) -> bool {
    machine_readable_pattern().is_match(path_and_query)
}

/// Client accepts gzip-encoded payloads.
pub fn accepts_gzip(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::ACCEPT_ENCODING)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.contains("gzip"))
}

/// How a request relates to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    /// Neither a crawler page view nor a sitemap/robots request.
    Ignored,
    /// Crawler request for a page: eligible for rendering.
    Crawler,
    /// Sitemap or robots request: eligible for URL substitution.
    MachineReadable,
}

pub fn eligibility(headers: &HeaderMap, path_and_query: &str) -> Eligibility {
    if wants_url_substitution(path_and_query) {
        Eligibility::MachineReadable
    } else if is_bot(headers) && !is_static_asset(path_and_query) {
        Eligibility::Crawler
    } else {
        Eligibility::Ignored
    }
}
