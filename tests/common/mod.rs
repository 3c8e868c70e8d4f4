//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::time::Duration;

use axum::body::Body;
use axum::extract::Request;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{TimeZone, Utc};
use tempfile::TempDir;
use tower::ServiceExt;

use locale_proxy::site::meta::{LocaleDetection, SiteData, SiteMeta};
use locale_proxy::{Gateway, GatewayConfig, HandlerRegistry, LocaleContext, PageLocals};

pub const GOOGLEBOT: &str = "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)";
pub const BROWSER: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";
pub const SNIPPET: &str = r#"<script src="//cdn.example.com/s.js"></script>"#;

pub const HOME_HTML: &str = "<html><body>Home</body></html>";
pub const ABOUT_HTML: &str = "<html><body>About us</body></html>";

pub const SITEMAP: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8"?><urlset>"#,
    "<url><loc>http://example.com/about</loc><lastmod>2024-01-01</lastmod></url>",
    "<url><loc>http://other.org/about</loc></url>",
    "<url><loc>http://example.com/logo.png</loc></url>",
    "</urlset>"
);

/// `querystring` site, original `en`, `es` translated, `about` → `sobre`.
pub fn site_data() -> SiteData {
    let mut keywords = BTreeMap::new();
    keywords.insert("about".to_string(), BTreeMap::from([("es".to_string(), "sobre".to_string())]));

    SiteData {
        id: Some("site-1".into()),
        error: None,
        snippet: SNIPPET.to_string(),
        meta: SiteMeta {
            locale_detection: LocaleDetection::Querystring,
            original: "en".into(),
            default: "en".into(),
            locale_keys: vec!["es".into()],
            ..SiteMeta::default()
        },
        keywords,
        last_modified: BTreeMap::from([("es".to_string(), Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap())]),
    }
}

/// Configuration seeded with [`site_data`], caching under `dir`.
pub fn config(dir: &TempDir, render_endpoint: &str) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.site.site_id = "site-1".into();
    config.seo.cache_dir = dir.path().join("pages");
    config.metadata.cache_dir = dir.path().to_path_buf();
    config.render.endpoint = render_endpoint.to_string();
    config.render.timeout_secs = 2;
    config.bootstrap = Some(site_data());
    config
}

pub async fn gateway(config: GatewayConfig) -> Gateway {
    let gateway = Gateway::new(config, HandlerRegistry::new()).unwrap();
    gateway.bootstrap().await.unwrap();
    gateway
}

async fn locals(request: Request) -> Json<serde_json::Value> {
    let context = request.extensions().get::<LocaleContext>().cloned();
    let locals = request.extensions().get::<PageLocals>().cloned();
    Json(serde_json::json!({
        "context": context,
        "locals": locals,
        "path": request.uri().to_string(),
    }))
}

/// The origin application the gateway fronts.
pub fn origin() -> Router {
    Router::new()
        .route("/", get(|| async { Html(HOME_HTML) }))
        .route("/about", get(|| async { Html(ABOUT_HTML) }).post(|| async { "posted" }))
        .route("/contact", get(|| async { Html("<html><body>Contact</body></html>") }))
        .route("/locals", get(locals))
        .route("/empty", get(|| async { Html("") }))
        .route("/broken", get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, Html("<p>oops</p>")) }))
        .route("/api/data", get(|| async { Json(serde_json::json!({"ok": true})) }))
        .route("/app.js", get(|| async { ([(header::CONTENT_TYPE, "application/javascript")], "var a=1;") }))
        .route(
            "/sitemap.xml",
            get(|| async { ([(header::CONTENT_TYPE, "application/xml")], SITEMAP) }),
        )
        .route(
            "/robots.txt",
            get(|| async { ([(header::CONTENT_TYPE, "text/plain")], "Sitemap: http://example.com/sitemap.xml") }),
        )
}

pub fn request(uri: &str, user_agent: &str) -> Request {
    Request::builder()
        .uri(uri)
        .header(header::HOST, "example.com")
        .header(header::USER_AGENT, user_agent)
        .body(Body::empty())
        .unwrap()
}

pub async fn send(app: &Router, request: Request) -> Response {
    app.clone().oneshot(request).await.unwrap().into_response()
}

pub async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Poll until `check` passes or a second has elapsed.
pub async fn eventually<F>(mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
