//! `POST {endpoint}?site=&el=&url=[&ld=subdir&sdb=&sdo=true]` with `{"html": ...}`.

use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;

use crate::config::{RenderConfig, SubDirConfig};
use crate::health::RenderHealth;
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("render service is unhealthy")]
    Unhealthy,

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("render service returned status {0}")]
    Status(u16),

    #[error("empty response")]
    Empty,
}

impl RenderError {
    fn outcome(&self) -> &'static str {
        match self {
            RenderError::Unhealthy => "skipped",
            RenderError::Transport(e) if e.is_timeout() => "timeout",
            RenderError::Transport(_) => "transport_error",
            RenderError::Status(_) => "status_error",
            RenderError::Empty => "empty",
        }
    }
}

#[derive(Serialize)]
struct RenderRequest<'a> {
    html: &'a str,
}

#[derive(Debug, Clone)]
pub struct RenderClient {
    http: reqwest::Client,
    endpoint: String,
    site_id: String,
    sub_dir: SubDirConfig,
    health: RenderHealth,
}

impl RenderClient {
    pub fn new(
        config: &RenderConfig,
        site_id: &str,
        sub_dir: &SubDirConfig,
        health: RenderHealth,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            site_id: site_id.to_string(),
            sub_dir: sub_dir.clone(),
            health,
        })
    }

    pub fn health(&self) -> &RenderHealth {
        &self.health
    }

    fn query(&self, url: &str, locale: &str) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("site", self.site_id.clone()),
            ("el", locale.to_string()),
            ("url", url.to_string()),
        ];
        if self.sub_dir.enabled {
            query.push(("ld", "subdir".to_string()));
            if !self.sub_dir.base.is_empty() {
                query.push(("sdb", self.sub_dir.base.clone()));
            }
            if self.sub_dir.optional {
                query.push(("sdo", "true".to_string()));
            }
        }
        query
    }

    /// Translate `html` (served at `url`) into `locale`.
    ///
    /// The payload is returned as received and may be gzip-compressed.
    pub async fn render(&self, url: &str, locale: &str, html: &str) -> Result<Bytes, RenderError> {
        let result = self.call(url, locale, html).await;
        match &result {
            Ok(payload) => {
                tracing::debug!(url = %url, locale = %locale, bytes = payload.len(), "Received translated HTML");
                metrics::record_render_call("success");
            }
            Err(e) => metrics::record_render_call(e.outcome()),
        }
        result
    }

    async fn call(&self, url: &str, locale: &str, html: &str) -> Result<Bytes, RenderError> {
        if !self.health.is_healthy() {
            return Err(RenderError::Unhealthy);
        }

        let response = self
            .http
            .post(&self.endpoint)
            .query(&self.query(url, locale))
            .header(reqwest::header::ACCEPT_ENCODING, "gzip")
            .json(&RenderRequest { html })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RenderError::Status(status.as_u16()));
        }
        let payload = response.bytes().await?;
        if payload.is_empty() {
            return Err(RenderError::Empty);
        }
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, sub_dir: SubDirConfig) -> RenderClient {
        let config = RenderConfig {
            endpoint: format!("{}/api/engine/seo", server.uri()),
            timeout_secs: 2,
            ..RenderConfig::default()
        };
        RenderClient::new(&config, "site-1", &sub_dir, RenderHealth::new()).unwrap()
    }

    #[tokio::test]
    async fn test_render_request_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/engine/seo"))
            .and(query_param("site", "site-1"))
            .and(query_param("el", "es"))
            .and(query_param("url", "http://example.com/a?b=1"))
            .and(query_param("ld", "subdir"))
            .and(query_param("sdb", "/shop"))
            .and(query_param("sdo", "true"))
            .and(body_json(serde_json::json!({"html": "<p>Hi</p>"})))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>Hola</p>"))
            .expect(1)
            .mount(&server)
            .await;

        let sub_dir = SubDirConfig { enabled: true, base: "/shop".into(), optional: true };
        let payload = client(&server, sub_dir)
            .render("http://example.com/a?b=1", "es", "<p>Hi</p>")
            .await
            .unwrap();
        assert_eq!(&payload[..], b"<p>Hola</p>");
    }

    #[tokio::test]
    async fn test_render_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = client(&server, SubDirConfig::default());
        assert!(matches!(client.render("http://x/", "es", "<p/>").await, Err(RenderError::Status(500))));
        assert!(matches!(client.render("http://x/", "es", "<p/>").await, Err(RenderError::Empty)));
    }

    #[tokio::test]
    async fn test_unhealthy_skips_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x"))
            .expect(0)
            .mount(&server)
            .await;

        let client = client(&server, SubDirConfig::default());
        client.health().set(false);
        assert!(matches!(client.render("http://x/", "es", "<p/>").await, Err(RenderError::Unhealthy)));
    }
}
