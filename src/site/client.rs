//! Metadata API client.

use std::time::Duration;

use thiserror::Error;

use crate::config::MetadataConfig;
use crate::site::meta::SiteData;

/// Soft failure of a metadata fetch; callers retry or keep the current data.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("metadata API returned status {0}")]
    Status(u16),

    #[error("empty response")]
    Empty,

    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("metadata API reported an error: {0}")]
    Rejected(String),
}

/// Fetches site data from `GET {endpoint}/{site_id}?channel_id=...`.
#[derive(Debug, Clone)]
pub struct MetadataClient {
    http: reqwest::Client,
    url: String,
    channel_id: String,
}

impl MetadataClient {
    pub fn new(config: &MetadataConfig, site_id: &str) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            url: format!("{}/{}", config.endpoint.trim_end_matches('/'), site_id),
            channel_id: config.channel_id.clone(),
        })
    }

    pub async fn fetch(&self) -> Result<SiteData, FetchError> {
        let response = self
            .http
            .get(&self.url)
            .query(&[("channel_id", self.channel_id.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Err(FetchError::Empty);
        }

        let data: SiteData = serde_json::from_str(&body)?;
        if let Some(error) = data.error.as_deref().filter(|e| !e.is_empty()) {
            return Err(FetchError::Rejected(error.to_string()));
        }
        Ok(data)
    }
}
