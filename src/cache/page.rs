//! File-backed page cache.
//!
//! Entries live under `{root}/{locale}/{md5(key)}`. The locale becomes a
//! directory name, so only plain locale codes are accepted.

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use bytes::Bytes;
use flate2::read::GzDecoder;
use regex::Regex;
use thiserror::Error;

const SECS_PER_DAY: u64 = 24 * 60 * 60;

fn locale_code() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z]{2,3}(?:[_-][A-Za-z0-9]{2,4})?$").expect("valid regex"))
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("not a cacheable locale: {0:?}")]
    InvalidLocale(String),
}

/// A cached payload and whether it is still within its TTL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedPage {
    pub bytes: Bytes,
    pub fresh: bool,
}

#[derive(Debug, Clone)]
pub struct PageCache {
    root: PathBuf,
    ttl: Duration,
}

impl PageCache {
    pub fn new(root: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self { root: root.into(), ttl }
    }

    /// Cache for `cache_days` days of freshness.
    pub fn with_days(root: impl Into<PathBuf>, cache_days: u64) -> Self {
        Self::new(root, Duration::from_secs(cache_days.saturating_mul(SECS_PER_DAY)))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn locale_dir(&self, locale: &str) -> Result<PathBuf, CacheError> {
        if locale_code().is_match(locale) {
            Ok(self.root.join(locale))
        } else {
            Err(CacheError::InvalidLocale(locale.to_string()))
        }
    }

    /// `{root}/{locale}/{md5(key)}`.
    pub fn path_for(&self, locale: &str, key: &str) -> Result<PathBuf, CacheError> {
        Ok(self
            .locale_dir(locale)?
            .join(format!("{:x}", md5::compute(key.as_bytes()))))
    }

    /// Read an entry; any I/O failure is a miss.
    pub async fn get(&self, locale: &str, key: &str) -> Option<CachedPage> {
        let path = self.path_for(locale, key).ok()?;
        let metadata = tokio::fs::metadata(&path).await.ok()?;
        let bytes = tokio::fs::read(&path).await.ok()?;
        let fresh = metadata
            .modified()
            .ok()
            .and_then(|modified| modified.elapsed().ok())
            .map(|age| age < self.ttl)
            .unwrap_or(false);
        Some(CachedPage {
            bytes: Bytes::from(bytes),
            fresh,
        })
    }

    /// Write an entry, creating the locale directory when missing.
    pub async fn put(&self, locale: &str, key: &str, payload: &[u8]) -> Result<(), CacheError> {
        let path = self.path_for(locale, key)?;
        match tokio::fs::write(&path, payload).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let dir = self.locale_dir(locale)?;
                tracing::debug!(dir = %dir.display(), "Creating cache directory");
                tokio::fs::create_dir_all(&dir).await?;
                tokio::fs::write(&path, payload).await?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove the whole cache tree. A missing tree is not an error.
    pub async fn purge_all(&self) -> Result<(), CacheError> {
        match tokio::fs::remove_dir_all(&self.root).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => {
                tracing::info!(dir = %self.root.display(), "Page cache purged");
                Ok(())
            }
        }
    }

    /// Remove one entry. A missing entry is not an error.
    pub async fn purge_url(&self, key: &str, locale: &str) -> Result<(), CacheError> {
        let path = self.path_for(locale, key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(url = %key, locale = %locale, "Cached page purged");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(url = %key, locale = %locale, "URL not cached");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Gzip payloads start with the magic bytes `1f 8b`.
pub fn is_gzip(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[0] == 0x1f && bytes[1] == 0x8b
}

pub fn gunzip(bytes: &[u8]) -> io::Result<Vec<u8>> {
    let mut out = Vec::new();
    GzDecoder::new(bytes).read_to_end(&mut out)?;
    Ok(out)
}
