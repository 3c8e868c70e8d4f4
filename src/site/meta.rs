//! Site metadata as delivered by the metadata API.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Raw keyword table: original slug → (locale → translated slug).
pub type RawKeywords = BTreeMap<String, BTreeMap<String, String>>;

/// Per-locale last modification time of the translated content.
pub type LastModified = BTreeMap<String, DateTime<Utc>>;

/// Treat an explicit JSON `null` like a missing field.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// How the active locale is encoded in a URL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LocaleDetection {
    #[default]
    Querystring,
    Subdomain,
    Subdir,
    Tld,
    Custom,
    Hash,
    #[serde(other)]
    Unknown,
}

impl LocaleDetection {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocaleDetection::Querystring => "querystring",
            LocaleDetection::Subdomain => "subdomain",
            LocaleDetection::Subdir => "subdir",
            LocaleDetection::Tld => "tld",
            LocaleDetection::Custom => "custom",
            LocaleDetection::Hash => "hash",
            LocaleDetection::Unknown => "unknown",
        }
    }
}

/// Per-site configuration. Immutable once loaded; replaced wholesale on refresh.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SiteMeta {
    pub locale_detection: LocaleDetection,

    /// The site's native locale.
    pub original: String,

    /// Fallback locale when detection yields nothing.
    pub default: String,

    /// Consult `Accept-Language` as a fallback.
    pub auto_detect: bool,

    /// Supported locales, excluding `original`.
    #[serde(deserialize_with = "nullable")]
    pub locale_keys: Vec<String>,

    /// Locale → domain or URL-prefix pattern (`*` is a wildcard).
    #[serde(deserialize_with = "nullable")]
    pub custom_urls: BTreeMap<String, String>,

    pub timestamp: i64,
    pub include_query_string: bool,
    pub include_hash: bool,
    pub single_page_app: bool,
    #[serde(deserialize_with = "nullable")]
    pub qs_params: Vec<String>,
    pub domain: String,
    #[serde(deserialize_with = "nullable")]
    pub mount_subs: Vec<String>,

    /// Name of a registered URL rewrite handler.
    pub rewrite_url_handler: Option<String>,

    /// Name of a registered locale detection handler.
    pub get_locale_handler: Option<String>,
}

impl SiteMeta {
    /// Every locale the site serves: `locale_keys` followed by `original`.
    pub fn all_locales(&self) -> Vec<String> {
        let mut locales = self.locale_keys.clone();
        if !locales.contains(&self.original) {
            locales.push(self.original.clone());
        }
        locales
    }

    /// Whether `locale` is the original or one of the translated locales.
    pub fn supports(&self, locale: &str) -> bool {
        locale == self.original || self.locale_keys.iter().any(|l| l == locale)
    }

    pub fn custom_url(&self, locale: &str) -> Option<&str> {
        self.custom_urls
            .get(locale)
            .map(String::as_str)
            .filter(|u| !u.is_empty())
    }
}

/// Payload of the metadata API and of the local cache file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SiteData {
    /// Site id the payload belongs to; stamped before persisting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Error reported by the metadata API instead of data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(deserialize_with = "nullable")]
    pub snippet: String,
    pub meta: SiteMeta,
    #[serde(deserialize_with = "nullable")]
    pub keywords: RawKeywords,
    #[serde(deserialize_with = "nullable")]
    pub last_modified: LastModified,
}
