//! URL substitution for sitemaps, robots files and other machine-readable
//! resources, plus `<lastmod>` bumping.
//!
//! # Design Decisions
//! - Only absolute URLs on one of the origin hosts are rewritten, unless a
//!   rewrite handler is registered, which then decides for every URL
//! - URLs pointing at assets keep their form
//! - A URL no rule applies to is left exactly as found

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use regex::{Captures, Regex};

use crate::links::builder::{LinkBuilder, LinkOptions};
use crate::links::keywords::KeywordMap;
use crate::links::url::ParsedUrl;
use crate::site::meta::{LocaleDetection, SiteMeta};

fn url_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:https?|ftp|file)://[-A-Z0-9+&@#/%?=~_|!:,.;]*[-A-Z0-9+&@#/%=~_|]").expect("valid regex")
    })
}

fn non_page_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\.(js|css|jpg|jpeg|png|ico|mp4|wmv|ogg|mp3|avi|mpeg|bmp|wav|pdf|doc|docx|xlsx|xls|json|kml|svg|eot|woff|woff2)(?:[?#]|$)",
        )
        .expect("valid regex")
    })
}

fn lastmod_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<lastmod>(.*?)</lastmod>").expect("valid regex"))
}

/// Hosts whose URLs count as the site's own.
///
/// The request host and the alternate host; with custom domains, a request
/// on the locale's own domain also claims the original locale's domain.
pub fn origin_hosts(current_host: &str, alt_host: Option<&str>, meta: &SiteMeta, locale: &str) -> Vec<String> {
    let mut hosts = vec![current_host.to_string()];
    if let Some(alt) = alt_host.filter(|h| !h.is_empty()) {
        hosts.push(alt.to_string());
    }
    if meta.locale_detection == LocaleDetection::Custom && meta.custom_url(locale) == Some(current_host) {
        if let Some(original_domain) = meta.custom_url(&meta.original) {
            hosts.push(original_domain.to_string());
        }
    }
    hosts.retain(|h| !h.is_empty());
    hosts
}

/// Everything needed to localize URLs for one response.
pub struct Substitution<'a> {
    pub locale: &'a str,
    pub original: &'a str,
    pub builder: LinkBuilder<'a>,
    pub options: LinkOptions<'a>,
    pub keywords: &'a KeywordMap,
    pub origin_hosts: &'a [String],
}

impl<'a> Substitution<'a> {
    /// Rewrite every eligible absolute URL in `body`.
    pub fn apply(&self, body: &str) -> String {
        url_pattern()
            .replace_all(body, |caps: &Captures| {
                let found = &caps[0];
                self.localize(found).unwrap_or_else(|| found.to_string())
            })
            .into_owned()
    }

    fn localize(&self, url: &str) -> Option<String> {
        if non_page_pattern().is_match(url) {
            return None;
        }
        if self.builder.rewrite.is_none() && !self.origin_hosts.iter().any(|h| url.contains(h.as_str())) {
            return None;
        }

        let mut parsed = ParsedUrl::parse(url);
        parsed.path = self.keywords.localize_path(&parsed.path, self.locale);
        self.builder.link(self.locale, &parsed, &self.options, Some(self.original))
    }
}

/// Raise every `<lastmod>` older than `modified` to `modified`.
///
/// Unparseable dates are left untouched.
pub fn bump_lastmod(body: &str, modified: DateTime<Utc>) -> String {
    lastmod_pattern()
        .replace_all(body, |caps: &Captures| match parse_sitemap_date(&caps[1]) {
            Some(date) if date < modified => format!(
                "<lastmod>{}</lastmod>",
                modified.to_rfc3339_opts(SecondsFormat::Millis, true)
            ),
            _ => caps[0].to_string(),
        })
        .into_owned()
}

/// W3C datetime forms used in sitemaps: full timestamps or plain dates.
fn parse_sitemap_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
