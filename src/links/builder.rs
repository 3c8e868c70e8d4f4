//! Locale link construction.
//!
//! # Responsibilities
//! - Produce the URL of a page in a given locale, per detection mode
//! - Build `<link rel="alternate">` tags for every other locale
//!
//! # Design Decisions
//! - Sub-directory options force the `subdir` mode regardless of metadata
//! - `custom` without a configured domain for the target degrades to `querystring`
//! - Modes that cannot be expressed in a link (`subdomain`, `tld`) yield `None`,
//!   which callers treat as "no link", never as an error

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::config::SubDirConfig;
use crate::links::prefix::{folder_for_locale, strip_base, LocalePrefix};
use crate::links::url::ParsedUrl;
use crate::plugins::RewriteUrlHandler;
use crate::site::meta::{LocaleDetection, SiteMeta};

fn locale_param() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([?&]locale=)([^&]+)").expect("valid regex"))
}

/// Caller-side options for link construction.
#[derive(Debug, Clone, Copy)]
pub struct LinkOptions<'a> {
    pub sub_dir: &'a SubDirConfig,
    pub folders: &'a BTreeMap<String, String>,
    /// Return an absolute URL when the input carries a host.
    pub return_full: bool,
}

/// Builds links against one metadata snapshot.
#[derive(Clone, Copy)]
pub struct LinkBuilder<'a> {
    pub meta: &'a SiteMeta,
    pub prefix: &'a LocalePrefix,
    pub rewrite: Option<&'a dyn RewriteUrlHandler>,
}

impl<'a> LinkBuilder<'a> {
    /// The equivalent of `url` in `locale`, or `None` when no rule applies.
    pub fn link(
        &self,
        locale: &str,
        url: &ParsedUrl,
        options: &LinkOptions<'_>,
        from_locale: Option<&str>,
    ) -> Option<String> {
        if let Some(handler) = self.rewrite {
            return handler.rewrite(url, locale, from_locale);
        }

        let return_full = options.return_full && url.host.is_some();
        let mut mode = self.meta.locale_detection;
        if options.sub_dir.enabled {
            mode = LocaleDetection::Subdir;
        }
        if mode == LocaleDetection::Custom && self.meta.custom_url(locale).is_none() {
            mode = LocaleDetection::Querystring;
        }

        match mode {
            LocaleDetection::Custom => {
                let custom = self.meta.custom_url(locale)?;
                let domain = custom.split('/').next().unwrap_or(custom);
                let scheme = url.scheme.as_deref().map(|s| format!("{}:", s)).unwrap_or_default();
                Some(format!("{}//{}{}", scheme, domain, url.path_and_rest()))
            }
            LocaleDetection::Querystring => {
                let query = set_locale_param(&url.query, locale);
                let relative = format!("{}{}{}", url.path, query, url.fragment);
                Some(if return_full {
                    format!("{}{}", url.origin(), relative)
                } else {
                    relative
                })
            }
            LocaleDetection::Subdir => {
                let relative = self.subdir_path(locale, url, options);
                Some(if return_full {
                    format!("{}{}", url.origin(), relative)
                } else {
                    relative
                })
            }
            LocaleDetection::Hash => Some(if return_full {
                format!("{}{}{}#locale={}", url.origin(), url.path, url.query, locale)
            } else {
                format!("#locale_{}", locale)
            }),
            LocaleDetection::Subdomain | LocaleDetection::Tld | LocaleDetection::Unknown => None,
        }
    }

    fn subdir_path(&self, locale: &str, url: &ParsedUrl, options: &LinkOptions<'_>) -> String {
        let base = options.sub_dir.base.as_str();
        let mut path = strip_base(&url.path, base);
        if let Some(rest) = self.prefix.strip(&path) {
            path = if rest.is_empty() { "/".to_string() } else { rest.to_string() };
        }

        let original = self.meta.original.as_str();
        let mut prefix = if !options.folders.is_empty() {
            format!("/{}", folder_for_locale(locale, options.folders))
        } else if locale != original {
            format!("/{}", locale)
        } else {
            String::new()
        };
        if !base.is_empty() && (!options.sub_dir.optional || locale != original) {
            prefix = format!("{}{}", base, prefix);
        }

        format!("{}{}{}{}", prefix, path, url.query, url.fragment)
    }

    /// `<link rel="alternate">` tags for every locale except `current`.
    pub fn alternate_tags(&self, url: &str, current: &str, options: &LinkOptions<'_>) -> String {
        let parsed = ParsedUrl::parse(url);
        let original = self.meta.original.as_str();
        self.meta
            .all_locales()
            .iter()
            .filter(|l| l.as_str() != current)
            .map(|l| {
                let href = self
                    .link(l, &parsed, options, Some(original))
                    .unwrap_or_else(|| url.to_string());
                let hreflang = if l == original { "x-default" } else { l.as_str() };
                format!(
                    r#"<link rel="alternate" href="{}" hreflang="{}">"#,
                    href.replace('"', "&quot;"),
                    hreflang
                )
            })
            .collect()
    }
}

/// Insert or replace the `locale` query parameter, keeping everything else.
fn set_locale_param(query: &str, locale: &str) -> String {
    if locale_param().is_match(query) {
        locale_param()
            .replacen(query, 1, |caps: &Captures| format!("{}{}", &caps[1], locale))
            .into_owned()
    } else if query.is_empty() {
        format!("?locale={}", locale)
    } else {
        format!("{}&locale={}", query, locale)
    }
}
