//! Locale detection strategies.
//!
//! # Strategies
//! ```text
//! querystring  ?locale=xx        → cookie → header → site default
//! subdomain    xx.example.com    → site default
//! subdir       [/base]/xx/...    → explicit → cookie → header → site default
//! tld          example.xx        → nothing
//! custom       domain patterns   → explicit → site default
//! hash         #!locale=xx       → cookie → header → site default
//!              (#locale=xx and #locale_xx, as built by links, match too)
//! other                          → cookie
//! ```
//!
//! # Design Decisions
//! - Strategies are mutually exclusive; the site metadata picks one
//! - Custom domain patterns are compiled once per metadata snapshot
//! - `tld` is the only strategy that can yield no locale at all

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::links::prefix::{generic_segment, locale_from_folder, strip_base, LocalePrefix};
use crate::links::url::ParsedUrl;
use crate::plugins::{LocaleHandler, LocaleInputs};
use crate::site::meta::{LocaleDetection, SiteMeta};

fn subdomain_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^(?:www\.)?(\w\w(?:_\w\w)?)\.").expect("valid regex"))
}

fn pipe_subdomain_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:^|_)(\w\w(?:_\w\w)?)_(?:b-[mt]-)?[0-9a-f]{24,25}_pipe").expect("valid regex")
    })
}

fn tld_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\.(\w\w)$").expect("valid regex"))
}

fn hash_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#!?locale[=_](\w\w(?:_\w\w)?)$").expect("valid regex"))
}

/// Per-locale domain patterns for the `custom` strategy, in locale order.
#[derive(Debug, Clone, Default)]
pub struct CustomPatterns {
    patterns: Vec<(String, Regex)>,
}

impl CustomPatterns {
    /// Compile `custom_urls`; `*` matches any run of characters, matching is
    /// case-insensitive and unanchored.
    pub fn compile(custom_urls: &BTreeMap<String, String>) -> Self {
        let patterns = custom_urls
            .iter()
            .filter(|(_, pattern)| !pattern.is_empty())
            .filter_map(|(locale, pattern)| {
                let body = pattern
                    .split('*')
                    .map(regex::escape)
                    .collect::<Vec<_>>()
                    .join(".*");
                match Regex::new(&format!("(?i){}", body)) {
                    Ok(re) => Some((locale.clone(), re)),
                    Err(e) => {
                        tracing::warn!(locale = %locale, pattern = %pattern, error = %e, "Skipping invalid custom URL pattern");
                        None
                    }
                }
            })
            .collect();
        Self { patterns }
    }

    fn find(&self, href: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|(_, re)| re.is_match(href))
            .map(|(locale, _)| locale.as_str())
    }
}

/// Per-request hints the fallbacks draw from.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocaleHints<'a> {
    /// Locale derived from the locale cookie, or empty.
    pub cookie: &'a str,
    /// Locale derived from `Accept-Language`, or empty when auto-detection is off.
    pub detected: &'a str,
    /// Explicitly configured locale, if any.
    pub explicit: Option<&'a str>,
}

/// Resolves a request URL to a locale against one metadata snapshot.
#[derive(Clone, Copy)]
pub struct LocaleResolver<'a> {
    pub meta: &'a SiteMeta,
    pub prefix: &'a LocalePrefix,
    pub custom: &'a CustomPatterns,
    pub folders: &'a BTreeMap<String, String>,
    pub sub_dir_base: &'a str,
    /// Hosts are pipe-encoded by an upstream translation proxy.
    pub translation_proxy: bool,
    pub handler: Option<&'a dyn LocaleHandler>,
}

impl<'a> LocaleResolver<'a> {
    /// Detect the locale of `url` with the given strategy.
    ///
    /// `None` only for `tld` without a match.
    pub fn resolve(&self, url: &ParsedUrl, mode: LocaleDetection, hints: LocaleHints<'_>) -> Option<String> {
        let site_default = self.meta.default.as_str();

        if let Some(handler) = self.handler {
            let inputs = LocaleInputs {
                url,
                cookie: hints.cookie,
                site_default,
                detected: hints.detected,
            };
            return Some(
                handler
                    .detect(inputs)
                    .filter(|l| !l.is_empty())
                    .unwrap_or_else(|| site_default.to_string()),
            );
        }

        let hostname = url.hostname().unwrap_or_default();
        let found = match mode {
            LocaleDetection::Querystring => url
                .query_param("locale")
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| first_non_empty(&[hints.cookie, hints.detected, site_default])),
            LocaleDetection::Subdomain => {
                let pattern = if self.translation_proxy {
                    pipe_subdomain_pattern()
                } else {
                    subdomain_pattern()
                };
                capture(pattern, hostname).unwrap_or_else(|| site_default.to_string())
            }
            LocaleDetection::Subdir => self.from_subdir(url, hints),
            LocaleDetection::Tld => return capture(tld_pattern(), hostname),
            LocaleDetection::Custom => match self.custom.find(&url.href()) {
                Some(locale) => locale.to_string(),
                None => first_non_empty(&[hints.explicit.unwrap_or_default(), site_default]),
            },
            LocaleDetection::Hash => capture(hash_pattern(), &url.fragment)
                .unwrap_or_else(|| first_non_empty(&[hints.cookie, hints.detected, site_default])),
            LocaleDetection::Unknown => hints.cookie.to_string(),
        };
        Some(found)
    }

    fn from_subdir(&self, url: &ParsedUrl, hints: LocaleHints<'_>) -> String {
        let site_default = self.meta.default.as_str();
        let path = strip_base(&url.path, self.sub_dir_base);

        if let Some(segment) = self.prefix.segment(&path) {
            return match self.folders.get(segment) {
                Some(folder_locale) => locale_from_folder(folder_locale, &self.meta.all_locales())
                    .unwrap_or_else(|| site_default.to_string()),
                None => segment.to_string(),
            };
        }
        // Unsupported but well-formed locales still count; the middleware
        // passes them through untouched. Supported locales hidden behind a
        // folder alias do not.
        if let Some(segment) = generic_segment(&path).filter(|s| !self.meta.supports(s)) {
            return segment.to_string();
        }

        first_non_empty(&[
            hints.explicit.unwrap_or_default(),
            hints.cookie,
            hints.detected,
            site_default,
        ])
    }
}

fn capture(pattern: &Regex, haystack: &str) -> Option<String> {
    pattern
        .captures(haystack)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|m| !m.is_empty())
}

fn first_non_empty(candidates: &[&str]) -> String {
    candidates
        .iter()
        .find(|c| !c.is_empty())
        .map(|c| c.to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SubDirConfig;
    use crate::links::builder::{LinkBuilder, LinkOptions};

    struct Fixture {
        meta: SiteMeta,
        prefix: LocalePrefix,
        custom: CustomPatterns,
        folders: BTreeMap<String, String>,
        base: String,
        translation_proxy: bool,
    }

    impl Fixture {
        fn new(mode: LocaleDetection) -> Self {
            let meta = SiteMeta {
                locale_detection: mode,
                original: "en".into(),
                default: "en".into(),
                locale_keys: vec!["es".into(), "fr".into(), "pt_br".into()],
                ..SiteMeta::default()
            };
            let folders = BTreeMap::new();
            Self {
                prefix: LocalePrefix::new(&meta.all_locales(), &folders),
                custom: CustomPatterns::compile(&meta.custom_urls),
                meta,
                folders,
                base: String::new(),
                translation_proxy: false,
            }
        }

        fn with_custom(mut self, urls: &[(&str, &str)]) -> Self {
            for (locale, url) in urls {
                self.meta.custom_urls.insert(locale.to_string(), url.to_string());
            }
            self.custom = CustomPatterns::compile(&self.meta.custom_urls);
            self
        }

        fn with_folders(mut self, folders: &[(&str, &str)]) -> Self {
            self.folders = folders.iter().map(|(f, l)| (f.to_string(), l.to_string())).collect();
            self.prefix = LocalePrefix::new(&self.meta.all_locales(), &self.folders);
            self
        }

        fn resolve(&self, url: &str, hints: LocaleHints<'_>) -> Option<String> {
            let resolver = LocaleResolver {
                meta: &self.meta,
                prefix: &self.prefix,
                custom: &self.custom,
                folders: &self.folders,
                sub_dir_base: &self.base,
                translation_proxy: self.translation_proxy,
                handler: None,
            };
            resolver.resolve(&ParsedUrl::parse(url), self.meta.locale_detection, hints)
        }
    }

    const NO_HINTS: LocaleHints<'static> = LocaleHints { cookie: "", detected: "", explicit: None };

    #[test]
    fn test_no_indicators_yield_default() {
        for mode in [
            LocaleDetection::Querystring,
            LocaleDetection::Subdomain,
            LocaleDetection::Subdir,
            LocaleDetection::Custom,
            LocaleDetection::Hash,
        ] {
            let fixture = Fixture::new(mode);
            assert_eq!(fixture.resolve("http://example.com/about", NO_HINTS).as_deref(), Some("en"), "{:?}", mode);
        }
        assert_eq!(Fixture::new(LocaleDetection::Tld).resolve("http://example.com/about", NO_HINTS), None);
    }

    #[test]
    fn test_querystring() {
        let fixture = Fixture::new(LocaleDetection::Querystring);
        assert_eq!(fixture.resolve("http://x.com/?locale=es", NO_HINTS).as_deref(), Some("es"));
        let hints = LocaleHints { cookie: "fr", detected: "es", explicit: None };
        assert_eq!(fixture.resolve("http://x.com/", hints).as_deref(), Some("fr"));
        let hints = LocaleHints { cookie: "", detected: "es", explicit: None };
        assert_eq!(fixture.resolve("http://x.com/", hints).as_deref(), Some("es"));
    }

    #[test]
    fn test_subdomain() {
        let fixture = Fixture::new(LocaleDetection::Subdomain);
        assert_eq!(fixture.resolve("http://es.example.com/", NO_HINTS).as_deref(), Some("es"));
        assert_eq!(fixture.resolve("http://www.pt_br.example.com/", NO_HINTS).as_deref(), Some("pt_br"));
        // Never falls back past the site default.
        let hints = LocaleHints { cookie: "fr", detected: "es", explicit: Some("es") };
        assert_eq!(fixture.resolve("http://example.com/", hints).as_deref(), Some("en"));
    }

    #[test]
    fn test_pipe_subdomain() {
        let mut fixture = Fixture::new(LocaleDetection::Subdomain);
        fixture.translation_proxy = true;
        let host = "http://fr_5af975a0d747572ef39eb049_pipe.proxy.net/";
        assert_eq!(fixture.resolve(host, NO_HINTS).as_deref(), Some("fr"));
        assert_eq!(fixture.resolve("http://es.example.com/", NO_HINTS).as_deref(), Some("en"));
    }

    #[test]
    fn test_subdir() {
        let fixture = Fixture::new(LocaleDetection::Subdir);
        assert_eq!(fixture.resolve("http://x.com/es/about", NO_HINTS).as_deref(), Some("es"));
        assert_eq!(fixture.resolve("http://x.com/pt_br", NO_HINTS).as_deref(), Some("pt_br"));

        let hints = LocaleHints { cookie: "fr", detected: "es", explicit: Some("pt_br") };
        assert_eq!(fixture.resolve("http://x.com/about", hints).as_deref(), Some("pt_br"));
        let hints = LocaleHints { cookie: "fr", detected: "es", explicit: None };
        assert_eq!(fixture.resolve("http://x.com/about", hints).as_deref(), Some("fr"));
        let hints = LocaleHints { cookie: "", detected: "es", explicit: None };
        assert_eq!(fixture.resolve("http://x.com/about", hints).as_deref(), Some("es"));
    }

    #[test]
    fn test_subdir_unsupported_segment() {
        let fixture = Fixture::new(LocaleDetection::Subdir);
        assert_eq!(fixture.resolve("http://x.com/de/x", NO_HINTS).as_deref(), Some("de"));
        assert_eq!(fixture.resolve("http://x.com/de_at", NO_HINTS).as_deref(), Some("de_at"));
        let hints = LocaleHints { cookie: "fr", detected: "", explicit: None };
        assert_eq!(fixture.resolve("http://x.com/about", hints).as_deref(), Some("fr"));
        assert_eq!(fixture.resolve("http://x.com/abc/x", hints).as_deref(), Some("fr"));
    }

    #[test]
    fn test_subdir_with_base_and_folders() {
        let mut fixture = Fixture::new(LocaleDetection::Subdir).with_folders(&[("espanol", "es_mx"), ("deutsch", "de")]);
        fixture.base = "/shop".into();
        // Folder locale not supported exactly: two-letter match.
        assert_eq!(fixture.resolve("http://x.com/shop/espanol/a", NO_HINTS).as_deref(), Some("es"));
        // Folder locale not supported at all: site default.
        assert_eq!(fixture.resolve("http://x.com/shop/deutsch/a", NO_HINTS).as_deref(), Some("en"));
        assert_eq!(fixture.resolve("http://x.com/shop/fr/a", NO_HINTS).as_deref(), Some("fr"));

        // An aliased locale is only reachable through its folder.
        let fixture = Fixture::new(LocaleDetection::Subdir).with_folders(&[("espanol", "es")]);
        let hints = LocaleHints { cookie: "fr", detected: "", explicit: None };
        assert_eq!(fixture.resolve("http://x.com/espanol/a", hints).as_deref(), Some("es"));
        assert_eq!(fixture.resolve("http://x.com/es/a", hints).as_deref(), Some("fr"));
    }

    #[test]
    fn test_tld() {
        let fixture = Fixture::new(LocaleDetection::Tld);
        assert_eq!(fixture.resolve("http://example.de/", NO_HINTS).as_deref(), Some("de"));
        assert_eq!(fixture.resolve("http://example.de:8080/", NO_HINTS).as_deref(), Some("de"));
        let hints = LocaleHints { cookie: "fr", detected: "es", explicit: Some("es") };
        assert_eq!(fixture.resolve("http://example.com/", hints), None);
    }

    #[test]
    fn test_custom_first_match_in_locale_order() {
        let fixture = Fixture::new(LocaleDetection::Custom)
            .with_custom(&[("fr", "*.example.fr"), ("es", "example.*/es"), ("pt_br", "shop.example.fr")]);
        assert_eq!(fixture.resolve("http://www.example.fr/a", NO_HINTS).as_deref(), Some("fr"));
        assert_eq!(fixture.resolve("http://EXAMPLE.com/es/a", NO_HINTS).as_deref(), Some("es"));
        // "es" sorts before "fr" and "pt_br"; the first matching locale wins.
        assert_eq!(fixture.resolve("http://shop.example.fr/es/", NO_HINTS).as_deref(), Some("es"));

        let hints = LocaleHints { cookie: "fr", detected: "", explicit: Some("pt_br") };
        assert_eq!(fixture.resolve("http://other.org/", hints).as_deref(), Some("pt_br"));
    }

    #[test]
    fn test_hash() {
        let fixture = Fixture::new(LocaleDetection::Hash);
        assert_eq!(fixture.resolve("http://x.com/#!locale=fr", NO_HINTS).as_deref(), Some("fr"));
        assert_eq!(fixture.resolve("http://x.com/#locale=pt_br", NO_HINTS).as_deref(), Some("pt_br"));
        assert_eq!(fixture.resolve("http://x.com/#locale_es", NO_HINTS).as_deref(), Some("es"));
        let hints = LocaleHints { cookie: "es", detected: "", explicit: None };
        assert_eq!(fixture.resolve("http://x.com/#other", hints).as_deref(), Some("es"));
    }

    /// Build the link for every locale from `source` and resolve it again.
    fn assert_links_resolve(fixture: &Fixture, sub_dir: &SubDirConfig, source: &str, locales: &[&str]) {
        let builder = LinkBuilder { meta: &fixture.meta, prefix: &fixture.prefix, rewrite: None };
        let options = LinkOptions { sub_dir, folders: &fixture.folders, return_full: true };
        let source = ParsedUrl::parse(source);
        for locale in locales {
            let link = builder.link(locale, &source, &options, None).unwrap();
            assert_eq!(fixture.resolve(&link, NO_HINTS).as_deref(), Some(*locale), "{}", link);
        }
    }

    #[test]
    fn test_links_resolve_to_their_locale() {
        let all = ["en", "es", "fr", "pt_br"];
        let none = SubDirConfig::default();

        let fixture = Fixture::new(LocaleDetection::Querystring);
        assert_links_resolve(&fixture, &none, "http://x.com/a?x=1&locale=es", &all);

        let fixture = Fixture::new(LocaleDetection::Hash);
        assert_links_resolve(&fixture, &none, "http://x.com/a#!locale=es", &all);

        let fixture = Fixture::new(LocaleDetection::Custom)
            .with_custom(&[("en", "www.example.com"), ("es", "es.example.com")]);
        assert_links_resolve(&fixture, &none, "http://es.example.com/a", &["en", "es"]);

        let fixture = Fixture::new(LocaleDetection::Subdir);
        let sub_dir = SubDirConfig { enabled: true, base: String::new(), optional: false };
        assert_links_resolve(&fixture, &sub_dir, "http://x.com/es/a", &all);

        let mut fixture = Fixture::new(LocaleDetection::Subdir);
        fixture.base = "/shop".into();
        for optional in [false, true] {
            let sub_dir = SubDirConfig { enabled: true, base: "/shop".into(), optional };
            assert_links_resolve(&fixture, &sub_dir, "http://x.com/shop/es/a", &all);
        }
    }

    #[test]
    fn test_unknown_returns_cookie() {
        let fixture = Fixture::new(LocaleDetection::Unknown);
        let hints = LocaleHints { cookie: "fr", detected: "es", explicit: None };
        assert_eq!(fixture.resolve("http://x.com/", hints).as_deref(), Some("fr"));
        assert_eq!(fixture.resolve("http://x.com/", NO_HINTS).as_deref(), Some(""));
    }

    #[test]
    fn test_locale_handler_overrides_strategy() {
        let fixture = Fixture::new(LocaleDetection::Querystring);
        let handler = |inputs: LocaleInputs<'_>| {
            inputs.url.path.strip_prefix("/lang-").map(str::to_string)
        };
        let resolver = LocaleResolver {
            meta: &fixture.meta,
            prefix: &fixture.prefix,
            custom: &fixture.custom,
            folders: &fixture.folders,
            sub_dir_base: "",
            translation_proxy: false,
            handler: Some(&handler),
        };
        let url = ParsedUrl::parse("http://x.com/lang-fr?locale=es");
        assert_eq!(resolver.resolve(&url, LocaleDetection::Querystring, NO_HINTS).as_deref(), Some("fr"));
        let url = ParsedUrl::parse("http://x.com/plain");
        assert_eq!(resolver.resolve(&url, LocaleDetection::Querystring, NO_HINTS).as_deref(), Some("en"));
    }
}
