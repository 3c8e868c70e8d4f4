//! Immutable view of one version of the site metadata.
//!
//! Everything derived from the payload (snippet variants, keyword maps, the
//! locale prefix matcher, custom domain patterns, named handlers) is built
//! here in one go, so a request holding an `Arc<SiteSnapshot>` sees one
//! consistent version even while the store swaps in a newer one.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::SubDirConfig;
use crate::links::builder::LinkBuilder;
use crate::links::keywords::KeywordMap;
use crate::links::prefix::LocalePrefix;
use crate::locale::resolver::CustomPatterns;
use crate::plugins::{HandlerRegistry, LocaleHandler, RewriteUrlHandler};
use crate::site::meta::{SiteData, SiteMeta};
use crate::site::snippet::Snippet;

/// Local configuration the snapshot is derived against.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotOptions<'a> {
    pub sub_dir: &'a SubDirConfig,
    pub folders: &'a BTreeMap<String, String>,
    pub registry: &'a HandlerRegistry,
}

pub struct SiteSnapshot {
    data: SiteData,
    snippet: Snippet,
    keywords: KeywordMap,
    prefix: LocalePrefix,
    custom: CustomPatterns,
    rewrite_handler: Option<Arc<dyn RewriteUrlHandler>>,
    locale_handler: Option<Arc<dyn LocaleHandler>>,
}

impl SiteSnapshot {
    pub fn build(data: SiteData, options: SnapshotOptions<'_>) -> Self {
        let meta = &data.meta;
        let snippet = Snippet::new(&data.snippet, options.sub_dir, options.folders);
        let keywords = KeywordMap::build(&data.keywords, &meta.locale_keys);
        let prefix = LocalePrefix::new(&meta.all_locales(), options.folders);
        let custom = CustomPatterns::compile(&meta.custom_urls);
        let rewrite_handler = options.registry.rewrite_handler(meta.rewrite_url_handler.as_deref());
        let locale_handler = options.registry.locale_handler(meta.get_locale_handler.as_deref());

        Self {
            snippet,
            keywords,
            prefix,
            custom,
            rewrite_handler,
            locale_handler,
            data,
        }
    }

    pub fn data(&self) -> &SiteData {
        &self.data
    }

    pub fn meta(&self) -> &SiteMeta {
        &self.data.meta
    }

    pub fn snippet(&self) -> &Snippet {
        &self.snippet
    }

    pub fn keywords(&self) -> &KeywordMap {
        &self.keywords
    }

    pub fn prefix(&self) -> &LocalePrefix {
        &self.prefix
    }

    pub fn custom_patterns(&self) -> &CustomPatterns {
        &self.custom
    }

    pub fn rewrite_handler(&self) -> Option<&dyn RewriteUrlHandler> {
        self.rewrite_handler.as_deref()
    }

    pub fn locale_handler(&self) -> Option<&dyn LocaleHandler> {
        self.locale_handler.as_deref()
    }

    pub fn last_modified(&self, locale: &str) -> Option<DateTime<Utc>> {
        self.data.last_modified.get(locale).copied()
    }

    pub fn link_builder(&self) -> LinkBuilder<'_> {
        LinkBuilder {
            meta: &self.data.meta,
            prefix: &self.prefix,
            rewrite: self.rewrite_handler(),
        }
    }
}

impl std::fmt::Debug for SiteSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteSnapshot")
            .field("meta", &self.data.meta)
            .field("rewrite_handler", &self.rewrite_handler.is_some())
            .field("locale_handler", &self.locale_handler.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::links::url::ParsedUrl;
    use crate::site::meta::RawKeywords;

    fn data() -> SiteData {
        let mut keywords = RawKeywords::new();
        keywords.insert("about".into(), BTreeMap::from([("es".to_string(), "sobre".to_string())]));
        SiteData {
            snippet: "<script src=\"/s.js\"></script>".into(),
            meta: SiteMeta {
                original: "en".into(),
                default: "en".into(),
                locale_keys: vec!["es".into()],
                rewrite_url_handler: Some("prefixed".into()),
                ..SiteMeta::default()
            },
            keywords,
            ..SiteData::default()
        }
    }

    #[test]
    fn test_derived_state() {
        let registry = HandlerRegistry::new().with_rewrite("prefixed", |url: &ParsedUrl, locale: &str, _: Option<&str>| {
            Some(format!("/{}{}", locale, url.path))
        });
        let sub_dir = SubDirConfig::default();
        let folders = BTreeMap::new();
        let snapshot = SiteSnapshot::build(data(), SnapshotOptions { sub_dir: &sub_dir, folders: &folders, registry: &registry });

        assert_eq!(snapshot.keywords().to_original("/sobre", "es").as_deref(), Some("/about"));
        // Keyword maps cover translated locales only.
        assert!(!snapshot.keywords().has_locale("en"));
        assert_eq!(snapshot.prefix().segment("/en/x"), Some("en"));
        assert!(snapshot.rewrite_handler().is_some());
        assert!(snapshot.locale_handler().is_none());
        assert!(snapshot.snippet().async_variant.starts_with("<script async"));
    }
}
