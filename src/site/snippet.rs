//! The injected script snippet and the page locals handed to the origin.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::SubDirConfig;

const HEAD_MARKER: &str = "<!-- start locale head -->";
const HEAD_OFF: &str = "<!-- locale head OFF -->";
const FOOTER_OFF: &str = "<!-- locale footer OFF -->";

/// The site snippet in both forms, plus the sub-directory pre-snippet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snippet {
    /// Inline configuration script for sub-directory sites, or empty.
    pub pre: String,
    /// The snippet as configured.
    pub sync: String,
    /// The snippet with its first `<script` tag marked `async`.
    pub async_variant: String,
}

impl Snippet {
    pub fn new(snippet: &str, sub_dir: &SubDirConfig, folders: &BTreeMap<String, String>) -> Self {
        Self {
            pre: pre_snippet(sub_dir, folders),
            sync: snippet.to_string(),
            async_variant: snippet.replacen("<script", "<script async", 1),
        }
    }

    /// Pre-snippet followed by the variant for `locale`: async on the
    /// original locale, synchronous on translated pages.
    pub fn for_locale(&self, locale: &str, original: &str) -> String {
        let variant = if locale == original {
            &self.async_variant
        } else {
            &self.sync
        };
        format!("{}{}", self.pre, variant)
    }
}

fn pre_snippet(sub_dir: &SubDirConfig, folders: &BTreeMap<String, String>) -> String {
    if !sub_dir.enabled {
        return String::new();
    }
    let base = if sub_dir.base.is_empty() {
        String::new()
    } else {
        format!(r#"localeConfig.subDirBase="{}";"#, sub_dir.base)
    };
    let optional = if sub_dir.optional {
        "localeConfig.subDirOptional=true;".to_string()
    } else {
        String::new()
    };
    let folders = if folders.is_empty() {
        String::new()
    } else {
        let json = serde_json::to_string(folders).unwrap_or_else(|_| "{}".to_string());
        format!("localeConfig.folders={};", json)
    };
    format!(
        r#"<script>var localeConfig=localeConfig||{{}};localeConfig.localeURL="subdir";{}{}{}</script>"#,
        base, optional, folders
    )
}

/// Values the origin's templates embed, attached to each handled request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageLocals {
    pub locale: String,
    pub snippet: String,
    /// Head block: alternate links, pre-snippet and snippet between markers.
    pub snippet_top: String,
    pub snippet_bottom: String,
}

impl PageLocals {
    /// Locals for a page whose site metadata is not available yet.
    pub fn not_loaded() -> Self {
        Self {
            locale: String::new(),
            snippet: String::new(),
            snippet_top: HEAD_OFF.to_string(),
            snippet_bottom: FOOTER_OFF.to_string(),
        }
    }

    pub fn loaded(locale: &str, snippet: String, alt_tags: &str) -> Self {
        Self {
            locale: locale.to_string(),
            snippet_top: format!("{}{}{}{}", HEAD_MARKER, alt_tags, snippet, HEAD_MARKER),
            snippet,
            snippet_bottom: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAG: &str = r#"<script src="//cdn.example.com/s.js"></script><script>init()</script>"#;

    #[test]
    fn test_async_variant_marks_first_tag_only() {
        let snippet = Snippet::new(TAG, &SubDirConfig::default(), &BTreeMap::new());
        assert_eq!(
            snippet.async_variant,
            r#"<script async src="//cdn.example.com/s.js"></script><script>init()</script>"#
        );
        assert!(snippet.pre.is_empty());
    }

    #[test]
    fn test_variant_by_locale() {
        let snippet = Snippet::new(TAG, &SubDirConfig::default(), &BTreeMap::new());
        assert_eq!(snippet.for_locale("es", "en"), TAG);
        assert!(snippet.for_locale("en", "en").starts_with("<script async"));
    }

    #[test]
    fn test_subdir_pre_snippet() {
        let sub_dir = SubDirConfig { enabled: true, base: "/shop".into(), optional: true };
        let folders = BTreeMap::from([("espanol".to_string(), "es".to_string())]);
        let snippet = Snippet::new(TAG, &sub_dir, &folders);
        assert_eq!(
            snippet.pre,
            concat!(
                r#"<script>var localeConfig=localeConfig||{};localeConfig.localeURL="subdir";"#,
                r#"localeConfig.subDirBase="/shop";localeConfig.subDirOptional=true;"#,
                r#"localeConfig.folders={"espanol":"es"};</script>"#
            )
        );
        assert!(snippet.for_locale("es", "en").starts_with(&snippet.pre));
    }

    #[test]
    fn test_page_locals() {
        let locals = PageLocals::loaded("es", "<s/>".into(), "<link/>");
        assert_eq!(locals.snippet_top, "<!-- start locale head --><link/><s/><!-- start locale head -->");
        assert_eq!(locals.snippet_bottom, "");

        let off = PageLocals::not_loaded();
        assert_eq!(off.locale, "");
        assert_eq!(off.snippet_top, "<!-- locale head OFF -->");
        assert_eq!(off.snippet_bottom, "<!-- locale footer OFF -->");
    }
}
