//! Per-locale slug translation (`/about` ↔ `/sobre`).
//!
//! # Design Decisions
//! - Forward and reverse maps are built together from the raw table and never
//!   edited afterwards, so they cannot drift apart
//! - When two original slugs share a translation for a locale, the later one
//!   (in key order) owns the reverse entry; the earlier one still translates
//!   forward
//! - Only the path is translated; the query is carried over untouched and the
//!   last `.extension` of the path is set aside during translation

use std::collections::HashMap;

use crate::site::meta::RawKeywords;

type SlugMap = HashMap<String, String>;

/// Forward (original → localized) and reverse slug maps for every locale.
#[derive(Debug, Clone, Default)]
pub struct KeywordMap {
    forward: HashMap<String, SlugMap>,
    reverse: HashMap<String, SlugMap>,
}

impl KeywordMap {
    /// Build both directions for each of `locales` from the raw table.
    pub fn build(raw: &RawKeywords, locales: &[String]) -> Self {
        let mut forward = HashMap::new();
        let mut reverse = HashMap::new();

        for locale in locales {
            let mut proper = SlugMap::new();
            let mut inverse = SlugMap::new();
            for (keyword, translations) in raw {
                let Some(translated) = translations.get(locale).filter(|t| !t.is_empty()) else {
                    continue;
                };
                proper.insert(keyword.clone(), translated.clone());
                inverse.insert(translated.clone(), keyword.clone());
            }
            forward.insert(locale.clone(), proper);
            reverse.insert(locale.clone(), inverse);
        }

        Self { forward, reverse }
    }

    pub fn is_empty(&self) -> bool {
        self.forward.values().all(HashMap::is_empty)
    }

    /// True when the locale has a reverse map, i.e. it was part of the build.
    pub fn has_locale(&self, locale: &str) -> bool {
        self.reverse.contains_key(locale)
    }

    /// Translate a localized URL back to its original form.
    ///
    /// Returns `None` when no segment changed: the path is already original.
    pub fn to_original(&self, url: &str, locale: &str) -> Option<String> {
        translate(url, self.reverse.get(locale)?)
    }

    /// Translate an original URL to the locale's spelling.
    ///
    /// Returns `None` when no segment changed.
    pub fn to_localized(&self, url: &str, locale: &str) -> Option<String> {
        translate(url, self.forward.get(locale)?)
    }

    /// Localize every segment of a bare path (no extension handling).
    pub fn localize_path(&self, path: &str, locale: &str) -> String {
        match self.forward.get(locale) {
            Some(map) => map_segments(path, map),
            None => path.to_string(),
        }
    }
}

fn map_segments(path: &str, map: &SlugMap) -> String {
    path.split('/')
        .map(|segment| map.get(segment).map(String::as_str).unwrap_or(segment))
        .collect::<Vec<_>>()
        .join("/")
}

fn translate(url: &str, map: &SlugMap) -> Option<String> {
    let (pathname, query) = match url.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (url, None),
    };
    let (stem, ext) = match pathname.rsplit_once('.') {
        Some((stem, ext)) => (stem, Some(ext)),
        None => (pathname, None),
    };

    let translated = map_segments(stem, map);
    if translated == stem {
        return None;
    }

    let mut out = translated;
    if let Some(ext) = ext {
        out.push('.');
        out.push_str(ext);
    }
    if let Some(query) = query {
        out.push('?');
        out.push_str(query);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(entries: &[(&str, &str, &str)]) -> RawKeywords {
        let mut table = RawKeywords::new();
        for (keyword, locale, translated) in entries {
            table
                .entry(keyword.to_string())
                .or_default()
                .insert(locale.to_string(), translated.to_string());
        }
        table
    }

    fn map() -> KeywordMap {
        KeywordMap::build(
            &raw(&[
                ("about", "es", "sobre"),
                ("team", "es", "equipo"),
                ("about", "fr", "a-propos"),
            ]),
            &["es".to_string(), "fr".to_string()],
        )
    }

    #[test]
    fn test_to_original() {
        let map = map();
        assert_eq!(map.to_original("/sobre?locale=es", "es").as_deref(), Some("/about?locale=es"));
        assert_eq!(map.to_original("/sobre/equipo.html", "es").as_deref(), Some("/about/team.html"));
        assert_eq!(map.to_original("/about", "es"), None);
        assert_eq!(map.to_original("/sobre", "en"), None);
    }

    #[test]
    fn test_to_localized() {
        let map = map();
        assert_eq!(map.to_localized("/about?locale=es", "es").as_deref(), Some("/sobre?locale=es"));
        assert_eq!(map.to_localized("/about", "fr").as_deref(), Some("/a-propos"));
        assert_eq!(map.to_localized("/contact", "es"), None);
    }

    #[test]
    fn test_round_trip_for_mapped_paths() {
        let map = map();
        for path in ["/sobre", "/sobre/equipo", "/equipo/sobre?x=1"] {
            let original = map.to_original(path, "es").unwrap();
            assert_eq!(map.to_localized(&original, "es").as_deref(), Some(path));
        }
    }

    #[test]
    fn test_reverse_collision_last_key_wins() {
        let map = KeywordMap::build(
            &raw(&[("about", "es", "sobre"), ("company", "es", "sobre")]),
            &["es".to_string()],
        );
        // Both still localize forward.
        assert_eq!(map.to_localized("/about", "es").as_deref(), Some("/sobre"));
        assert_eq!(map.to_localized("/company", "es").as_deref(), Some("/sobre"));
        // "company" sorts after "about" and owns the reverse entry.
        assert_eq!(map.to_original("/sobre", "es").as_deref(), Some("/company"));
    }

    #[test]
    fn test_locale_without_keywords_still_has_maps() {
        let map = KeywordMap::build(&raw(&[("about", "es", "sobre")]), &["es".into(), "de".into()]);
        assert!(map.has_locale("de"));
        assert_eq!(map.to_original("/sobre", "de"), None);
        assert!(!map.is_empty());
    }

    #[test]
    fn test_localize_path() {
        assert_eq!(map().localize_path("/about/team", "es"), "/sobre/equipo");
        assert_eq!(map().localize_path("/about", "de"), "/about");
    }
}
