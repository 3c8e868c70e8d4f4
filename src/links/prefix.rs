//! Locale path segments (`/es`, `/pt_br`, or a folder alias).

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

fn two_letter_segment() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(/(\w\w(?:_\w\w)?))(?:/|$)").expect("valid regex"))
}

/// Matcher for the leading locale segment of a path.
///
/// Built from the site's locales and folder aliases; a folder claims its
/// locale, so a locale with an alias is only reachable through the alias.
/// Without any choices it falls back to a generic `xx`/`xx_yy` segment.
#[derive(Debug, Clone)]
pub struct LocalePrefix {
    pattern: Regex,
}

impl LocalePrefix {
    pub fn new(locales: &[String], folders: &BTreeMap<String, String>) -> Self {
        let mut choices: Vec<String> = folders.keys().map(|f| regex::escape(f)).collect();
        for locale in locales {
            if !folders.values().any(|l| l == locale) {
                choices.push(regex::escape(locale));
            }
        }
        choices.retain(|c| !c.is_empty());

        let pattern = if choices.is_empty() {
            two_letter_segment().clone()
        } else {
            Regex::new(&format!(r"(?i)^(/({}))(?:/|$)", choices.join("|")))
                .unwrap_or_else(|_| two_letter_segment().clone())
        };
        Self { pattern }
    }

    /// The locale or folder named by the leading segment.
    pub fn segment<'p>(&self, path: &'p str) -> Option<&'p str> {
        self.pattern
            .captures(path)
            .and_then(|c| c.get(2))
            .map(|m| m.as_str())
    }

    /// The path without its leading locale segment; `None` when there is none.
    pub fn strip<'p>(&self, path: &'p str) -> Option<&'p str> {
        let prefix = self.pattern.captures(path)?.get(1)?;
        Some(&path[prefix.end()..])
    }
}

/// Any leading `xx` or `xx_yy` segment, supported by the site or not.
pub fn generic_segment(path: &str) -> Option<&str> {
    two_letter_segment()
        .captures(path)
        .and_then(|c| c.get(2))
        .map(|m| m.as_str())
}

/// Remove the configured base from a path (first occurrence).
pub fn strip_base(path: &str, base: &str) -> String {
    if base.is_empty() {
        path.to_string()
    } else {
        path.replacen(base, "", 1)
    }
}

/// Resolve a folder alias's locale against the supported locales:
/// exact match first, then the first locale sharing the two-letter language.
pub fn locale_from_folder(folder_locale: &str, locales: &[String]) -> Option<String> {
    if let Some(exact) = locales.iter().find(|l| *l == folder_locale) {
        return Some(exact.clone());
    }
    let language = folder_locale.get(..2)?;
    locales
        .iter()
        .find(|l| l.get(..2) == Some(language))
        .cloned()
}

/// The folder used for a locale when building links: exact alias first, then
/// an alias sharing the two-letter language, else the language itself.
pub fn folder_for_locale(locale: &str, folders: &BTreeMap<String, String>) -> String {
    if let Some((folder, _)) = folders.iter().find(|(_, l)| *l == locale) {
        return folder.clone();
    }
    let language = locale.get(..2).unwrap_or(locale);
    folders
        .iter()
        .find(|(_, l)| l.get(..2) == Some(language))
        .map(|(folder, _)| folder.clone())
        .unwrap_or_else(|| language.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locales() -> Vec<String> {
        vec!["es".into(), "pt_br".into(), "en".into()]
    }

    #[test]
    fn test_segment_and_strip() {
        let prefix = LocalePrefix::new(&locales(), &BTreeMap::new());
        assert_eq!(prefix.segment("/es/about"), Some("es"));
        assert_eq!(prefix.segment("/pt_br"), Some("pt_br"));
        assert_eq!(prefix.segment("/espanol/about"), None);
        assert_eq!(prefix.strip("/es/about"), Some("/about"));
        assert_eq!(prefix.strip("/es"), Some(""));
        assert_eq!(prefix.strip("/fr/about"), None);
    }

    #[test]
    fn test_folders_replace_their_locale() {
        let folders = BTreeMap::from([("espanol".to_string(), "es".to_string())]);
        let prefix = LocalePrefix::new(&locales(), &folders);
        assert_eq!(prefix.segment("/espanol/about"), Some("espanol"));
        assert_eq!(prefix.segment("/es/about"), None);
        assert_eq!(prefix.segment("/en/about"), Some("en"));
    }

    #[test]
    fn test_generic_segment_without_locales() {
        let prefix = LocalePrefix::new(&[], &BTreeMap::new());
        assert_eq!(prefix.segment("/de_at/x"), Some("de_at"));
        assert_eq!(prefix.segment("/deu/x"), None);
    }

    #[test]
    fn test_generic_segment_ignores_supported_list() {
        assert_eq!(generic_segment("/de/x"), Some("de"));
        assert_eq!(generic_segment("/pt_br"), Some("pt_br"));
        assert_eq!(generic_segment("/about"), None);
        assert_eq!(generic_segment("/.."), None);
    }

    #[test]
    fn test_locale_from_folder() {
        assert_eq!(locale_from_folder("es", &locales()).as_deref(), Some("es"));
        assert_eq!(locale_from_folder("pt_pt", &locales()).as_deref(), Some("pt_br"));
        assert_eq!(locale_from_folder("de", &locales()), None);
    }

    #[test]
    fn test_folder_for_locale() {
        let folders = BTreeMap::from([
            ("espanol".to_string(), "es".to_string()),
            ("brasil".to_string(), "pt_br".to_string()),
        ]);
        assert_eq!(folder_for_locale("es", &folders), "espanol");
        assert_eq!(folder_for_locale("pt_pt", &folders), "brasil");
        assert_eq!(folder_for_locale("en_us", &folders), "en");
    }

    #[test]
    fn test_strip_base() {
        assert_eq!(strip_base("/shop/es/a", "/shop"), "/es/a");
        assert_eq!(strip_base("/es/a", ""), "/es/a");
    }
}
