//! Request-side locale hints: the locale cookie and `Accept-Language`.

use axum::http::{header, HeaderMap};

/// Value of a cookie from the `Cookie` header(s).
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
}

/// Locale chosen by the visitor's cookie.
///
/// An exact match against the supported locales wins; otherwise the first
/// supported locale sharing the cookie's first two characters. Anything else
/// yields an empty string.
pub fn locale_from_cookie(cookie: Option<&str>, locale_keys: &[String]) -> String {
    let Some(cookie) = cookie.filter(|c| !c.is_empty()) else {
        return String::new();
    };
    if locale_keys.iter().any(|l| l == cookie) {
        return cookie.to_string();
    }
    let Some(language) = cookie.get(..2) else {
        return String::new();
    };
    locale_keys
        .iter()
        .find(|l| l.get(..2) == Some(language))
        .cloned()
        .unwrap_or_default()
}

/// First `Accept-Language` entry with `-` normalized to `_` (`es-MX` → `es_MX`).
pub fn locale_from_accept_language(headers: &HeaderMap) -> String {
    let Some(value) = headers
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok())
    else {
        return String::new();
    };

    let first = value.split(',').next().unwrap_or_default();
    let tag = first.split(';').next().unwrap_or_default().trim();
    tag.replacen('-', "_", 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn keys() -> Vec<String> {
        vec!["es".into(), "pt_br".into(), "pt_pt".into()]
    }

    #[test]
    fn test_cookie_value() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("a=1; locale=es ; b=2"));
        assert_eq!(cookie_value(&headers, "locale").as_deref(), Some("es"));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn test_exact_cookie_match() {
        assert_eq!(locale_from_cookie(Some("pt_pt"), &keys()), "pt_pt");
    }

    #[test]
    fn test_partial_cookie_match_takes_first_in_order() {
        assert_eq!(locale_from_cookie(Some("pt"), &keys()), "pt_br");
        assert_eq!(locale_from_cookie(Some("es_MX"), &keys()), "es");
    }

    #[test]
    fn test_unmatched_cookie() {
        assert_eq!(locale_from_cookie(Some("de"), &keys()), "");
        assert_eq!(locale_from_cookie(Some("e"), &keys()), "");
        assert_eq!(locale_from_cookie(None, &keys()), "");
    }

    #[test]
    fn test_accept_language() {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("es-MX,es;q=0.9,en;q=0.8"));
        assert_eq!(locale_from_accept_language(&headers), "es_MX");

        headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("fr;q=0.7"));
        assert_eq!(locale_from_accept_language(&headers), "fr");

        assert_eq!(locale_from_accept_language(&HeaderMap::new()), "");
    }
}
