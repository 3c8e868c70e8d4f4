//! Lossless URL splitting.
//!
//! Links found in sitemaps and pages are rebuilt from their parts, so the
//! parser keeps every component verbatim instead of normalizing it the way
//! `url::Url` does. Relative references (`/about?x=1`) are accepted.

/// A URL split into the parts the link builder recombines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedUrl {
    /// Scheme without the trailing colon (`https`).
    pub scheme: Option<String>,
    /// Lowercased authority, port included (`example.com:8080`).
    pub host: Option<String>,
    /// Path, always starting with `/`.
    pub path: String,
    /// Query including the leading `?`, or empty.
    pub query: String,
    /// Fragment including the leading `#`, or empty.
    pub fragment: String,
}

impl ParsedUrl {
    pub fn parse(input: &str) -> Self {
        let (rest, fragment) = match input.find('#') {
            Some(idx) => (&input[..idx], input[idx..].to_string()),
            None => (input, String::new()),
        };
        let (rest, query) = match rest.find('?') {
            Some(idx) => (&rest[..idx], rest[idx..].to_string()),
            None => (rest, String::new()),
        };

        let (scheme, after_scheme) = match rest.find("://") {
            Some(idx) if is_scheme(&rest[..idx]) => {
                (Some(rest[..idx].to_ascii_lowercase()), Some(&rest[idx + 3..]))
            }
            _ => (None, rest.strip_prefix("//")),
        };

        let (host, path) = match after_scheme {
            Some(authority_and_path) => match authority_and_path.find('/') {
                Some(idx) => (
                    Some(authority_and_path[..idx].to_ascii_lowercase()),
                    &authority_and_path[idx..],
                ),
                None => (Some(authority_and_path.to_ascii_lowercase()), ""),
            },
            None => (None, rest),
        };

        let path = if path.is_empty() {
            "/".to_string()
        } else if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };

        Self {
            scheme,
            host: host.filter(|h| !h.is_empty()),
            path,
            query,
            fragment,
        }
    }

    /// Host without the port.
    pub fn hostname(&self) -> Option<&str> {
        self.host.as_deref().map(|h| match h.rfind(':') {
            Some(idx) if !h.ends_with(']') => &h[..idx],
            _ => h,
        })
    }

    /// `scheme://host`, or `//host` for scheme-relative URLs.
    pub fn origin(&self) -> String {
        let host = self.host.as_deref().unwrap_or_default();
        match &self.scheme {
            Some(scheme) => format!("{}://{}", scheme, host),
            None => format!("//{}", host),
        }
    }

    /// Path, query and fragment.
    pub fn path_and_rest(&self) -> String {
        format!("{}{}{}", self.path, self.query, self.fragment)
    }

    /// The full reference, absolute when a host is known.
    pub fn href(&self) -> String {
        match self.host {
            Some(_) => format!("{}{}", self.origin(), self.path_and_rest()),
            None => self.path_and_rest(),
        }
    }

    /// Decoded value of a query parameter.
    pub fn query_param(&self, name: &str) -> Option<String> {
        let raw = self.query.strip_prefix('?').unwrap_or(&self.query);
        url::form_urlencoded::parse(raw.as_bytes())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }
}

fn is_scheme(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}
