//! Named handlers a site's metadata can opt into.
//!
//! Site metadata may name a custom URL rewrite rule or a custom locale
//! detection rule. The names are looked up in a registry filled at
//! construction time; metadata never carries executable code.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::links::url::ParsedUrl;

/// Custom rule producing the URL of a page in another locale.
pub trait RewriteUrlHandler: Send + Sync {
    /// Rewrite `url` into `locale`. `from_locale` is the locale `url` is in,
    /// when known. `None` means the rule does not apply.
    fn rewrite(&self, url: &ParsedUrl, locale: &str, from_locale: Option<&str>) -> Option<String>;
}

impl<F> RewriteUrlHandler for F
where
    F: Fn(&ParsedUrl, &str, Option<&str>) -> Option<String> + Send + Sync,
{
    fn rewrite(&self, url: &ParsedUrl, locale: &str, from_locale: Option<&str>) -> Option<String> {
        self(url, locale, from_locale)
    }
}

/// Inputs available to a custom locale rule.
#[derive(Debug, Clone, Copy)]
pub struct LocaleInputs<'a> {
    pub url: &'a ParsedUrl,
    pub cookie: &'a str,
    pub site_default: &'a str,
    pub detected: &'a str,
}

/// Custom rule detecting a request's locale. `None` falls back to the site default.
pub trait LocaleHandler: Send + Sync {
    fn detect(&self, inputs: LocaleInputs<'_>) -> Option<String>;
}

impl<F> LocaleHandler for F
where
    F: Fn(LocaleInputs<'_>) -> Option<String> + Send + Sync,
{
    fn detect(&self, inputs: LocaleInputs<'_>) -> Option<String> {
        self(inputs)
    }
}

/// Registry of named handlers.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    rewrite: HashMap<String, Arc<dyn RewriteUrlHandler>>,
    locale: HashMap<String, Arc<dyn LocaleHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rewrite(mut self, name: impl Into<String>, handler: impl RewriteUrlHandler + 'static) -> Self {
        self.rewrite.insert(name.into(), Arc::new(handler));
        self
    }

    pub fn with_locale(mut self, name: impl Into<String>, handler: impl LocaleHandler + 'static) -> Self {
        self.locale.insert(name.into(), Arc::new(handler));
        self
    }

    /// Look up a rewrite handler; unknown names are logged and ignored.
    pub fn rewrite_handler(&self, name: Option<&str>) -> Option<Arc<dyn RewriteUrlHandler>> {
        let name = name.filter(|n| !n.is_empty())?;
        let found = self.rewrite.get(name).cloned();
        if found.is_none() {
            tracing::warn!(handler = %name, "Unknown URL rewrite handler named by site metadata");
        }
        found
    }

    /// Look up a locale handler; unknown names are logged and ignored.
    pub fn locale_handler(&self, name: Option<&str>) -> Option<Arc<dyn LocaleHandler>> {
        let name = name.filter(|n| !n.is_empty())?;
        let found = self.locale.get(name).cloned();
        if found.is_none() {
            tracing::warn!(handler = %name, "Unknown locale handler named by site metadata");
        }
        found
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("rewrite", &self.rewrite.keys().collect::<Vec<_>>())
            .field("locale", &self.locale.keys().collect::<Vec<_>>())
            .finish()
    }
}
