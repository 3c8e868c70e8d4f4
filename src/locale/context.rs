//! Request-scoped locale context.

use serde::Serialize;

/// Attached to every handled request as an extension.
///
/// `locale` is set once at resolution time. `proxied` turns true only when
/// the rewrite pipeline takes over the response; nothing else writes it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LocaleContext {
    pub locale: String,
    pub proxied: bool,
}

impl LocaleContext {
    pub fn new(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            proxied: false,
        }
    }
}
