//! Request-side middleware mounted in front of the origin.

pub mod locale;

pub use locale::locale_middleware;
