//! Response interception.
//!
//! # States
//! ```text
//! Undecided ──inspect(head)──► PassThrough
//!     │
//!     └──────────────────────► Buffering(UrlSubstitution | Render)
//!                                   │            │
//!                          body > limit     body complete
//!                                   ▼            ▼
//!                             PassThrough     Flushed
//! ```
//!
//! The interceptor wraps the origin response instead of the outgoing
//! connection. `Sink` says where the final bytes go: to the client, or
//! nowhere when a cached copy was already sent and only the cache is being
//! refreshed.
//!
//! # Design Decisions
//! - The decision is made once, from the status line and headers
//! - Only 2xx responses are ever buffered
//! - Bodies the origin already compressed pass through untouched
//! - A body over the limit is re-emitted as a stream: the buffered prefix
//!   followed by the unread remainder

use axum::body::Body;
use axum::http::{header, response::Parts, HeaderValue};
use axum::response::Response;
use bytes::{Bytes, BytesMut};
use futures_util::stream::{self, StreamExt};

/// What a buffered body is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    UrlSubstitution,
    Render,
}

/// Where the final payload is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sink {
    Client,
    /// The client was answered from cache; output only refreshes the cache.
    CacheOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Undecided,
    PassThrough,
    Buffering(Mode),
    Flushed,
}

/// Result of draining a body while buffering.
pub enum Captured {
    Complete(Bytes),
    /// Limit exceeded; the body is intact and must be passed through.
    Overflow(Body),
    Failed(axum::Error),
}

#[derive(Debug)]
pub struct Interceptor {
    state: State,
    sink: Sink,
    substitution_requested: bool,
    max_body_bytes: usize,
}

impl Interceptor {
    pub fn new(substitution_requested: bool, sink: Sink, max_body_bytes: usize) -> Self {
        Self {
            state: State::Undecided,
            sink,
            substitution_requested,
            max_body_bytes,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn sink(&self) -> Sink {
        self.sink
    }

    /// Decide from the response head. HTML goes to the render path even when
    /// URL substitution was requested.
    pub fn inspect(&mut self, head: &Parts) -> State {
        if self.state != State::Undecided {
            return self.state;
        }

        let content_type = header_str(head, header::CONTENT_TYPE);
        let encoded = !matches!(header_str(head, header::CONTENT_ENCODING), "" | "identity");
        let declared_len = header_str(head, header::CONTENT_LENGTH).parse::<usize>().ok();

        self.state = if !head.status.is_success() {
            tracing::debug!(status = %head.status, "Error response, passing through");
            State::PassThrough
        } else if encoded {
            tracing::debug!("Origin response already encoded, passing through");
            State::PassThrough
        } else if declared_len.is_some_and(|len| len > self.max_body_bytes) {
            tracing::debug!(limit = self.max_body_bytes, "Response larger than buffer limit, passing through");
            State::PassThrough
        } else if content_type.contains("text/html") {
            State::Buffering(Mode::Render)
        } else if self.substitution_requested {
            State::Buffering(Mode::UrlSubstitution)
        } else {
            tracing::debug!(content_type = %content_type, "Not HTML, passing through");
            State::PassThrough
        };
        self.state
    }

    /// Drain `body` into memory, up to the configured limit.
    pub async fn capture(&mut self, body: Body) -> Captured {
        let mut data = body.into_data_stream();
        let mut buffer = BytesMut::new();

        while let Some(chunk) = data.next().await {
            match chunk {
                Ok(chunk) => {
                    buffer.extend_from_slice(&chunk);
                    if buffer.len() > self.max_body_bytes {
                        tracing::debug!(limit = self.max_body_bytes, "Buffer limit exceeded, streaming through");
                        self.state = State::PassThrough;
                        let prefix = stream::once(async move { Ok::<_, axum::Error>(buffer.freeze()) });
                        return Captured::Overflow(Body::from_stream(prefix.chain(data)));
                    }
                }
                Err(e) => {
                    self.state = State::Flushed;
                    return Captured::Failed(e);
                }
            }
        }
        Captured::Complete(buffer.freeze())
    }

    /// Build the final response from the origin head and a new payload.
    ///
    /// `Content-Length` is recomputed unless the origin used chunked
    /// transfer; `Content-Language` is always set.
    pub fn flush(&mut self, mut head: Parts, payload: Bytes, locale: &str, gzip: bool) -> Response {
        self.state = State::Flushed;

        head.headers.remove(header::CONTENT_LENGTH);
        if !is_chunked(&head) {
            head.headers.insert(header::CONTENT_LENGTH, HeaderValue::from(payload.len()));
        }
        if gzip {
            head.headers.insert(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        } else {
            head.headers.remove(header::CONTENT_ENCODING);
        }
        set_content_language(&mut head.headers, locale);

        Response::from_parts(head, Body::from(payload))
    }

    /// Route a finished response to the sink; `None` when it is discarded.
    pub fn deliver(&self, response: Response) -> Option<Response> {
        match self.sink {
            Sink::Client => Some(response),
            Sink::CacheOnly => None,
        }
    }
}

pub fn set_content_language(headers: &mut header::HeaderMap, locale: &str) {
    if let Ok(value) = HeaderValue::from_str(locale) {
        headers.insert(header::CONTENT_LANGUAGE, value);
    }
}

fn header_str(head: &Parts, name: header::HeaderName) -> &str {
    head.headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

fn is_chunked(head: &Parts) -> bool {
    header_str(head, header::TRANSFER_ENCODING)
        .to_ascii_lowercase()
        .contains("chunked")
}
