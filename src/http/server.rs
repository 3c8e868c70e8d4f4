//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the Axum router: locale middleware in front of origin forwarding
//! - Wire up middleware (tracing, timeout, request ID)
//! - Forward requests to the single configured origin
//! - Run the render health monitor alongside the server
//! - Shut down gracefully on the shared signal

use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{Request, State},
    http::{
        uri::{Authority, Scheme},
        HeaderValue, StatusCode, Uri,
    },
    response::{IntoResponse, Response},
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::gateway::Gateway;
use crate::http::request::{RequestIdExt, UuidRequestId, X_REQUEST_ID};
use crate::lifecycle::Shutdown;
use crate::locale::LocaleContext;

/// Forwarding state for the origin handler.
#[derive(Clone)]
struct OriginState {
    client: Client<HttpConnector, Body>,
    authority: Authority,
}

/// HTTP server for the locale gateway.
pub struct HttpServer {
    router: Router,
    gateway: Gateway,
}

impl HttpServer {
    /// Create a server forwarding to `origin.address`.
    pub fn new(gateway: Gateway) -> Result<Self, axum::http::uri::InvalidUri> {
        let authority = Authority::try_from(gateway.config().origin.address.as_str())?;
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        let origin = Router::new()
            .fallback(forward)
            .with_state(OriginState { client, authority });

        let router = Self::build_router(&gateway, origin);
        Ok(Self { router, gateway })
    }

    /// Mount the gateway and the shared middleware layers.
    #[allow(deprecated)]
    fn build_router(gateway: &Gateway, origin: Router) -> Router {
        let request_secs = gateway.config().timeouts.request_secs;
        gateway
            .router(origin)
            .layer(TimeoutLayer::new(Duration::from_secs(request_secs)))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until `shutdown` fires. The render health monitor runs for as
    /// long as the server does.
    pub async fn run(self, listener: TcpListener, shutdown: &Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            origin = %self.gateway.config().origin.address,
            "HTTP server starting"
        );

        let monitor = self.gateway.health_monitor();
        tokio::spawn(monitor.run(shutdown.subscribe()));

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown.wait())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Forward a request to the origin, passing the resolved locale along.
async fn forward(State(state): State<OriginState>, request: Request) -> Response {
    let start = Instant::now();
    let request_id = request.request_id().to_string();
    let (mut parts, body) = request.into_parts();

    if let Some(context) = parts.extensions.get::<LocaleContext>() {
        if let Ok(value) = HeaderValue::from_str(&context.locale) {
            parts.headers.insert("x-resolved-locale", value);
        }
        parts.headers.insert(
            "x-locale-proxied",
            HeaderValue::from_static(if context.proxied { "true" } else { "false" }),
        );
    }

    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(Scheme::HTTP);
    uri_parts.authority = Some(state.authority.clone());
    if uri_parts.path_and_query.is_none() {
        uri_parts.path_and_query = Some(axum::http::uri::PathAndQuery::from_static("/"));
    }
    parts.uri = match Uri::from_parts(uri_parts) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Cannot build origin URI");
            return (StatusCode::BAD_REQUEST, "Invalid request URI").into_response();
        }
    };

    let path = parts.uri.path().to_string();
    match state.client.request(Request::from_parts(parts, body)).await {
        Ok(response) => {
            tracing::debug!(
                request_id = %request_id,
                path = %path,
                status = %response.status(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Origin responded"
            );
            let (parts, body): (_, hyper::body::Incoming) = response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, path = %path, error = %e, "Origin request failed");
            (StatusCode::BAD_GATEWAY, "Origin request failed").into_response()
        }
    }
}
