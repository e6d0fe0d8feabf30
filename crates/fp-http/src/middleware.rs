//! Shared Middleware Stack
//!
//! Applied once to the composed router so every route gets the same
//! logging, timeout and header behavior.

use axum::{
    body::Body,
    http::{header, HeaderValue, Request},
    middleware::{self, Next},
    response::Response,
    Router,
};
use std::time::{Duration, Instant};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Toggles for the shared stack. Security headers, request logging and
/// trace spans are always applied.
#[derive(Debug, Clone)]
pub struct MiddlewareConfig {
    pub cors_enabled: bool,
    pub compression_enabled: bool,
    /// Overall request deadline
    pub timeout: Duration,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            cors_enabled: true,
            compression_enabled: true,
            timeout: Duration::from_secs(30),
        }
    }
}

impl MiddlewareConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cors(mut self, enabled: bool) -> Self {
        self.cors_enabled = enabled;
        self
    }

    pub fn compression(mut self, enabled: bool) -> Self {
        self.compression_enabled = enabled;
        self
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = duration;
        self
    }
}

/// Middleware stack that can be applied to a router
pub struct MiddlewareStack {
    config: MiddlewareConfig,
}

impl MiddlewareStack {
    pub fn new(config: MiddlewareConfig) -> Self {
        Self { config }
    }

    pub fn default_stack() -> Self {
        Self::new(MiddlewareConfig::default())
    }

    /// Apply the middleware stack to a router
    pub fn apply(self, router: Router) -> Router {
        // Security headers innermost, CORS outermost
        let mut router = router
            .layer(middleware::from_fn(security_headers_middleware))
            .layer(middleware::from_fn(request_logging_middleware))
            .layer(TimeoutLayer::new(self.config.timeout));

        if self.config.compression_enabled {
            router = router.layer(CompressionLayer::new());
        }

        router = router.layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

        if self.config.cors_enabled {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }

        router
    }
}

async fn security_headers_middleware(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));

    response
}

/// Logs each request at a level derived from the response status
async fn request_logging_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    let latency_ms = start.elapsed().as_millis() as u64;
    let status = response.status().as_u16();

    if response.status().is_server_error() {
        tracing::error!(%method, %uri, status, latency_ms, "request failed");
    } else if response.status().is_client_error() {
        tracing::warn!(%method, %uri, status, latency_ms, "request rejected");
    } else {
        tracing::info!(%method, %uri, status, latency_ms, "request served");
    }

    response
}

/// Convenience function to apply default middleware
pub fn default_middleware_stack(router: Router) -> Router {
    MiddlewareStack::default_stack().apply(router)
}

/// Convenience function to apply middleware with config
pub fn apply_middleware(router: Router, config: MiddlewareConfig) -> Router {
    MiddlewareStack::new(config).apply(router)
}
