//! fp-http: HTTP server for flowpoll
//!
//! Service crates build axum routers; this crate composes them, wraps them
//! in the shared middleware stack and serves the result.
//!
//! ```text
//! flowpoll-service binary
//!     └── fp-http (this crate)
//!         ├── Middleware stack (CORS, tracing, compression, timeout)
//!         └── Router composition
//!             ├── /         → trigger routes (start / poll)
//!             ├── /health   → health check
//!             └── /metrics  → prometheus text
//! ```

pub mod middleware;
pub mod router;
pub mod server;

pub use middleware::{MiddlewareConfig, MiddlewareStack};
pub use router::RouterBuilder;
pub use server::{HttpServer, HttpServerBuilder, ServerConfig};

// Re-export axum so service crates share one version
pub use axum;
pub use tower_http;

/// Error types for the HTTP server
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Server binding error: {0}")]
    BindError(#[from] std::io::Error),

    #[error("Invalid bind address: {0}")]
    InvalidAddress(String),
}

pub type Result<T> = std::result::Result<T, ServerError>;

/// Prelude for convenient imports by service crates
pub mod prelude {
    pub use super::axum::{
        extract::{Json, State},
        http::StatusCode,
        response::{IntoResponse, Response},
        routing::{get, post},
        Router,
    };
    pub use super::middleware::{MiddlewareConfig, MiddlewareStack};
    pub use super::router::RouterBuilder;
    pub use super::server::{HttpServer, HttpServerBuilder, ServerConfig};
}
