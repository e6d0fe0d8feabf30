//! HTTP Server Implementation
//!
//! Serves a composed router on one plain-HTTP listener and shuts down
//! cleanly on Ctrl-C.

use crate::middleware::{apply_middleware, MiddlewareConfig};
use crate::{Result, ServerError};
use axum::Router;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// HTTP port
    pub http_port: u16,
    /// Bind host
    pub bind_host: String,
    /// Public hostname for logging/display
    pub public_host: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: 8080,
            bind_host: "0.0.0.0".to_string(),
            public_host: gethostname::gethostname().to_string_lossy().to_string(),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.bind_host, self.http_port)
            .parse()
            .map_err(|_| {
                ServerError::InvalidAddress(format!("{}:{}", self.bind_host, self.http_port))
            })
    }
}

/// HTTP Server
pub struct HttpServer {
    config: ServerConfig,
    router: Router,
}

impl HttpServer {
    pub fn builder() -> HttpServerBuilder {
        HttpServerBuilder::new()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Serve until Ctrl-C
    pub async fn serve(self) -> Result<()> {
        let addr = self.config.socket_addr()?;
        let listener = TcpListener::bind(addr).await?;

        info!("HTTP server listening on http://{}", addr);
        info!("Public URL: http://{}:{}", self.config.public_host, self.config.http_port);

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(ServerError::BindError)?;

        info!("HTTP server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Builder for HttpServer
pub struct HttpServerBuilder {
    bind_host: String,
    http_port: u16,
    public_host: Option<String>,
    router: Option<Router>,
    middleware_config: MiddlewareConfig,
}

impl HttpServerBuilder {
    pub fn new() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            http_port: 8080,
            public_host: None,
            router: None,
            middleware_config: MiddlewareConfig::default(),
        }
    }

    /// Set bind address (host:port format or just port)
    pub fn bind(mut self, addr: impl Into<String>) -> Self {
        let addr = addr.into();
        if let Some((host, port)) = addr.rsplit_once(':') {
            if !host.is_empty() {
                self.bind_host = host.to_string();
            }
            if let Ok(p) = port.parse() {
                self.http_port = p;
            }
        } else if let Ok(p) = addr.parse::<u16>() {
            self.http_port = p;
        }
        self
    }

    pub fn http_port(mut self, port: u16) -> Self {
        self.http_port = port;
        self
    }

    pub fn public_host(mut self, host: impl Into<String>) -> Self {
        self.public_host = Some(host.into());
        self
    }

    pub fn router(mut self, router: Router) -> Self {
        self.router = Some(router);
        self
    }

    pub fn cors(mut self, enabled: bool) -> Self {
        self.middleware_config.cors_enabled = enabled;
        self
    }

    pub fn compression(mut self, enabled: bool) -> Self {
        self.middleware_config.compression_enabled = enabled;
        self
    }

    /// Overall request timeout. Keep it above the engine timeout so engine
    /// failures surface as engine errors rather than a bare 408.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.middleware_config.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<HttpServer> {
        let router = self.router.unwrap_or_default();
        let router = apply_middleware(router, self.middleware_config);

        let public_host = self
            .public_host
            .unwrap_or_else(|| gethostname::gethostname().to_string_lossy().to_string());

        let config = ServerConfig {
            http_port: self.http_port,
            bind_host: self.bind_host,
            public_host,
        };
        config.socket_addr()?;

        Ok(HttpServer { config, router })
    }
}

impl Default for HttpServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
