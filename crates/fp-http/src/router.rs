//! Router Composition
//!
//! Collects the routers exported by service modules into one router.

use axum::Router;
use tracing::info;

/// Builder for composing multiple service routers
pub struct RouterBuilder {
    router: Router,
    services: Vec<&'static str>,
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            services: Vec::new(),
        }
    }

    /// Mount a router under `prefix`
    pub fn nest(mut self, prefix: &'static str, name: &'static str, router: Router) -> Self {
        info!("Mounting service '{}' at {}", name, prefix);
        self.router = self.router.nest(prefix, router);
        self.services.push(name);
        self
    }

    /// Merge a router at the root
    pub fn merge(mut self, name: &'static str, router: Router) -> Self {
        info!("Mounting service '{}' at /", name);
        self.router = self.router.merge(router);
        self.services.push(name);
        self
    }

    /// Names of mounted services, in mount order
    pub fn services(&self) -> &[&'static str] {
        &self.services
    }

    pub fn build(self) -> Router {
        self.router
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience function to create a router builder
pub fn router() -> RouterBuilder {
    RouterBuilder::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode, routing::get};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_merge_and_nest() {
        let builder = router()
            .merge("root", Router::new().route("/", get(|| async { "root" })))
            .nest("/ops", "ops", Router::new().route("/ping", get(|| async { "pong" })));
        assert_eq!(builder.services(), &["root", "ops"]);

        let app = builder.build();
        let response = app
            .clone()
            .oneshot(Request::builder().uri("/ops/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::builder().uri("/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
