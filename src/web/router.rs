//! Router configuration for the slotbook web surface.

use axum::{routing::get, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{login_page, session, AppState};

/// Create the main router.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_routes = Router::new().route("/auth/session", get(session));

    Router::new()
        .route("/auth/login", get(login_page))
        .nest("/api", api_routes)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_health_router() {
        let _router = create_health_router();
        // Should not panic
    }
}
