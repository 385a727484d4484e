//! Router configuration for the trigger surface.

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{assign_slot, clear_slot, menu_check, scheduler_check, AppState};

/// Create the internal trigger router.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let scheduler_routes =
        Router::new().route("/check-for-blog-post", post(scheduler_check));

    let menu_routes = Router::new()
        .route("/check-for-blog-post", post(menu_check))
        .route("/assign-slot", post(assign_slot))
        .route("/clear-slot", post(clear_slot));

    let internal_routes = Router::new()
        .nest("/scheduler", scheduler_routes)
        .nest("/menu", menu_routes);

    Router::new()
        .nest("/internal", internal_routes)
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
