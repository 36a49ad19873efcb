//! Router configuration for the web server.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers;
use super::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        // Factory protocol
        .route("/api/poll", post(handlers::poll))
        .route("/api/requests/:id/fulfill", post(handlers::fulfill))
        // Listings
        .route("/api/requests", get(handlers::api_requests))
        .route("/api/factories", get(handlers::api_factories))
        .route("/api/queue", get(handlers::api_queue))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
