//! # Routes
//!
//! Axum router configuration for the QR payment API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - Client API:
///   - POST /api/v1/qr - Issue a signed payment QR for an order
///   - GET  /api/v1/qr/{qr_id} - Poll intent status
///
/// - Webhooks:
///   - POST /webhook/gateway - Payment gateway verification callback
///
/// - Health:
///   - GET /health
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/qr", post(handlers::issue_qr))
        .route("/qr/{qr_id}", get(handlers::qr_status));

    // Webhook routes are signature-authenticated, no user session
    let webhook_routes = Router::new().route("/gateway", post(handlers::gateway_callback));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        .nest("/api/v1", api_routes)
        .nest("/webhook", webhook_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
