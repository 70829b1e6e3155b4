//! # qr-api
//!
//! HTTP API layer for qr-settle-rs.
//!
//! Provides the Axum application: routes, handlers and application state
//! wiring around the payment QR engine, plus the demo in-memory order
//! book that stands in for the external order system.

pub mod handlers;
pub mod orders;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState};
