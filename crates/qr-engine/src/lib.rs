//! # qr-engine
//!
//! The payment QR engine for qr-settle.
//!
//! This crate provides:
//! - `QrSigner` for HMAC-SHA256 signing and constant-time verification of
//!   the canonical intent payload
//! - `InMemoryIntentStore` with compare-and-swap status transitions and
//!   per-intent exclusivity
//! - `PaymentQrEngine` owning issuance, callback verification and
//!   idempotent settlement
//! - `run_expiry_sweep` for the background expiry pass
//! - `EngineConfig` loaded from environment variables
//!
//! ## Example
//!
//! ```rust,ignore
//! use qr_engine::{EngineConfig, PaymentQrEngine};
//!
//! let config = EngineConfig::from_env()?;
//! let engine = PaymentQrEngine::new(config, order_store);
//!
//! let payload = engine.issue_qr("ord_1", "user_1").await?;
//! // ...gateway scans the QR and calls back...
//! let receipt = engine
//!     .verify_and_process(&payload.qr_id, &payload.nonce, payload.amount, &payload.signature)
//!     .await?;
//! ```

pub mod config;
pub mod engine;
pub mod signer;
pub mod store;
pub mod sweep;

// Re-exports for convenience
pub use config::EngineConfig;
pub use engine::PaymentQrEngine;
pub use signer::QrSigner;
pub use store::InMemoryIntentStore;
pub use sweep::run_expiry_sweep;
