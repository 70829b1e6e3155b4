//! # qr-core
//!
//! Core types and traits for the qr-settle payment intent engine.
//!
//! This crate provides:
//! - `PaymentIntent` and its lifecycle states for the QR payment flow
//! - The canonical signing payload contract
//! - `Money` and `Currency` for exact minor-unit amounts
//! - `OrderStore` trait for the external order system collaborator
//! - `QrError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use qr_core::{Currency, Money, OrderStore, QrError};
//!
//! // Resolve the order through the collaborator
//! let order = orders.get_payable_order("ord_1", "user_1").await?;
//!
//! // Issue an intent for it via the engine (see qr-engine)
//! let payload = engine.issue_qr("ord_1", "user_1").await?;
//!
//! // Render payload into a QR code and hand it to the client
//! ```

pub mod error;
pub mod intent;
pub mod money;
pub mod order_store;

// Re-exports for convenience
pub use error::{QrError, QrResult};
pub use intent::{
    canonical_payload, IntentStatus, IntentSummary, PaymentIntent, QrPayload,
    VerificationReceipt,
};
pub use money::{Currency, Money};
pub use order_store::{OrderStore, PayableOrder, SharedOrderStore};
