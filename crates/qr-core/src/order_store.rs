//! # Order Store Collaborator
//!
//! Seam to the external order system. The engine only needs two calls:
//! resolve an order to its due amount at issuance time, and mark it paid
//! exactly once at settlement time.

use crate::error::QrResult;
use crate::money::Money;
use async_trait::async_trait;
use std::sync::Arc;

/// An order resolved for payment: owned by the requesting user, unpaid,
/// with a known due amount
#[derive(Debug, Clone)]
pub struct PayableOrder {
    /// Amount due, in smallest currency unit
    pub amount: Money,
}

/// External order system collaborator.
///
/// Implementations live outside the engine and are injected at
/// construction.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Resolve `order_id` to a payable order.
    ///
    /// Returns `OrderNotFound` when the order does not exist or is not
    /// owned by `user_id`, and `OrderNotPayable` when it exists but cannot
    /// accept payment (already settled).
    async fn get_payable_order(&self, order_id: &str, user_id: &str) -> QrResult<PayableOrder>;

    /// Record the order as paid, attaching `settlement_ref` (the intent's
    /// `qr_id`) as the settlement reference.
    ///
    /// Implementations must be idempotent keyed on `settlement_ref`:
    /// repeating a settlement with the same reference succeeds without a
    /// second side effect, while a different reference against an
    /// already-paid order is rejected.
    async fn mark_order_paid(&self, order_id: &str, settlement_ref: &str) -> QrResult<()>;
}

/// Type alias for a shared order store (dynamic dispatch)
pub type SharedOrderStore = Arc<dyn OrderStore>;
