//! # QR Payment Error Types
//!
//! Typed error handling for the qr-settle engine.
//! All operations return `Result<T, QrError>`.

use crate::intent::IntentStatus;
use thiserror::Error;

/// Core error type for all payment intent operations
#[derive(Debug, Error)]
pub enum QrError {
    /// Configuration errors (missing secret, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid request data rejected at the boundary
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Order does not exist or is not owned by the caller
    #[error("Order not found: {order_id}")]
    OrderNotFound { order_id: String },

    /// Order exists but cannot be paid (already settled, zero balance)
    #[error("Order not payable: {order_id}: {reason}")]
    OrderNotPayable { order_id: String, reason: String },

    /// No intent recorded under the given qr_id
    #[error("Payment intent not found: {qr_id}")]
    IntentNotFound { qr_id: String },

    /// Intent is in a terminal state and cannot accept this callback
    #[error("Payment intent {qr_id} is {status}, not pending")]
    IntentNotPending { qr_id: String, status: IntentStatus },

    /// QR validity window has passed
    #[error("QR expired: {qr_id}")]
    QrExpired { qr_id: String },

    /// Supplied signature does not match the canonical payload
    #[error("Invalid signature for intent {qr_id}")]
    InvalidSignature { qr_id: String },

    /// Supplied nonce does not match the issued nonce
    #[error("Nonce mismatch for intent {qr_id}")]
    NonceMismatch { qr_id: String },

    /// Supplied amount does not exactly match the issued amount
    #[error("Amount mismatch for intent {qr_id}")]
    AmountMismatch { qr_id: String },

    /// Settlement against the order store failed or timed out; the intent
    /// stays pending and the callback is safe to retry
    #[error("Settlement failed: {0}")]
    SettlementFailed(String),

    /// Caller does not own the intent
    #[error("Forbidden: intent {qr_id} belongs to another user")]
    Forbidden { qr_id: String },

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl QrError {
    /// Returns true if this error is retryable with identical parameters
    pub fn is_retryable(&self) -> bool {
        matches!(self, QrError::SettlementFailed(_))
    }

    /// Returns true for verification-path rejections that must not leak
    /// which check failed to the gateway. The HTTP layer collapses these
    /// into one generic "verification failed" response.
    pub fn is_verification_rejection(&self) -> bool {
        matches!(
            self,
            QrError::IntentNotFound { .. }
                | QrError::IntentNotPending { .. }
                | QrError::QrExpired { .. }
                | QrError::InvalidSignature { .. }
                | QrError::NonceMismatch { .. }
                | QrError::AmountMismatch { .. }
        )
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            QrError::Configuration(_) => 500,
            QrError::InvalidRequest(_) => 400,
            QrError::OrderNotFound { .. } => 404,
            QrError::OrderNotPayable { .. } => 409,
            QrError::IntentNotFound { .. } => 404,
            QrError::IntentNotPending { .. } => 409,
            QrError::QrExpired { .. } => 410,
            QrError::InvalidSignature { .. } => 401,
            QrError::NonceMismatch { .. } => 401,
            QrError::AmountMismatch { .. } => 409,
            QrError::SettlementFailed(_) => 503,
            QrError::Forbidden { .. } => 403,
            QrError::Internal(_) => 500,
        }
    }
}

/// Result type alias for payment intent operations
pub type QrResult<T> = Result<T, QrError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(QrError::SettlementFailed("timeout".into()).is_retryable());
        assert!(!QrError::InvalidSignature { qr_id: "qr_1".into() }.is_retryable());
        assert!(!QrError::QrExpired { qr_id: "qr_1".into() }.is_retryable());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            QrError::OrderNotFound {
                order_id: "ord_1".into()
            }
            .status_code(),
            404
        );
        assert_eq!(QrError::QrExpired { qr_id: "qr_1".into() }.status_code(), 410);
        assert_eq!(QrError::SettlementFailed("down".into()).status_code(), 503);
        assert_eq!(QrError::Forbidden { qr_id: "qr_1".into() }.status_code(), 403);
    }

    #[test]
    fn test_verification_rejections_are_masked() {
        let masked = [
            QrError::IntentNotFound { qr_id: "qr_1".into() },
            QrError::IntentNotPending {
                qr_id: "qr_1".into(),
                status: IntentStatus::Failed,
            },
            QrError::QrExpired { qr_id: "qr_1".into() },
            QrError::InvalidSignature { qr_id: "qr_1".into() },
            QrError::NonceMismatch { qr_id: "qr_1".into() },
            QrError::AmountMismatch { qr_id: "qr_1".into() },
        ];
        for err in masked {
            assert!(err.is_verification_rejection(), "{err} should be masked");
        }
        assert!(!QrError::SettlementFailed("down".into()).is_verification_rejection());
        assert!(!QrError::Forbidden { qr_id: "qr_1".into() }.is_verification_rejection());
    }
}
