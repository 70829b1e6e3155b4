//! # Payment Intent Types
//!
//! The QR-bound payment intent record, its lifecycle states, and the
//! canonical payload used for signing.

use crate::money::{Currency, Money};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a payment intent
///
/// `Pending` is the only non-terminal state. `Verified`, `Expired` and
/// `Failed` never transition again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    /// Issued, awaiting the gateway callback
    Pending,
    /// Callback verified and order settled
    Verified,
    /// Validity window passed without a successful callback
    Expired,
    /// Rejected callback or superseded by a newer intent
    Failed,
}

impl IntentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentStatus::Pending => "pending",
            IntentStatus::Verified => "verified",
            IntentStatus::Expired => "expired",
            IntentStatus::Failed => "failed",
        }
    }

    /// Terminal states accept no further transitions
    pub fn is_terminal(&self) -> bool {
        !matches!(self, IntentStatus::Pending)
    }
}

impl Default for IntentStatus {
    fn default() -> Self {
        IntentStatus::Pending
    }
}

impl std::fmt::Display for IntentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Build the canonical signing payload.
///
/// Field order is part of the signing contract and must never change:
/// `qr_id | nonce | amount_minor | currency | order_id | expires_at_unix`,
/// joined with `|`. Verification recomputes this exact byte string.
pub fn canonical_payload(
    qr_id: &str,
    nonce: &str,
    amount: Money,
    order_id: &str,
    expires_at: DateTime<Utc>,
) -> String {
    format!(
        "{}|{}|{}|{}|{}|{}",
        qr_id,
        nonce,
        amount.amount,
        amount.currency.as_str(),
        order_id,
        expires_at.timestamp()
    )
}

/// A QR-bound payment intent
///
/// All fields except `status` and `verified_at` are immutable after
/// issuance; the signature covers the immutable fields via
/// [`canonical_payload`]. Records are retained after reaching a terminal
/// state, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    /// Opaque unique identifier, generated at issuance
    pub qr_id: String,

    /// The order this intent settles
    pub order_id: String,

    /// Owner of the intent
    pub user_id: String,

    /// Amount due, fixed at issuance to the order's due amount
    pub amount: Money,

    /// Single-use random token embedded in the signed payload; doubles as
    /// the idempotency key for the gateway callback
    pub nonce: String,

    /// HMAC over the canonical payload, computed once at issuance
    pub signature: String,

    /// Lifecycle state
    #[serde(default)]
    pub status: IntentStatus,

    /// Issuance timestamp
    pub issued_at: DateTime<Utc>,

    /// `issued_at` plus the configured validity window
    pub expires_at: DateTime<Utc>,

    /// Set once, on the transition into `Verified`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
}

impl PaymentIntent {
    /// Recompute the canonical payload from the stored fields
    pub fn canonical_payload(&self) -> String {
        canonical_payload(
            &self.qr_id,
            &self.nonce,
            self.amount,
            &self.order_id,
            self.expires_at,
        )
    }

    /// True once the validity window has passed
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// The signed payload returned at issuance.
///
/// This is what gets embedded into the rendered QR code; rendering itself
/// is out of scope here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QrPayload {
    pub qr_id: String,
    pub nonce: String,
    /// Amount in smallest currency unit
    pub amount: i64,
    pub currency: Currency,
    pub order_id: String,
    pub expires_at: DateTime<Utc>,
    pub signature: String,
}

impl QrPayload {
    /// Project the wire payload out of a stored intent
    pub fn from_intent(intent: &PaymentIntent) -> Self {
        Self {
            qr_id: intent.qr_id.clone(),
            nonce: intent.nonce.clone(),
            amount: intent.amount.amount,
            currency: intent.amount.currency,
            order_id: intent.order_id.clone(),
            expires_at: intent.expires_at,
            signature: intent.signature.clone(),
        }
    }
}

/// Read-only view returned by status polling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentSummary {
    pub qr_id: String,
    pub status: IntentStatus,
    pub expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
}

impl IntentSummary {
    pub fn from_intent(intent: &PaymentIntent) -> Self {
        Self {
            qr_id: intent.qr_id.clone(),
            status: intent.status,
            expires_at: intent.expires_at,
            verified_at: intent.verified_at,
        }
    }
}

/// Result of a successful (or idempotently replayed) verification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReceipt {
    pub qr_id: String,
    pub order_id: String,
    pub amount: Money,
    pub verified_at: DateTime<Utc>,
    /// True when this callback replayed an already-verified intent and no
    /// side effects were re-applied
    pub already_verified: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_intent() -> PaymentIntent {
        PaymentIntent {
            qr_id: "qr_abc".to_string(),
            order_id: "ord_1".to_string(),
            user_id: "user_1".to_string(),
            amount: Money::from_minor(10000, Currency::USD),
            nonce: "nonce123".to_string(),
            signature: "sig".to_string(),
            status: IntentStatus::Pending,
            issued_at: Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap(),
            expires_at: Utc.with_ymd_and_hms(2025, 1, 1, 12, 10, 0).unwrap(),
            verified_at: None,
        }
    }

    #[test]
    fn test_canonical_payload_field_order() {
        let intent = sample_intent();
        let expires_unix = intent.expires_at.timestamp();
        assert_eq!(
            intent.canonical_payload(),
            format!("qr_abc|nonce123|10000|usd|ord_1|{expires_unix}")
        );
    }

    #[test]
    fn test_canonical_payload_changes_with_fields() {
        let intent = sample_intent();
        let base = intent.canonical_payload();

        let mut tampered = intent.clone();
        tampered.amount = Money::from_minor(10001, Currency::USD);
        assert_ne!(tampered.canonical_payload(), base);

        let mut tampered = intent.clone();
        tampered.nonce = "nonce124".to_string();
        assert_ne!(tampered.canonical_payload(), base);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!IntentStatus::Pending.is_terminal());
        assert!(IntentStatus::Verified.is_terminal());
        assert!(IntentStatus::Expired.is_terminal());
        assert!(IntentStatus::Failed.is_terminal());
    }

    #[test]
    fn test_overdue() {
        let intent = sample_intent();
        assert!(!intent.is_overdue(intent.issued_at));
        assert!(!intent.is_overdue(intent.expires_at));
        assert!(intent.is_overdue(intent.expires_at + chrono::Duration::seconds(1)));
    }

    #[test]
    fn test_payload_projection() {
        let intent = sample_intent();
        let payload = QrPayload::from_intent(&intent);
        assert_eq!(payload.qr_id, intent.qr_id);
        assert_eq!(payload.amount, 10000);
        assert_eq!(payload.currency, Currency::USD);
        assert_eq!(payload.signature, intent.signature);
    }
}
