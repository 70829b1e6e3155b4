//! # Payment QR Engine
//!
//! Owns the lifecycle of a payment intent: issuance against the order
//! store, payload signing, callback verification, idempotent settlement,
//! and expiry.
//!
//! ## State machine
//!
//! ```text
//!           issue()                 expire (time-triggered)
//!   (none) --------> Pending ----------------------------> Expired
//!                       |
//!                       | verify_and_process() success
//!                       v
//!                    Verified --(replay with same nonce)--> cached result
//!
//!   verify with bad signature / nonce / amount while Pending --> Failed
//! ```
//!
//! `Verified`, `Expired` and `Failed` are terminal. Per qr_id, the
//! transition out of `Pending` is exclusive: the per-intent lock is held
//! across the whole check-settle-transition sequence, so concurrent
//! callbacks cannot both reach settlement.

use crate::config::EngineConfig;
use crate::signer::QrSigner;
use crate::store::InMemoryIntentStore;
use chrono::Utc;
use qr_core::{
    canonical_payload, IntentStatus, IntentSummary, PaymentIntent, QrError, QrPayload, QrResult,
    SharedOrderStore, VerificationReceipt,
};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// The payment QR engine.
///
/// Holds the signer, the intent store and the order store collaborator,
/// all injected at process startup.
pub struct PaymentQrEngine {
    signer: QrSigner,
    orders: SharedOrderStore,
    store: InMemoryIntentStore,
    config: EngineConfig,
}

impl PaymentQrEngine {
    /// Create an engine from validated configuration and an order store
    pub fn new(config: EngineConfig, orders: SharedOrderStore) -> Self {
        let signer = QrSigner::new(config.signing_secret.as_bytes().to_vec());
        Self {
            signer,
            orders,
            store: InMemoryIntentStore::new(),
            config,
        }
    }

    /// Issue a signed payment intent for an order.
    ///
    /// The order must resolve through the collaborator as owned by
    /// `user_id` and payable. A live pending intent for the same order is
    /// superseded: it moves to `Failed` atomically with the new insert,
    /// so two simultaneously valid intents for one order cannot exist.
    #[instrument(skip(self), fields(order_id = %order_id, user_id = %user_id))]
    pub async fn issue_qr(&self, order_id: &str, user_id: &str) -> QrResult<QrPayload> {
        // Serialize issuances per order so supersession checks do not race
        let order_lock = self.store.order_lock(order_id);
        let _order_guard = order_lock.lock_owned().await;

        let order = self.orders.get_payable_order(order_id, user_id).await?;
        if !order.amount.is_positive() {
            return Err(QrError::OrderNotPayable {
                order_id: order_id.to_string(),
                reason: "amount due is not positive".to_string(),
            });
        }

        // If a pending intent exists, wait out any in-flight verification
        // on it before superseding. Settlement during the wait makes the
        // order unpayable.
        let _old_guard = match self.store.pending_for_order(order_id) {
            Some(old_id) => {
                let old_lock = self.store.intent_lock(&old_id);
                let guard = old_lock.lock_owned().await;
                if matches!(self.store.get(&old_id), Some(i) if i.status == IntentStatus::Verified)
                {
                    return Err(QrError::OrderNotPayable {
                        order_id: order_id.to_string(),
                        reason: "order already settled".to_string(),
                    });
                }
                Some(guard)
            }
            None => None,
        };

        let issued_at = Utc::now();
        let expires_at = issued_at + self.config.qr_ttl;
        let qr_id = format!("qr_{}", Uuid::new_v4().simple());
        let nonce = Uuid::new_v4().simple().to_string();

        let canonical = canonical_payload(&qr_id, &nonce, order.amount, order_id, expires_at);
        let signature = self.signer.sign(&canonical);

        let intent = PaymentIntent {
            qr_id: qr_id.clone(),
            order_id: order_id.to_string(),
            user_id: user_id.to_string(),
            amount: order.amount,
            nonce,
            signature,
            status: IntentStatus::Pending,
            issued_at,
            expires_at,
            verified_at: None,
        };

        let superseded = self.store.insert(intent.clone())?;
        if let Some(old_id) = superseded {
            info!("Superseded pending intent {old_id} for order {order_id}");
        }

        info!(
            "Issued intent {} for order {} ({}), expires {}",
            qr_id,
            order_id,
            intent.amount.display(),
            expires_at.to_rfc3339()
        );

        Ok(QrPayload::from_intent(&intent))
    }

    /// Process a gateway verification callback.
    ///
    /// Runs the full check sequence under the per-intent lock: terminal
    /// state handling (with the idempotent replay of a verified intent),
    /// expiry, signature, nonce, amount, then settlement. The intent only
    /// becomes `Verified` after the order store has durably recorded the
    /// settlement; a settlement failure or timeout leaves it `Pending`
    /// and the identical callback can be retried.
    #[instrument(skip(self, nonce, signature), fields(qr_id = %qr_id))]
    pub async fn verify_and_process(
        &self,
        qr_id: &str,
        nonce: &str,
        amount: i64,
        signature: &str,
    ) -> QrResult<VerificationReceipt> {
        let lock = self.store.intent_lock(qr_id);
        let _guard = lock.lock_owned().await;

        let intent = self.store.get(qr_id).ok_or_else(|| QrError::IntentNotFound {
            qr_id: qr_id.to_string(),
        })?;

        if intent.status != IntentStatus::Pending {
            // A verified intent probed with its own nonce is the gateway
            // retrying a delivered callback: return the recorded result,
            // re-apply nothing. Any other nonce is a replay/tamper probe.
            if intent.status == IntentStatus::Verified && nonce == intent.nonce {
                let verified_at = intent.verified_at.ok_or_else(|| {
                    QrError::Internal(format!("verified intent {qr_id} missing verified_at"))
                })?;
                debug!("Replayed callback for verified intent {qr_id}");
                return Ok(VerificationReceipt {
                    qr_id: intent.qr_id,
                    order_id: intent.order_id,
                    amount: intent.amount,
                    verified_at,
                    already_verified: true,
                });
            }
            warn!(
                "Rejected callback for intent {} in terminal state {}",
                qr_id, intent.status
            );
            return Err(QrError::IntentNotPending {
                qr_id: qr_id.to_string(),
                status: intent.status,
            });
        }

        let now = Utc::now();
        if intent.is_overdue(now) {
            self.store.expire_if_overdue(qr_id, now);
            warn!("Rejected callback for expired intent {qr_id}");
            return Err(QrError::QrExpired {
                qr_id: qr_id.to_string(),
            });
        }

        // The signature is recomputed over the *stored* canonical payload,
        // never over caller-supplied fields
        if !self.signer.verify(&intent.canonical_payload(), signature) {
            self.store.mark_failed(qr_id);
            warn!("Signature mismatch on intent {qr_id}, possible tamper attempt");
            return Err(QrError::InvalidSignature {
                qr_id: qr_id.to_string(),
            });
        }

        if nonce != intent.nonce {
            self.store.mark_failed(qr_id);
            warn!("Nonce mismatch on intent {qr_id}, possible replay attempt");
            return Err(QrError::NonceMismatch {
                qr_id: qr_id.to_string(),
            });
        }

        if amount != intent.amount.amount {
            self.store.mark_failed(qr_id);
            warn!(
                "Amount mismatch on intent {}: callback carried {}, issued {}",
                qr_id, amount, intent.amount.amount
            );
            return Err(QrError::AmountMismatch {
                qr_id: qr_id.to_string(),
            });
        }

        // Settlement first, state second: the intent must not read
        // Verified before the order store has recorded the payment
        let settle = self.orders.mark_order_paid(&intent.order_id, qr_id);
        match tokio::time::timeout(self.config.settlement_timeout, settle).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                warn!("Settlement for intent {qr_id} failed: {err}");
                return Err(match err {
                    QrError::SettlementFailed(_) => err,
                    other => QrError::SettlementFailed(other.to_string()),
                });
            }
            Err(_) => {
                warn!(
                    "Settlement for intent {} timed out after {:?}",
                    qr_id, self.config.settlement_timeout
                );
                return Err(QrError::SettlementFailed(format!(
                    "order store timed out after {:?}",
                    self.config.settlement_timeout
                )));
            }
        }

        let verified_at = Utc::now();
        if !self.store.mark_verified(qr_id, verified_at) {
            return Err(QrError::Internal(format!(
                "intent {qr_id} changed state during settlement"
            )));
        }

        info!("Verified intent {} and settled order {}", qr_id, intent.order_id);
        Ok(VerificationReceipt {
            qr_id: intent.qr_id,
            order_id: intent.order_id,
            amount: intent.amount,
            verified_at,
            already_verified: false,
        })
    }

    /// Status poll for the intent's owner.
    ///
    /// Read-only apart from lazy expiry: an overdue pending intent is
    /// moved to `Expired` before the summary is built. The lazy expiry is
    /// skipped when a verification is in flight on the intent; that
    /// verification resolves the state itself.
    #[instrument(skip(self), fields(qr_id = %qr_id))]
    pub fn status(&self, qr_id: &str, user_id: &str) -> QrResult<IntentSummary> {
        let intent = self.store.get(qr_id).ok_or_else(|| QrError::IntentNotFound {
            qr_id: qr_id.to_string(),
        })?;

        if intent.user_id != user_id {
            return Err(QrError::Forbidden {
                qr_id: qr_id.to_string(),
            });
        }

        let now = Utc::now();
        if intent.status == IntentStatus::Pending && intent.is_overdue(now) {
            if let Ok(_guard) = self.store.intent_lock(qr_id).try_lock() {
                self.store.expire_if_overdue(qr_id, now);
            }
        }

        let intent = self.store.get(qr_id).ok_or_else(|| {
            QrError::Internal(format!("intent {qr_id} disappeared from the store"))
        })?;
        Ok(IntentSummary::from_intent(&intent))
    }

    /// One expiry sweep pass: move every overdue pending intent to
    /// `Expired`. Intents under active verification are skipped; the next
    /// pass or a lazy check picks them up if they stay pending.
    pub fn expire_overdue(&self) -> usize {
        let now = Utc::now();
        let mut expired = 0;
        for qr_id in self.store.overdue_pending(now) {
            let lock = self.store.intent_lock(&qr_id);
            let Ok(_guard) = lock.try_lock() else { continue };
            if self.store.expire_if_overdue(&qr_id, now) {
                debug!("Expired intent {qr_id}");
                expired += 1;
            }
        }
        if expired > 0 {
            info!("Expiry sweep moved {expired} intent(s) to expired");
        }
        expired
    }
}
