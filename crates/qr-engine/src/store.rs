//! # Intent Store
//!
//! In-memory keyed table of payment intents with a unique index on nonce
//! and an order index for supersession checks. Status mutations are
//! compare-and-swap on the current status under the table lock; a plain
//! read-then-write is never exposed. Per-key async mutexes serialize the
//! multi-step sequences that span awaits (verification spans the
//! settlement call, issuance spans the order lookup).
//!
//! Intents are retained after reaching a terminal state, never deleted.

use chrono::{DateTime, Utc};
use qr_core::{IntentStatus, PaymentIntent, QrError, QrResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::Mutex as AsyncMutex;

/// Registry of async mutexes keyed by id.
///
/// Entries live for the life of the process, matching the store's
/// retention of intents.
#[derive(Default)]
struct KeyedLocks {
    inner: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl KeyedLocks {
    fn get(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut map = self.inner.lock().expect("lock registry poisoned");
        map.entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}

#[derive(Default)]
struct Tables {
    by_qr: HashMap<String, PaymentIntent>,
    nonce_to_qr: HashMap<String, String>,
    /// order_id of each live pending intent -> its qr_id
    pending_by_order: HashMap<String, String>,
}

impl Tables {
    fn clear_pending_entry(&mut self, order_id: &str, qr_id: &str) {
        if self.pending_by_order.get(order_id).map(String::as_str) == Some(qr_id) {
            self.pending_by_order.remove(order_id);
        }
    }
}

/// In-memory intent store
#[derive(Default)]
pub struct InMemoryIntentStore {
    tables: RwLock<Tables>,
    intent_locks: KeyedLocks,
    order_locks: KeyedLocks,
}

impl InMemoryIntentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Per-intent mutex. The verification path holds this across its full
    /// check-settle-transition sequence so exactly one callback proceeds
    /// past the compare-and-transition point per qr_id.
    pub fn intent_lock(&self, qr_id: &str) -> Arc<AsyncMutex<()>> {
        self.intent_locks.get(qr_id)
    }

    /// Per-order mutex held across issuance, so two issuances for one
    /// order serialize their supersession checks.
    pub fn order_lock(&self, order_id: &str) -> Arc<AsyncMutex<()>> {
        self.order_locks.get(order_id)
    }

    /// Fetch a snapshot of an intent
    pub fn get(&self, qr_id: &str) -> Option<PaymentIntent> {
        self.tables
            .read()
            .expect("intent tables poisoned")
            .by_qr
            .get(qr_id)
            .cloned()
    }

    /// The qr_id of the live pending intent for an order, if any
    pub fn pending_for_order(&self, order_id: &str) -> Option<String> {
        self.tables
            .read()
            .expect("intent tables poisoned")
            .pending_by_order
            .get(order_id)
            .cloned()
    }

    /// Insert a fresh pending intent, atomically failing the pending
    /// intent it supersedes for the same order (if one exists).
    ///
    /// Enforces global uniqueness of `qr_id` and `nonce`. Returns the
    /// superseded qr_id when one was moved to `Failed`.
    pub fn insert(&self, intent: PaymentIntent) -> QrResult<Option<String>> {
        let mut tables = self.tables.write().expect("intent tables poisoned");

        if tables.by_qr.contains_key(&intent.qr_id) {
            return Err(QrError::Internal(format!(
                "qr_id collision: {}",
                intent.qr_id
            )));
        }
        if tables.nonce_to_qr.contains_key(&intent.nonce) {
            return Err(QrError::Internal("nonce collision".to_string()));
        }

        let live_pending = tables.pending_by_order.get(&intent.order_id).cloned();
        let superseded = match live_pending {
            Some(old_id) => match tables.by_qr.get_mut(&old_id) {
                Some(old) if old.status == IntentStatus::Pending => {
                    old.status = IntentStatus::Failed;
                    Some(old_id)
                }
                _ => None,
            },
            None => None,
        };

        tables.nonce_to_qr.insert(intent.nonce.clone(), intent.qr_id.clone());
        tables
            .pending_by_order
            .insert(intent.order_id.clone(), intent.qr_id.clone());
        tables.by_qr.insert(intent.qr_id.clone(), intent);

        Ok(superseded)
    }

    /// Transition Pending -> Verified and stamp `verified_at`.
    /// Returns false when the intent is missing or no longer pending.
    pub fn mark_verified(&self, qr_id: &str, verified_at: DateTime<Utc>) -> bool {
        let mut tables = self.tables.write().expect("intent tables poisoned");
        let order_id = match tables.by_qr.get_mut(qr_id) {
            Some(intent) if intent.status == IntentStatus::Pending => {
                intent.status = IntentStatus::Verified;
                intent.verified_at = Some(verified_at);
                intent.order_id.clone()
            }
            _ => return false,
        };
        tables.clear_pending_entry(&order_id, qr_id);
        true
    }

    /// Transition Pending -> Failed.
    /// Returns false when the intent is missing or no longer pending.
    pub fn mark_failed(&self, qr_id: &str) -> bool {
        let mut tables = self.tables.write().expect("intent tables poisoned");
        let order_id = match tables.by_qr.get_mut(qr_id) {
            Some(intent) if intent.status == IntentStatus::Pending => {
                intent.status = IntentStatus::Failed;
                intent.order_id.clone()
            }
            _ => return false,
        };
        tables.clear_pending_entry(&order_id, qr_id);
        true
    }

    /// Transition Pending -> Expired when past `expires_at`.
    /// Returns false when the intent is missing, not pending, or not yet
    /// overdue.
    pub fn expire_if_overdue(&self, qr_id: &str, now: DateTime<Utc>) -> bool {
        let mut tables = self.tables.write().expect("intent tables poisoned");
        let order_id = match tables.by_qr.get_mut(qr_id) {
            Some(intent) if intent.status == IntentStatus::Pending && intent.is_overdue(now) => {
                intent.status = IntentStatus::Expired;
                intent.order_id.clone()
            }
            _ => return false,
        };
        tables.clear_pending_entry(&order_id, qr_id);
        true
    }

    /// qr_ids of pending intents past their deadline, for the sweep
    pub fn overdue_pending(&self, now: DateTime<Utc>) -> Vec<String> {
        self.tables
            .read()
            .expect("intent tables poisoned")
            .by_qr
            .values()
            .filter(|i| i.status == IntentStatus::Pending && i.is_overdue(now))
            .map(|i| i.qr_id.clone())
            .collect()
    }

    /// Total intents ever recorded (terminal intents are retained)
    pub fn len(&self) -> usize {
        self.tables.read().expect("intent tables poisoned").by_qr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
