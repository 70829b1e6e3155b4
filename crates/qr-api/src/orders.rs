//! # Demo Order Book
//!
//! In-memory `OrderStore` implementation seeded from `config/orders.toml`.
//! The real order system lives in another service; this stands in for
//! local runs and tests, and honors the collaborator contract including
//! settlement idempotency keyed on the settlement reference.

use async_trait::async_trait;
use qr_core::{Currency, Money, OrderStore, PayableOrder, QrError, QrResult};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::RwLock;

/// A single order row
#[derive(Debug, Clone)]
pub struct OrderRecord {
    pub order_id: String,
    pub user_id: String,
    pub amount: Money,
    /// Settlement reference once paid (the settling intent's qr_id)
    pub settlement_ref: Option<String>,
}

impl OrderRecord {
    pub fn is_paid(&self) -> bool {
        self.settlement_ref.is_some()
    }
}

/// Seed file row (`config/orders.toml`)
#[derive(Debug, Deserialize)]
pub struct SeedOrder {
    pub order_id: String,
    pub user_id: String,
    /// Decimal amount, converted to minor units per currency
    pub amount: f64,
    #[serde(default)]
    pub currency: Currency,
}

/// Seed file layout
#[derive(Debug, Default, Deserialize)]
pub struct OrderBook {
    #[serde(default)]
    pub orders: Vec<SeedOrder>,
}

/// In-memory order store
#[derive(Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<HashMap<String, OrderRecord>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a parsed seed file
    pub fn from_seed(book: OrderBook) -> Self {
        let store = Self::new();
        for seed in book.orders {
            store.insert(OrderRecord {
                order_id: seed.order_id,
                user_id: seed.user_id,
                amount: Money::new(seed.amount, seed.currency),
                settlement_ref: None,
            });
        }
        store
    }

    /// Insert or replace an order row
    pub fn insert(&self, record: OrderRecord) {
        self.orders
            .write()
            .expect("order book poisoned")
            .insert(record.order_id.clone(), record);
    }

    /// Snapshot of an order row
    pub fn get(&self, order_id: &str) -> Option<OrderRecord> {
        self.orders
            .read()
            .expect("order book poisoned")
            .get(order_id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.orders.read().expect("order book poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn get_payable_order(&self, order_id: &str, user_id: &str) -> QrResult<PayableOrder> {
        let orders = self.orders.read().expect("order book poisoned");
        // Ownership mismatch reads the same as absence, so order ids
        // cannot be probed across users
        let order = orders
            .get(order_id)
            .filter(|o| o.user_id == user_id)
            .ok_or_else(|| QrError::OrderNotFound {
                order_id: order_id.to_string(),
            })?;

        if order.is_paid() {
            return Err(QrError::OrderNotPayable {
                order_id: order_id.to_string(),
                reason: "order already settled".to_string(),
            });
        }

        Ok(PayableOrder {
            amount: order.amount,
        })
    }

    async fn mark_order_paid(&self, order_id: &str, settlement_ref: &str) -> QrResult<()> {
        let mut orders = self.orders.write().expect("order book poisoned");
        let order = orders
            .get_mut(order_id)
            .ok_or_else(|| QrError::SettlementFailed(format!("unknown order {order_id}")))?;

        match &order.settlement_ref {
            // Idempotent on the settlement reference
            Some(existing) if existing == settlement_ref => Ok(()),
            Some(_) => Err(QrError::SettlementFailed(format!(
                "order {order_id} already settled under a different reference"
            ))),
            None => {
                order.settlement_ref = Some(settlement_ref.to_string());
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_order() -> InMemoryOrderStore {
        let store = InMemoryOrderStore::new();
        store.insert(OrderRecord {
            order_id: "ord_1".to_string(),
            user_id: "user_1".to_string(),
            amount: Money::from_minor(10000, Currency::USD),
            settlement_ref: None,
        });
        store
    }

    #[tokio::test]
    async fn test_get_payable_order() {
        let store = store_with_order();

        let order = store.get_payable_order("ord_1", "user_1").await.unwrap();
        assert_eq!(order.amount, Money::from_minor(10000, Currency::USD));

        let missing = store.get_payable_order("ord_2", "user_1").await;
        assert!(matches!(missing, Err(QrError::OrderNotFound { .. })));

        let foreign = store.get_payable_order("ord_1", "user_2").await;
        assert!(matches!(foreign, Err(QrError::OrderNotFound { .. })));
    }

    #[tokio::test]
    async fn test_mark_paid_is_idempotent_on_reference() {
        let store = store_with_order();

        store.mark_order_paid("ord_1", "qr_a").await.unwrap();
        // Same reference: no-op success
        store.mark_order_paid("ord_1", "qr_a").await.unwrap();
        // Different reference: rejected
        let other = store.mark_order_paid("ord_1", "qr_b").await;
        assert!(matches!(other, Err(QrError::SettlementFailed(_))));

        assert_eq!(store.get("ord_1").unwrap().settlement_ref.as_deref(), Some("qr_a"));
    }

    #[tokio::test]
    async fn test_paid_order_is_not_payable() {
        let store = store_with_order();
        store.mark_order_paid("ord_1", "qr_a").await.unwrap();

        let result = store.get_payable_order("ord_1", "user_1").await;
        assert!(matches!(result, Err(QrError::OrderNotPayable { .. })));
    }

    #[test]
    fn test_seed_parsing() {
        let book: OrderBook = toml::from_str(
            r#"
            [[orders]]
            order_id = "ord_1001"
            user_id = "user_1"
            amount = 100.0
            currency = "usd"

            [[orders]]
            order_id = "ord_1002"
            user_id = "user_2"
            amount = 25.5
            "#,
        )
        .unwrap();

        let store = InMemoryOrderStore::from_seed(book);
        assert_eq!(store.len(), 2);
        assert_eq!(
            store.get("ord_1001").unwrap().amount,
            Money::from_minor(10000, Currency::USD)
        );
        assert_eq!(
            store.get("ord_1002").unwrap().amount,
            Money::from_minor(2550, Currency::USD)
        );
    }
}
