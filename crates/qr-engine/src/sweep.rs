//! # Expiry Sweep
//!
//! Background pass that moves overdue pending intents to `Expired`, so
//! eventual consistency of the state does not depend on anyone polling.

use crate::engine::PaymentQrEngine;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Run the expiry sweep forever at the given interval.
///
/// Spawn this on the runtime at startup; it never returns. Each pass is
/// correctness-equivalent to the lazy expiry checks on the status and
/// verification paths.
pub async fn run_expiry_sweep(engine: Arc<PaymentQrEngine>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        let expired = engine.expire_overdue();
        debug!("Expiry sweep pass complete, {expired} intent(s) expired");
    }
}
