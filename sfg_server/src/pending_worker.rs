use std::time::Duration;

use log::*;
use sfg_engine::{events::EventProducers, ReconcileApi, ReconcileOptions, ReconcileOutcome, SqliteDatabase};
use tokio::task::JoinHandle;

use crate::integrations::mercadopago::MercadoPagoGateway;

/// Starts the pending payment worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Every `interval`, pending orders that already carry a payment id are run back through reconciliation, so that an
/// order whose notification was lost is still approved.
pub fn start_pending_worker(
    db: SqliteDatabase,
    gateway: MercadoPagoGateway,
    producers: EventProducers,
    options: ReconcileOptions,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        let api = ReconcileApi::new(db, gateway, producers, options);
        info!("🕰️ Pending payment worker started. Checking every {}s", interval.as_secs());
        loop {
            timer.tick().await;
            debug!("🕰️ Running pending payment check");
            match api.recheck_pending_payments().await {
                Ok(outcomes) if outcomes.is_empty() => trace!("🕰️ No pending payments to check"),
                Ok(outcomes) => {
                    let approved = approved_orders(&outcomes);
                    info!("🕰️ {} pending payment(s) checked. {} order(s) approved", outcomes.len(), approved.len());
                    if !approved.is_empty() {
                        debug!("🕰️ Approved orders: {}", order_list(&approved));
                    }
                },
                Err(e) => {
                    error!("🕰️ Error running pending payment check: {e}");
                },
            }
        }
    })
}

fn approved_orders(outcomes: &[ReconcileOutcome]) -> Vec<i64> {
    outcomes
        .iter()
        .filter_map(|o| match o {
            ReconcileOutcome::Approved { order_id, .. } => Some(*order_id),
            _ => None,
        })
        .collect()
}

fn order_list(ids: &[i64]) -> String {
    ids.iter().map(|id| format!("#{id}")).collect::<Vec<String>>().join(", ")
}
