use std::fmt::Debug;

use chrono::Utc;
use log::*;

use crate::{
    db_types::{FulfillmentStatus, Order, PaymentStatus},
    sfg_api::{
        errors::FulfillmentError,
        order_objects::{OrderQueryFilter, OrderUpdate},
    },
    traits::{OrderManagement, StoreError},
};

/// Read access to orders, and the administrative fulfillment workflow for paid orders.
pub struct FulfillmentApi<B> {
    db: B,
}

impl<B> Debug for FulfillmentApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FulfillmentApi")
    }
}

impl<B> FulfillmentApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> FulfillmentApi<B>
where B: OrderManagement
{
    pub async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, FulfillmentError> {
        Ok(self.db.fetch_order(order_id).await?)
    }

    pub async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, FulfillmentError> {
        Ok(self.db.search_orders(query).await?)
    }

    /// Moves an order to `status`.
    ///
    /// Only approved orders may progress. Cancellation is the exception: any order that has not reached a terminal
    /// fulfillment state can be cancelled, whatever its payment status.
    pub async fn update_fulfillment(
        &self,
        order_id: i64,
        status: FulfillmentStatus,
        admin_id: &str,
        note: Option<String>,
    ) -> Result<Order, FulfillmentError> {
        let order = self.db.fetch_order(order_id).await?.ok_or(FulfillmentError::OrderNotFound(order_id))?;
        check_transition(&order, status)?;
        let mut update = OrderUpdate::default().with_fulfillment_status(status, Utc::now()).with_admin(admin_id);
        if let Some(note) = note {
            update = update.with_admin_note(note);
        }
        let order = self.db.update_order(order_id, update).await.map_err(|e| match e {
            StoreError::OrderNotFound(id) => FulfillmentError::OrderNotFound(id),
            e => FulfillmentError::StoreError(e),
        })?;
        info!("🚚️ Order #{order_id} is now {status} (by {admin_id})");
        Ok(order)
    }
}

fn check_transition(order: &Order, status: FulfillmentStatus) -> Result<(), FulfillmentError> {
    if order.fulfillment_status == status {
        return Err(FulfillmentError::NoChange(status));
    }
    if status != FulfillmentStatus::Cancelled && order.payment_status != PaymentStatus::Approved {
        return Err(FulfillmentError::PaymentNotApproved { order_id: order.id, status: order.payment_status });
    }
    if !order.fulfillment_status.can_transition_to(status) {
        return Err(FulfillmentError::InvalidTransition { from: order.fulfillment_status, to: status });
    }
    Ok(())
}
