use crate::{
    db_types::{Order, PaymentStatus, WebhookRecord, WebhookRecordStatus},
    traits::{ApprovalResult, OrderManagement, StoreError},
};

/// The storage operations that payment reconciliation relies on.
#[allow(async_fn_in_trait)]
pub trait ReconciliationStore: OrderManagement {
    /// Fetches the ledger entries for `payment_id`, oldest first, optionally restricted to one status.
    async fn fetch_webhook_records(
        &self,
        payment_id: &str,
        status: Option<WebhookRecordStatus>,
    ) -> Result<Vec<WebhookRecord>, StoreError>;

    /// Writes a new `processing` marker for `payment_id`.
    async fn insert_webhook_record(&self, payment_id: &str) -> Result<WebhookRecord, StoreError>;

    async fn update_webhook_record(&self, id: i64, status: WebhookRecordStatus) -> Result<(), StoreError>;

    async fn delete_webhook_record(&self, id: i64) -> Result<(), StoreError>;

    /// Attaches the gateway's payment id to an order, but only if the order does not already carry a different one.
    /// Returns `None` if another payment id got there first.
    async fn bind_payment_id(&self, order_id: i64, payment_id: &str) -> Result<Option<Order>, StoreError>;

    /// Atomically claims a pending, unprocessed order and applies every approval side effect in one transaction:
    /// * payment status becomes `approved`, fulfillment `awaiting_shipment`, and the processed flag is raised,
    /// * stock for each line item is decremented (never below zero) with a `sale` movement recorded,
    /// * if a coupon was applied, a usage record is written and the coupon's counter goes up by one.
    ///
    /// Returns `None`, having changed nothing, if the order had already been processed or is no longer pending.
    async fn approve_order(&self, order_id: i64) -> Result<Option<ApprovalResult>, StoreError>;

    /// Records a rejected or cancelled payment against a still-pending order and cancels its fulfillment. Returns
    /// `None` if the order was no longer pending.
    async fn decline_order(&self, order_id: i64, status: PaymentStatus) -> Result<Option<Order>, StoreError>;
}
