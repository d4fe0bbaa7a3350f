use std::{fmt::Display, str::FromStr};

use chrono::{Duration, Utc};
use log::*;
use serde::{Deserialize, Serialize};
use sfg_common::{is_valid_payment_id, GatewayStatus, PaymentReport};

use crate::{
    db_types::{Order, PaymentStatus, WebhookRecordStatus},
    events::{EventProducers, OrderApprovedEvent},
    sfg_api::{errors::ReconcileError, order_objects::OrderQueryFilter},
    traits::{ApprovalResult, PaymentGateway, ReconciliationStore},
};

/// Processing markers older than this are assumed to belong to a reconciliation that died, and no longer hold back
/// newer deliveries.
const STALE_MARKER_AGE_MINUTES: i64 = 5;

/// How to find the order for a payment id that no order carries yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Use the external reference the payment provider reports for the payment.
    #[default]
    ExternalReference,
    /// Adopt the oldest pending order that has no payment id.
    FirstPending,
}

impl FromStr for MatchStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "external_reference" => Ok(Self::ExternalReference),
            "first_pending" => Ok(Self::FirstPending),
            other => Err(format!("Unknown match strategy: {other}")),
        }
    }
}

impl Display for MatchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExternalReference => write!(f, "external_reference"),
            Self::FirstPending => write!(f, "first_pending"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileOptions {
    pub match_strategy: MatchStrategy,
    /// When set, rejected and cancelled payments are written onto still-pending orders. Otherwise only approvals
    /// change order state.
    pub record_declined_payments: bool,
}

/// What a reconciliation run did. Every variant is a success from the notifier's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// The provider does not (yet) report the payment as approved. Nothing changed.
    NotApproved { payment_id: String, status: GatewayStatus },
    /// The order was moved to a rejected or cancelled payment status.
    Declined { payment_id: String, order_id: i64, status: PaymentStatus },
    /// This payment id has already been reconciled successfully.
    AlreadyCompleted { payment_id: String },
    /// Another delivery of the same notification is being processed right now.
    ConcurrentDelivery { payment_id: String },
    /// No order could be matched to the payment.
    OrderNotFound { payment_id: String },
    /// The order's side effects have already been applied.
    AlreadyProcessed { payment_id: String, order_id: i64 },
    /// The order's payment status was already final and cannot change.
    PaymentAlreadyFinal { payment_id: String, order_id: i64, status: PaymentStatus },
    /// The order was approved and stock and coupon accounting applied.
    Approved { payment_id: String, order_id: i64 },
}

impl Display for ReconcileOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotApproved { payment_id, status } => write!(f, "Payment {payment_id} is {status}. No changes made"),
            Self::Declined { payment_id, order_id, status } => {
                write!(f, "Payment {payment_id} was {status}. Order {order_id} updated")
            },
            Self::AlreadyCompleted { payment_id } => write!(f, "Payment {payment_id} was already processed"),
            Self::ConcurrentDelivery { payment_id } => write!(f, "Payment {payment_id} is being processed"),
            Self::OrderNotFound { payment_id } => write!(f, "No order found for payment {payment_id}"),
            Self::AlreadyProcessed { payment_id, order_id } => {
                write!(f, "Order {order_id} was already processed for payment {payment_id}")
            },
            Self::PaymentAlreadyFinal { payment_id, order_id, status } => {
                write!(f, "Order {order_id} is already {status}. Payment {payment_id} ignored")
            },
            Self::Approved { payment_id, order_id } => write!(f, "Order {order_id} approved by payment {payment_id}"),
        }
    }
}

/// What happened when a buyer came back from the payment provider's checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum PaymentReturn {
    /// The provider confirmed that the payment belongs to the order. The payment id is now linked to the order and
    /// the payment was reconciled.
    Linked { order_id: i64, outcome: ReconcileOutcome },
    /// The provider could not confirm that the payment belongs to the order. Nothing changed.
    Unconfirmed { order_id: i64, payment_id: String },
    /// The order's payment was settled before the buyer returned.
    AlreadySettled { order_id: i64, status: PaymentStatus },
}

/// `ReconcileApi` turns payment notifications into order state changes.
///
/// A notification is only ever treated as a hint that something changed for a payment id. The authoritative status
/// always comes from the payment provider, and an order's side effects (stock and coupon accounting) are applied at
/// most once, no matter how many times, or how concurrently, the same notification arrives.
pub struct ReconcileApi<B, G> {
    db: B,
    gateway: G,
    producers: EventProducers,
    options: ReconcileOptions,
}

impl<B, G> std::fmt::Debug for ReconcileApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconcileApi ({:?})", self.options)
    }
}

impl<B, G> ReconcileApi<B, G> {
    pub fn new(db: B, gateway: G, producers: EventProducers, options: ReconcileOptions) -> Self {
        Self { db, gateway, producers, options }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn options(&self) -> &ReconcileOptions {
        &self.options
    }
}

impl<B, G> ReconcileApi<B, G>
where
    B: ReconciliationStore,
    G: PaymentGateway,
{
    /// Reconciles a single payment id.
    ///
    /// Errors are only returned for genuine processing failures (typically the store being unavailable). In that
    /// case the processing marker is flagged as failed, so a redelivery of the notification will try again.
    pub async fn process_payment_notification(&self, payment_id: &str) -> Result<ReconcileOutcome, ReconcileError> {
        let payment_id = payment_id.trim();
        let report = self.gateway.payment_status(payment_id).await;
        debug!("🔄️ The payment provider reports payment {payment_id} as {}", report.status);
        if !report.status.is_approved() {
            return self.handle_unapproved_payment(payment_id, &report).await;
        }

        let completed = self.db.fetch_webhook_records(payment_id, Some(WebhookRecordStatus::Completed)).await?;
        if !completed.is_empty() {
            info!("🔄️ Payment {payment_id} has already been reconciled. Ignoring duplicate notification.");
            return Ok(ReconcileOutcome::AlreadyCompleted { payment_id: payment_id.to_string() });
        }

        let marker = self.db.insert_webhook_record(payment_id).await?;
        let stale_before = Utc::now() - Duration::minutes(STALE_MARKER_AGE_MINUTES);
        let markers = self.db.fetch_webhook_records(payment_id, Some(WebhookRecordStatus::Processing)).await?;
        let oldest_live = markers.iter().find(|m| m.created_at >= stale_before || m.id == marker.id);
        if oldest_live.map(|m| m.id) != Some(marker.id) {
            info!("🔄️ Payment {payment_id} is already being reconciled by another delivery. Standing down.");
            self.db.delete_webhook_record(marker.id).await?;
            return Ok(ReconcileOutcome::ConcurrentDelivery { payment_id: payment_id.to_string() });
        }

        match self.apply_approval(payment_id, &report).await {
            Ok(ReconcileOutcome::OrderNotFound { payment_id }) => {
                // Leave no trace, so that a later delivery can still match an order created in the meantime
                self.db.delete_webhook_record(marker.id).await?;
                Ok(ReconcileOutcome::OrderNotFound { payment_id })
            },
            Ok(outcome) => {
                self.db.update_webhook_record(marker.id, WebhookRecordStatus::Completed).await?;
                Ok(outcome)
            },
            Err(e) => {
                error!("🔄️ Reconciliation of payment {payment_id} failed. {e}");
                if let Err(e) = self.db.update_webhook_record(marker.id, WebhookRecordStatus::Failed).await {
                    error!("🔄️ Could not flag the processing marker for payment {payment_id} as failed. {e}");
                }
                Err(e)
            },
        }
    }

    /// Re-runs reconciliation for an order that already carries a payment id.
    pub async fn reconcile_order(&self, order_id: i64) -> Result<ReconcileOutcome, ReconcileError> {
        let order = self.db.fetch_order(order_id).await?.ok_or(ReconcileError::OrderNotFound(order_id))?;
        let payment_id = order.payment_id.ok_or(ReconcileError::NoPaymentId(order_id))?;
        self.process_payment_notification(&payment_id).await
    }

    /// Links the payment id carried by a checkout return redirect to the order with the given external reference.
    ///
    /// Nothing in the redirect is trusted. The payment is only linked once the provider confirms that it was made for
    /// this order, and the payment's status is then taken from the provider like any notification. A payment that is
    /// still pending stays linked, so [`Self::recheck_pending_payments`] will pick it up even if its notification is
    /// never delivered.
    pub async fn record_payment_return(
        &self,
        external_reference: &str,
        payment_id: &str,
    ) -> Result<PaymentReturn, ReconcileError> {
        let payment_id = payment_id.trim();
        if !is_valid_payment_id(payment_id) {
            return Err(ReconcileError::InvalidPaymentId(payment_id.to_string()));
        }
        let query = OrderQueryFilter::default().with_external_reference(external_reference);
        let order = self
            .db
            .search_orders(query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ReconcileError::UnknownReference(external_reference.to_string()))?;
        let order_id = order.id;
        if order.payment_id.as_deref().is_some_and(|p| p != payment_id) {
            return Err(ReconcileError::PaymentIdMismatch { order_id, payment_id: payment_id.to_string() });
        }
        if order.payment_status != PaymentStatus::Pending {
            debug!("🔄️ Buyer returned to order {order_id}, which is already {}", order.payment_status);
            return Ok(PaymentReturn::AlreadySettled { order_id, status: order.payment_status });
        }
        let report = self.gateway.payment_status(payment_id).await;
        if report.external_reference.as_deref() != Some(external_reference) {
            warn!(
                "🔄️ The payment provider does not confirm that payment {payment_id} belongs to order {order_id}. The \
                 return is ignored."
            );
            return Ok(PaymentReturn::Unconfirmed { order_id, payment_id: payment_id.to_string() });
        }
        if order.payment_id.is_none() {
            self.db
                .bind_payment_id(order_id, payment_id)
                .await?
                .ok_or_else(|| ReconcileError::PaymentIdMismatch { order_id, payment_id: payment_id.to_string() })?;
            info!("🔄️ Payment {payment_id} linked to order {order_id} from the checkout return");
        }
        let outcome = self.process_payment_notification(payment_id).await?;
        Ok(PaymentReturn::Linked { order_id, outcome })
    }

    /// Runs every pending order that already knows its payment id back through reconciliation. This recovers orders
    /// whose notifications were lost. Individual failures are logged and skipped.
    pub async fn recheck_pending_payments(&self) -> Result<Vec<ReconcileOutcome>, ReconcileError> {
        let query = OrderQueryFilter::default().with_payment_status(PaymentStatus::Pending);
        let pending = self.db.search_orders(query).await?;
        let mut outcomes = Vec::new();
        for order in pending {
            let Some(payment_id) = order.payment_id else {
                continue;
            };
            match self.process_payment_notification(&payment_id).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => warn!("🔄️ Could not re-check payment {payment_id} for order {}. {e}", order.id),
            }
        }
        Ok(outcomes)
    }

    async fn handle_unapproved_payment(
        &self,
        payment_id: &str,
        report: &PaymentReport,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let not_approved = ReconcileOutcome::NotApproved { payment_id: payment_id.to_string(), status: report.status };
        if !(self.options.record_declined_payments && report.status.is_declined()) {
            return Ok(not_approved);
        }
        let status = match report.status {
            GatewayStatus::Rejected => PaymentStatus::Rejected,
            _ => PaymentStatus::Cancelled,
        };
        let Some(order) = self.locate_order(payment_id, report).await? else {
            return Ok(not_approved);
        };
        match self.db.decline_order(order.id, status).await? {
            Some(order) => {
                info!("🔄️ Order {} marked as {status} after payment {payment_id} was declined", order.id);
                Ok(ReconcileOutcome::Declined { payment_id: payment_id.to_string(), order_id: order.id, status })
            },
            None => Ok(not_approved),
        }
    }

    async fn apply_approval(
        &self,
        payment_id: &str,
        report: &PaymentReport,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let Some(order) = self.locate_order(payment_id, report).await? else {
            warn!("🔄️ No order matches approved payment {payment_id}. The notification is dropped.");
            return Ok(ReconcileOutcome::OrderNotFound { payment_id: payment_id.to_string() });
        };
        let order_id = order.id;
        if order.webhook_processed {
            info!("🔄️ Order {order_id} has already been processed. No side effects will be applied again.");
            return Ok(ReconcileOutcome::AlreadyProcessed { payment_id: payment_id.to_string(), order_id });
        }
        if order.payment_status.is_final() {
            warn!(
                "🔄️ Order {order_id} is already {} and cannot be approved by payment {payment_id}",
                order.payment_status
            );
            return Ok(ReconcileOutcome::PaymentAlreadyFinal {
                payment_id: payment_id.to_string(),
                order_id,
                status: order.payment_status,
            });
        }
        match self.db.approve_order(order_id).await? {
            Some(result) => {
                info!(
                    "🔄️ Order {order_id} approved by payment {payment_id}. {} stock movement(s) recorded.",
                    result.movements.len()
                );
                self.call_order_approved_hook(result).await;
                Ok(ReconcileOutcome::Approved { payment_id: payment_id.to_string(), order_id })
            },
            None => {
                info!("🔄️ Order {order_id} was claimed by a concurrent reconciliation.");
                Ok(ReconcileOutcome::AlreadyProcessed { payment_id: payment_id.to_string(), order_id })
            },
        }
    }

    /// Finds the order for a payment: first by the payment id itself, then according to the configured
    /// [`MatchStrategy`]. A fallback match has the payment id bound onto it before it is returned.
    async fn locate_order(&self, payment_id: &str, report: &PaymentReport) -> Result<Option<Order>, ReconcileError> {
        let by_payment_id = self.db.search_orders(OrderQueryFilter::default().with_payment_id(payment_id)).await?;
        if let Some(order) = by_payment_id.into_iter().next() {
            trace!("🔄️ Order {} carries payment id {payment_id}", order.id);
            return Ok(Some(order));
        }
        let candidates = match self.options.match_strategy {
            MatchStrategy::ExternalReference => match &report.external_reference {
                Some(reference) => {
                    let query = OrderQueryFilter::default().with_external_reference(reference);
                    self.db.search_orders(query).await?
                },
                None => {
                    warn!("🔄️ Payment {payment_id} has no external reference, so no order can be matched to it");
                    Vec::new()
                },
            },
            MatchStrategy::FirstPending => {
                let query = OrderQueryFilter::default().with_payment_status(PaymentStatus::Pending);
                let unbound =
                    self.db.search_orders(query).await?.into_iter().filter(|o| o.payment_id.is_none()).collect::<Vec<_>>();
                if unbound.len() > 1 {
                    warn!(
                        "🔄️ {} pending orders could match payment {payment_id}. Adopting the oldest one. Consider the \
                         external_reference match strategy.",
                        unbound.len()
                    );
                }
                unbound
            },
        };
        let candidate = candidates.into_iter().find(|o| o.payment_id.as_deref().map_or(true, |p| p == payment_id));
        let Some(candidate) = candidate else {
            return Ok(None);
        };
        let bound = self.db.bind_payment_id(candidate.id, payment_id).await?;
        match &bound {
            Some(order) => debug!("🔄️ Payment id {payment_id} bound to order {}", order.id),
            None => warn!("🔄️ Order {} acquired a different payment id before {payment_id} could be bound", candidate.id),
        }
        Ok(bound)
    }

    async fn call_order_approved_hook(&self, result: ApprovalResult) {
        for emitter in &self.producers.order_approved_producer {
            debug!("🔄️ Notifying order approved hook subscribers");
            let event = OrderApprovedEvent::new(result.order.clone(), result.movements.clone());
            emitter.publish_event(event).await;
        }
    }
}
