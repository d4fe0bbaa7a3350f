use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{FulfillmentStatus, PaymentStatus};

/// Field-equality search over orders. Unset fields are ignored; set fields are combined with `AND`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderQueryFilter {
    pub payment_id: Option<String>,
    pub external_reference: Option<String>,
    pub checkout_session_id: Option<String>,
    pub customer_email: Option<String>,
    pub payment_status: Option<PaymentStatus>,
    pub fulfillment_status: Option<FulfillmentStatus>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl OrderQueryFilter {
    pub fn with_payment_id<S: Into<String>>(mut self, payment_id: S) -> Self {
        self.payment_id = Some(payment_id.into());
        self
    }

    pub fn with_external_reference<S: Into<String>>(mut self, reference: S) -> Self {
        self.external_reference = Some(reference.into());
        self
    }

    pub fn with_checkout_session_id<S: Into<String>>(mut self, session_id: S) -> Self {
        self.checkout_session_id = Some(session_id.into());
        self
    }

    pub fn with_customer_email<S: Into<String>>(mut self, email: S) -> Self {
        self.customer_email = Some(email.into());
        self
    }

    pub fn with_payment_status(mut self, status: PaymentStatus) -> Self {
        self.payment_status = Some(status);
        self
    }

    pub fn with_fulfillment_status(mut self, status: FulfillmentStatus) -> Self {
        self.fulfillment_status = Some(status);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.payment_id.is_none() &&
            self.external_reference.is_none() &&
            self.checkout_session_id.is_none() &&
            self.customer_email.is_none() &&
            self.payment_status.is_none() &&
            self.fulfillment_status.is_none() &&
            self.since.is_none() &&
            self.until.is_none()
    }
}

/// A partial update to an order. Only the fields that are set are written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub payment_id: Option<String>,
    pub payment_status: Option<PaymentStatus>,
    pub fulfillment_status: Option<FulfillmentStatus>,
    pub webhook_processed_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub payment_cancelled_at: Option<DateTime<Utc>>,
    pub preparing_at: Option<DateTime<Utc>>,
    pub ready_at: Option<DateTime<Utc>>,
    pub in_transit_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub admin_note: Option<String>,
    pub admin_id: Option<String>,
}

impl OrderUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn with_payment_id<S: Into<String>>(mut self, payment_id: S) -> Self {
        self.payment_id = Some(payment_id.into());
        self
    }

    pub fn with_payment_status(mut self, status: PaymentStatus) -> Self {
        self.payment_status = Some(status);
        self
    }

    /// Sets the fulfillment status and stamps the matching transition timestamp.
    pub fn with_fulfillment_status(mut self, status: FulfillmentStatus, at: DateTime<Utc>) -> Self {
        self.fulfillment_status = Some(status);
        match status {
            FulfillmentStatus::AwaitingShipment => {},
            FulfillmentStatus::Preparing => self.preparing_at = Some(at),
            FulfillmentStatus::ReadyForPickup => self.ready_at = Some(at),
            FulfillmentStatus::InTransit => self.in_transit_at = Some(at),
            FulfillmentStatus::Delivered => self.delivered_at = Some(at),
            FulfillmentStatus::Cancelled => self.cancelled_at = Some(at),
        }
        self
    }

    pub fn with_admin<S: Into<String>>(mut self, admin_id: S) -> Self {
        self.admin_id = Some(admin_id.into());
        self
    }

    pub fn with_admin_note<S: Into<String>>(mut self, note: S) -> Self {
        self.admin_note = Some(note.into());
        self
    }
}
