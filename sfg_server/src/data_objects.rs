use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sfg_engine::{
    db_types::{FulfillmentStatus, StockAdjustment},
    ReconcileOutcome,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }
}

/// The acknowledgement sent back to the payment provider once a notification has been handled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookAck {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ReconcileOutcome>,
    pub timestamp: DateTime<Utc>,
}

impl WebhookAck {
    pub fn processed(outcome: ReconcileOutcome) -> Self {
        Self { success: true, message: outcome.to_string(), outcome: Some(outcome), timestamp: Utc::now() }
    }
}

/// The query string the payment provider appends when it sends the buyer back to the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentReturnQuery {
    pub external_reference: Option<String>,
    pub payment_id: Option<String>,
    pub collection_id: Option<String>,
}

impl PaymentReturnQuery {
    pub fn external_reference(&self) -> Option<&str> {
        self.external_reference.as_deref().map(str::trim).filter(|r| !r.is_empty())
    }

    /// `collection_id` is the older name for the payment id. The provider sends the literal `null` when the buyer
    /// left without paying.
    pub fn payment_id(&self) -> Option<&str> {
        [&self.payment_id, &self.collection_id]
            .into_iter()
            .flatten()
            .map(|id| id.trim())
            .find(|id| !id.is_empty() && *id != "null")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FulfillmentUpdateRequest {
    pub status: FulfillmentStatus,
    pub admin_id: String,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockAction {
    SetTo,
    Intake,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockRequest {
    pub action: StockAction,
    pub quantity: i64,
    pub user_id: String,
    pub note: Option<String>,
}

impl StockRequest {
    pub fn adjustment(&self) -> StockAdjustment {
        match self.action {
            StockAction::SetTo => StockAdjustment::SetTo(self.quantity),
            StockAction::Intake => StockAdjustment::Intake(self.quantity),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MovementsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LowStockQuery {
    pub threshold: Option<i64>,
}
