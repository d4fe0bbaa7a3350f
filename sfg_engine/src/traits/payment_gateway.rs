use serde::{Deserialize, Serialize};
use sfg_common::{Money, PaymentReport};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("The payment provider has not been configured")]
    GatewayUnconfigured,
    #[error("The payment provider rejected the request: {0}")]
    GatewayRejected(String),
}

/// One line on the hosted checkout page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionItem {
    pub id: String,
    pub title: String,
    pub quantity: i64,
    pub unit_price: Money,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPayer {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnUrls {
    pub success: String,
    pub failure: String,
    pub pending: String,
    /// Where the provider should send payment notifications.
    pub notification: Option<String>,
}

impl ReturnUrls {
    /// Derives the storefront landing pages and the webhook URL from the public base URL of the store.
    pub fn from_base_url(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            success: format!("{base}/payment/success"),
            failure: format!("{base}/payment/failure"),
            pending: format!("{base}/payment/pending"),
            notification: Some(format!("{base}/api/payment/webhook")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSessionRequest {
    pub items: Vec<SessionItem>,
    pub payer: SessionPayer,
    pub return_urls: ReturnUrls,
    pub external_reference: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub session_id: String,
    pub checkout_url: String,
}

/// The payment provider, seen from the engine.
#[allow(async_fn_in_trait)]
pub trait PaymentGateway {
    async fn create_checkout_session(&self, request: CheckoutSessionRequest) -> Result<CheckoutSession, GatewayError>;

    /// The authoritative status of a payment. Implementations must not fail: anything that prevents a definitive
    /// answer is reported as pending.
    async fn payment_status(&self, payment_id: &str) -> PaymentReport;
}
