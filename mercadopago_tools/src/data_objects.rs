use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreferenceItem {
    pub id: String,
    pub title: String,
    pub quantity: i64,
    /// In major currency units. The API only accepts non-negative prices.
    pub unit_price: f64,
    pub currency_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneNumber {
    pub area_code: String,
    pub number: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreferencePayer {
    pub name: String,
    pub surname: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<PhoneNumber>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackUrls {
    pub success: String,
    pub failure: String,
    pub pending: String,
}

/// The body of `POST /checkout/preferences`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreferenceRequest {
    pub items: Vec<PreferenceItem>,
    pub payer: PreferencePayer,
    pub back_urls: BackUrls,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_return: Option<String>,
    pub external_reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_url: Option<String>,
}

/// The subset of a checkout preference that the store uses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Preference {
    pub id: String,
    pub init_point: Option<String>,
    pub sandbox_init_point: Option<String>,
    pub external_reference: Option<String>,
}

impl Preference {
    /// The URL the buyer should be redirected to. Production accounts get `init_point`, test accounts sometimes only
    /// receive the sandbox link.
    pub fn checkout_url(&self) -> Option<&str> {
        self.init_point.as_deref().or(self.sandbox_init_point.as_deref())
    }
}

/// The subset of `GET /v1/payments/{id}` that the store uses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MercadoPagoPayment {
    pub id: u64,
    pub status: String,
    pub status_detail: Option<String>,
    pub external_reference: Option<String>,
    pub transaction_amount: Option<f64>,
    pub currency_id: Option<String>,
    pub date_created: Option<DateTime<FixedOffset>>,
    pub date_approved: Option<DateTime<FixedOffset>>,
}
