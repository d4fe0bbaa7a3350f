//! Payment notification parsing.
//!
//! The payment provider has delivered notifications in three shapes over the years:
//! * a JSON body, `{"type": "payment", "data": {"id": "1319718851"}}`,
//! * query parameters, `?type=payment&data.id=1319718851`,
//! * legacy IPN query parameters, `?topic=payment&id=1319718851`.
//!
//! [`WebhookNotification`] models the three shapes and [`WebhookNotification::normalize`] collapses them into a
//! [`NormalizedNotification`] before anything else looks at the request.
use std::collections::HashMap;

use log::*;
use serde::Deserialize;
use sfg_common::is_valid_payment_id;

use crate::errors::ServerError;

const PAYMENT_TYPE: &str = "payment";
/// Merchant-order aggregates carry no payment id the reconciler can use.
const MERCHANT_ORDER_TYPES: [&str; 2] = ["merchant_order", "topic_merchant_order_wh"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookNotification {
    Body { kind: String, data_id: String },
    TypeQuery { kind: String, data_id: String },
    TopicQuery { topic: String, id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedNotification {
    Payment { payment_id: String },
    /// Acknowledged and dropped.
    Ignored { reason: String },
}

#[derive(Deserialize)]
struct NotificationBody {
    #[serde(rename = "type")]
    kind: String,
    data: NotificationData,
}

#[derive(Deserialize)]
struct NotificationData {
    id: NotificationId,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NotificationId {
    Text(String),
    Number(u64),
}

impl NotificationId {
    fn into_string(self) -> String {
        match self {
            NotificationId::Text(s) => s.trim().to_string(),
            NotificationId::Number(n) => n.to_string(),
        }
    }
}

impl WebhookNotification {
    /// Recognises the notification shape. The body takes precedence over the query string.
    pub fn parse(query: &HashMap<String, String>, body: &[u8]) -> Result<Self, ServerError> {
        if let Some(notification) = Self::from_body(body) {
            return Ok(notification);
        }
        let param = |name: &str| query.get(name).map(|s| s.trim()).filter(|s| !s.is_empty()).map(String::from);
        if let (Some(kind), Some(data_id)) = (param("type"), param("data.id")) {
            return Ok(Self::TypeQuery { kind, data_id });
        }
        if let (Some(topic), Some(id)) = (param("topic"), param("id")) {
            return Ok(Self::TopicQuery { topic, id });
        }
        debug!("🪝️ No notification could be read from the request");
        Err(ServerError::InvalidWebhookData)
    }

    fn from_body(body: &[u8]) -> Option<Self> {
        if body.is_empty() {
            return None;
        }
        match serde_json::from_slice::<NotificationBody>(body) {
            Ok(NotificationBody { kind, data }) => {
                let data_id = data.id.into_string();
                let kind = kind.trim().to_string();
                (!kind.is_empty() && !data_id.is_empty()).then_some(Self::Body { kind, data_id })
            },
            Err(e) => {
                trace!("🪝️ Request body is not a notification. {e}");
                None
            },
        }
    }

    /// The resource id the notification refers to. This is the payment id for payment notifications.
    pub fn data_id(&self) -> &str {
        match self {
            Self::Body { data_id, .. } | Self::TypeQuery { data_id, .. } => data_id.as_str(),
            Self::TopicQuery { id, .. } => id.as_str(),
        }
    }

    pub fn normalize(self) -> Result<NormalizedNotification, ServerError> {
        match self {
            Self::Body { kind, data_id } | Self::TypeQuery { kind, data_id } => {
                if kind == PAYMENT_TYPE {
                    payment_notification(data_id)
                } else if MERCHANT_ORDER_TYPES.contains(&kind.as_str()) {
                    Ok(NormalizedNotification::Ignored { reason: format!("{kind} ignored") })
                } else {
                    Err(ServerError::UnsupportedNotification(kind))
                }
            },
            Self::TopicQuery { topic, id } => match topic.as_str() {
                PAYMENT_TYPE => payment_notification(id),
                "merchant_order" => Ok(NormalizedNotification::Ignored { reason: "merchant_order ignored".into() }),
                _ => {
                    debug!("🪝️ Unknown notification topic {topic}");
                    Err(ServerError::InvalidWebhookData)
                },
            },
        }
    }
}

fn payment_notification(payment_id: String) -> Result<NormalizedNotification, ServerError> {
    if is_valid_payment_id(&payment_id) {
        Ok(NormalizedNotification::Payment { payment_id })
    } else {
        warn!("🪝️ Refusing payment notification with malformed id {payment_id:?}");
        Err(ServerError::InvalidWebhookData)
    }
}
