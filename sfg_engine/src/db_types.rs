//! Data types that are persisted by the order store and handed across the engine's public API.
use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::*;
use serde::{Deserialize, Serialize};
pub use sfg_common::Money;
use sqlx::{sqlite::SqliteRow, FromRow, Row, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid conversion: {0}")]
pub struct ConversionError(String);

//--------------------------------------     PaymentStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Checkout has started, but the payment provider has not approved anything yet.
    #[default]
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl PaymentStatus {
    /// Approved, rejected and cancelled payments never change again.
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Approved => write!(f, "approved"),
            PaymentStatus::Rejected => write!(f, "rejected"),
            PaymentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

impl From<String> for PaymentStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid payment status: {value}. But this conversion cannot fail. Defaulting to Pending");
            PaymentStatus::Pending
        })
    }
}

//--------------------------------------   FulfillmentStatus   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentStatus {
    #[default]
    AwaitingShipment,
    Preparing,
    ReadyForPickup,
    InTransit,
    Delivered,
    Cancelled,
}

impl FulfillmentStatus {
    /// Position along the forward path. `Cancelled` sits outside the path.
    fn rank(&self) -> Option<u8> {
        match self {
            Self::AwaitingShipment => Some(0),
            Self::Preparing => Some(1),
            Self::ReadyForPickup => Some(2),
            Self::InTransit => Some(3),
            Self::Delivered => Some(4),
            Self::Cancelled => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Whether an order may move from `self` to `next`. Steps may be skipped going forward, but never backwards, and
    /// nothing leaves a terminal state. Cancellation is reachable from every non-terminal state.
    pub fn can_transition_to(&self, next: FulfillmentStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self.rank(), next.rank()) {
            (_, None) => true,
            (Some(from), Some(to)) => to > from,
            (None, Some(_)) => false,
        }
    }
}

impl Display for FulfillmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FulfillmentStatus::AwaitingShipment => write!(f, "awaiting_shipment"),
            FulfillmentStatus::Preparing => write!(f, "preparing"),
            FulfillmentStatus::ReadyForPickup => write!(f, "ready_for_pickup"),
            FulfillmentStatus::InTransit => write!(f, "in_transit"),
            FulfillmentStatus::Delivered => write!(f, "delivered"),
            FulfillmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for FulfillmentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "awaiting_shipment" => Ok(Self::AwaitingShipment),
            "preparing" => Ok(Self::Preparing),
            "ready_for_pickup" => Ok(Self::ReadyForPickup),
            "in_transit" => Ok(Self::InTransit),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid fulfillment status: {s}"))),
        }
    }
}

impl From<String> for FulfillmentStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid fulfillment status: {value}. But this conversion cannot fail. Defaulting to AwaitingShipment");
            FulfillmentStatus::AwaitingShipment
        })
    }
}

//--------------------------------------    DeliveryOption     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeliveryOption {
    #[default]
    HomeDelivery,
    Pickup,
}

impl Display for DeliveryOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryOption::HomeDelivery => write!(f, "home_delivery"),
            DeliveryOption::Pickup => write!(f, "pickup"),
        }
    }
}

//--------------------------------------       ProductId       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct ProductId(pub String);

impl ProductId {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for ProductId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ProductId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------     CustomerInfo      ---------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: Option<String>,
}

//--------------------------------------       LineItem        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Money,
    pub shipping_cost: Money,
    pub quantity: i64,
}

impl LineItem {
    pub fn subtotal(&self) -> Money {
        self.unit_price * self.quantity
    }

    pub fn shipping(&self) -> Money {
        self.shipping_cost * self.quantity
    }
}

//--------------------------------------     AppliedCoupon     ---------------------------------------------------------
/// A snapshot of the coupon as it was when the order was placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedCoupon {
    pub code: String,
    pub discount_percent: i64,
    pub discount_amount: Money,
    pub original_total: Money,
}

//--------------------------------------        NewOrder       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub external_reference: String,
    pub checkout_session_id: Option<String>,
    pub customer: CustomerInfo,
    pub delivery: DeliveryOption,
    pub delivery_window: Option<String>,
    pub comments: Option<String>,
    pub items: Vec<LineItem>,
    pub subtotal: Money,
    pub shipping_total: Money,
    pub total: Money,
    pub coupon: Option<AppliedCoupon>,
}

impl NewOrder {
    /// Builds an order with totals computed from the line items and no coupon.
    pub fn new<S: Into<String>>(external_reference: S, customer: CustomerInfo, items: Vec<LineItem>) -> Self {
        let subtotal = items.iter().map(LineItem::subtotal).sum();
        let shipping_total = items.iter().map(LineItem::shipping).sum();
        Self {
            external_reference: external_reference.into(),
            checkout_session_id: None,
            customer,
            delivery: DeliveryOption::default(),
            delivery_window: None,
            comments: None,
            items,
            subtotal,
            shipping_total,
            total: subtotal + shipping_total,
            coupon: None,
        }
    }

    pub fn with_checkout_session_id<S: Into<String>>(mut self, session_id: S) -> Self {
        self.checkout_session_id = Some(session_id.into());
        self
    }

    pub fn with_delivery(mut self, delivery: DeliveryOption) -> Self {
        self.delivery = delivery;
        self
    }

    /// Applies the coupon discount to the current total.
    pub fn with_coupon<S: Into<String>>(mut self, code: S, discount_percent: i64) -> Self {
        let original_total = self.subtotal + self.shipping_total;
        let discount_amount = original_total.percent_of(discount_percent);
        self.total = original_total - discount_amount;
        self.coupon = Some(AppliedCoupon { code: code.into(), discount_percent, discount_amount, original_total });
        self
    }
}

//--------------------------------------         Order         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub external_reference: String,
    pub checkout_session_id: Option<String>,
    pub payment_id: Option<String>,
    pub customer: CustomerInfo,
    pub delivery: DeliveryOption,
    pub delivery_window: Option<String>,
    pub comments: Option<String>,
    pub items: Vec<LineItem>,
    pub subtotal: Money,
    pub shipping_total: Money,
    pub total: Money,
    pub coupon: Option<AppliedCoupon>,
    pub payment_status: PaymentStatus,
    pub fulfillment_status: FulfillmentStatus,
    pub webhook_processed: bool,
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
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Line items live in their own table, so `items` is always empty straight out of the row and is filled in by the
/// storage layer.
impl FromRow<'_, SqliteRow> for Order {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let coupon_code: Option<String> = row.try_get("coupon_code")?;
        let coupon = match coupon_code {
            Some(code) => Some(AppliedCoupon {
                code,
                discount_percent: row.try_get("coupon_discount_percent")?,
                discount_amount: row.try_get("coupon_discount_amount")?,
                original_total: row.try_get("coupon_original_total")?,
            }),
            None => None,
        };
        let customer = CustomerInfo {
            name: row.try_get("customer_name")?,
            email: row.try_get("customer_email")?,
            phone: row.try_get("customer_phone")?,
            address: row.try_get("customer_address")?,
        };
        Ok(Self {
            id: row.try_get("id")?,
            external_reference: row.try_get("external_reference")?,
            checkout_session_id: row.try_get("checkout_session_id")?,
            payment_id: row.try_get("payment_id")?,
            customer,
            delivery: row.try_get("delivery_option")?,
            delivery_window: row.try_get("delivery_window")?,
            comments: row.try_get("comments")?,
            items: Vec::new(),
            subtotal: row.try_get("subtotal")?,
            shipping_total: row.try_get("shipping_total")?,
            total: row.try_get("total")?,
            coupon,
            payment_status: row.try_get("payment_status")?,
            fulfillment_status: row.try_get("fulfillment_status")?,
            webhook_processed: row.try_get("webhook_processed")?,
            webhook_processed_at: row.try_get("webhook_processed_at")?,
            approved_at: row.try_get("approved_at")?,
            rejected_at: row.try_get("rejected_at")?,
            payment_cancelled_at: row.try_get("payment_cancelled_at")?,
            preparing_at: row.try_get("preparing_at")?,
            ready_at: row.try_get("ready_at")?,
            in_transit_at: row.try_get("in_transit_at")?,
            delivered_at: row.try_get("delivered_at")?,
            cancelled_at: row.try_get("cancelled_at")?,
            admin_note: row.try_get("admin_note")?,
            admin_id: row.try_get("admin_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

//--------------------------------------        Product        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub unit_price: Money,
    pub shipping_cost: Money,
    pub stock_quantity: i64,
    pub in_stock: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub id: ProductId,
    pub name: String,
    pub unit_price: Money,
    #[serde(default)]
    pub shipping_cost: Money,
    #[serde(default)]
    pub stock_quantity: i64,
}

impl NewProduct {
    pub fn new<P: Into<ProductId>, S: Into<String>>(id: P, name: S, unit_price: Money, stock_quantity: i64) -> Self {
        Self { id: id.into(), name: name.into(), unit_price, shipping_cost: Money::default(), stock_quantity }
    }

    pub fn with_shipping_cost(mut self, shipping_cost: Money) -> Self {
        self.shipping_cost = shipping_cost;
        self
    }
}

//--------------------------------------     StockMovement     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    /// Stock left the shelf because an order was paid for.
    Sale,
    /// An administrator set the stock level by hand.
    Adjustment,
    /// New stock arrived.
    Intake,
}

impl Display for MovementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MovementKind::Sale => write!(f, "sale"),
            MovementKind::Adjustment => write!(f, "adjustment"),
            MovementKind::Intake => write!(f, "intake"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: i64,
    pub product_id: ProductId,
    pub kind: MovementKind,
    /// Signed change in stock. Clamping at zero means this can be smaller than the quantity sold.
    pub quantity: i64,
    pub stock_before: i64,
    pub stock_after: i64,
    pub user_id: String,
    pub order_id: Option<i64>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The user recorded against automatic stock movements.
pub const SYSTEM_USER: &str = "system";

/// How an administrator wants to change stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "action", content = "quantity")]
pub enum StockAdjustment {
    /// Set the stock to an absolute quantity.
    SetTo(i64),
    /// Add freshly received stock.
    Intake(i64),
}

impl StockAdjustment {
    pub fn kind(&self) -> MovementKind {
        match self {
            Self::SetTo(_) => MovementKind::Adjustment,
            Self::Intake(_) => MovementKind::Intake,
        }
    }

    /// The stock level after applying this adjustment to `current`. Never negative.
    pub fn apply(&self, current: i64) -> i64 {
        match self {
            Self::SetTo(q) => (*q).max(0),
            Self::Intake(q) => current.saturating_add(*q).max(0),
        }
    }
}

//--------------------------------------        Coupon         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Coupon {
    pub id: i64,
    pub code: String,
    pub discount_percent: i64,
    pub active: bool,
    pub usage_limit: Option<i64>,
    pub usage_count: i64,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Coupon {
    /// True if the coupon has a usage cap and it has been reached.
    pub fn is_exhausted(&self) -> bool {
        self.usage_limit.map(|limit| self.usage_count >= limit).unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCoupon {
    pub code: String,
    pub discount_percent: i64,
    pub usage_limit: Option<i64>,
    pub description: Option<String>,
}

impl NewCoupon {
    pub fn new<S: Into<String>>(code: S, discount_percent: i64) -> Self {
        Self { code: code.into(), discount_percent, usage_limit: None, description: None }
    }

    pub fn with_usage_limit(mut self, limit: i64) -> Self {
        self.usage_limit = Some(limit);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponUpdate {
    pub discount_percent: Option<i64>,
    pub active: Option<bool>,
    /// `Some(None)` removes the usage cap.
    #[serde(default, with = "double_option", skip_serializing_if = "Option::is_none")]
    pub usage_limit: Option<Option<i64>>,
    pub description: Option<String>,
}

impl CouponUpdate {
    pub fn is_empty(&self) -> bool {
        self.discount_percent.is_none() &&
            self.active.is_none() &&
            self.usage_limit.is_none() &&
            self.description.is_none()
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }

    pub fn with_discount_percent(mut self, percent: i64) -> Self {
        self.discount_percent = Some(percent);
        self
    }

    pub fn with_usage_limit(mut self, limit: Option<i64>) -> Self {
        self.usage_limit = Some(limit);
        self
    }
}

mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Option<i64>>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Option<i64>>, D::Error> {
        Option::<i64>::deserialize(deserializer).map(Some)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CouponUsage {
    pub id: i64,
    pub coupon_id: i64,
    pub code: String,
    pub order_id: i64,
    pub customer_email: String,
    pub discount_percent: i64,
    pub original_total: Money,
    pub discount_amount: Money,
    pub used_at: DateTime<Utc>,
}

//--------------------------------------     WebhookRecord     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WebhookRecordStatus {
    Processing,
    Completed,
    Failed,
}

impl Display for WebhookRecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WebhookRecordStatus::Processing => write!(f, "processing"),
            WebhookRecordStatus::Completed => write!(f, "completed"),
            WebhookRecordStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A per-payment-id marker used to spot duplicate and concurrent deliveries of the same notification.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct WebhookRecord {
    pub id: i64,
    pub payment_id: String,
    pub status: WebhookRecordStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
