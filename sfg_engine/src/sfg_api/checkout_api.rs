use std::fmt::Debug;

use chrono::Utc;
use log::*;
use serde::{Deserialize, Serialize};
use sfg_common::split_full_name;

use crate::{
    db_types::{CustomerInfo, DeliveryOption, LineItem, NewOrder, Order, ProductId},
    sfg_api::{
        coupon_api::validate_coupon,
        errors::{CheckoutError, StockShortfall},
    },
    traits::{
        CheckoutDatabase,
        CheckoutSession,
        CheckoutSessionRequest,
        PaymentGateway,
        ReturnUrls,
        SessionItem,
        SessionPayer,
    },
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<CartLine>,
    pub customer: CustomerInfo,
    #[serde(default)]
    pub delivery: DeliveryOption,
    pub delivery_window: Option<String>,
    pub comments: Option<String>,
    pub coupon_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutResult {
    pub order: Order,
    pub session: CheckoutSession,
}

/// `CheckoutApi` validates a cart against the catalogue, prices it, opens a hosted checkout session with the payment
/// provider and stores the resulting pending order.
///
/// Stock is only checked here, never reserved. It is decremented when the payment is approved.
pub struct CheckoutApi<B, G> {
    db: B,
    gateway: G,
    return_urls: ReturnUrls,
}

impl<B, G> Debug for CheckoutApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CheckoutApi")
    }
}

impl<B, G> CheckoutApi<B, G> {
    pub fn new(db: B, gateway: G, return_urls: ReturnUrls) -> Self {
        Self { db, gateway, return_urls }
    }
}

impl<B, G> CheckoutApi<B, G>
where
    B: CheckoutDatabase,
    G: PaymentGateway,
{
    pub async fn start_checkout(&self, request: CheckoutRequest) -> Result<CheckoutResult, CheckoutError> {
        validate_customer(&request.customer)?;
        let items = self.price_cart(&request.items).await?;
        let external_reference = new_external_reference();
        let mut order = NewOrder::new(external_reference.as_str(), request.customer, items)
            .with_delivery(request.delivery);
        order.delivery_window = request.delivery_window;
        order.comments = request.comments;
        if let Some(code) = request.coupon_code.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            let coupon = validate_coupon(&self.db, code).await?;
            order = order.with_coupon(coupon.code, coupon.discount_percent);
        }
        let session_request = self.session_request(&order);
        let session = self.gateway.create_checkout_session(session_request).await?;
        info!("🛒️ Checkout session {} opened for {external_reference} ({})", session.session_id, order.total);
        let order = self.db.insert_order(order.with_checkout_session_id(session.session_id.as_str())).await?;
        debug!("🛒️ Order {} stored as pending", order.id);
        Ok(CheckoutResult { order, session })
    }

    /// Resolves every cart line against the catalogue. All stock shortfalls are reported together.
    async fn price_cart(&self, cart: &[CartLine]) -> Result<Vec<LineItem>, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let mut items = Vec::with_capacity(cart.len());
        let mut shortfalls = Vec::new();
        for line in cart {
            if line.quantity <= 0 {
                return Err(CheckoutError::InvalidQuantity {
                    product_id: line.product_id.clone(),
                    quantity: line.quantity,
                });
            }
            let product = self
                .db
                .fetch_product(&line.product_id)
                .await?
                .ok_or_else(|| CheckoutError::ProductNotFound(line.product_id.clone()))?;
            if line.quantity > product.stock_quantity {
                shortfalls.push(StockShortfall {
                    product_id: product.id.clone(),
                    product_name: product.name.clone(),
                    requested: line.quantity,
                    available: product.stock_quantity,
                });
            }
            items.push(LineItem {
                product_id: product.id,
                product_name: product.name,
                unit_price: product.unit_price,
                shipping_cost: product.shipping_cost,
                quantity: line.quantity,
            });
        }
        if !shortfalls.is_empty() {
            return Err(CheckoutError::InsufficientStock(shortfalls));
        }
        Ok(items)
    }

    fn session_request(&self, order: &NewOrder) -> CheckoutSessionRequest {
        let (name, surname) = split_full_name(&order.customer.name);
        let payer = SessionPayer {
            name,
            surname,
            email: order.customer.email.clone(),
            phone: Some(order.customer.phone.clone()).filter(|p| !p.trim().is_empty()),
        };
        let items = match &order.coupon {
            // The provider does not accept negative prices, so a discounted cart is charged as a single line
            Some(coupon) => vec![SessionItem {
                id: order.external_reference.clone(),
                title: format!("Order {} ({} with coupon {})", order.external_reference, order.total, coupon.code),
                quantity: 1,
                unit_price: order.total,
            }],
            None => order
                .items
                .iter()
                .map(|item| SessionItem {
                    id: item.product_id.to_string(),
                    title: item.product_name.clone(),
                    quantity: item.quantity,
                    unit_price: item.unit_price + item.shipping_cost,
                })
                .collect(),
        };
        CheckoutSessionRequest {
            items,
            payer,
            return_urls: self.return_urls.clone(),
            external_reference: order.external_reference.clone(),
        }
    }
}

fn validate_customer(customer: &CustomerInfo) -> Result<(), CheckoutError> {
    if customer.name.trim().is_empty() {
        return Err(CheckoutError::InvalidCustomer("a name is required".into()));
    }
    if !customer.email.contains('@') {
        return Err(CheckoutError::InvalidCustomer(format!("'{}' is not an email address", customer.email)));
    }
    Ok(())
}

/// `sale_<unix millis>_<random>`. The random suffix keeps two checkouts in the same millisecond apart.
pub fn new_external_reference() -> String {
    let suffix = rand::random::<u32>() % 1_000_000;
    format!("sale_{}_{suffix:06}", Utc::now().timestamp_millis())
}
