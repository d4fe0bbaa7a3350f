use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    db_types::{FulfillmentStatus, PaymentStatus, ProductId},
    traits::{GatewayError, StoreError},
};

#[derive(Debug, Clone, Error)]
pub enum ReconcileError {
    #[error("{0}")]
    StoreError(#[from] StoreError),
    #[error("The requested order (internal id {0}) does not exist")]
    OrderNotFound(i64),
    #[error("Order {0} has no payment id yet, so there is nothing to reconcile")]
    NoPaymentId(i64),
    #[error("{0:?} is not a valid payment id")]
    InvalidPaymentId(String),
    #[error("No order has the external reference {0}")]
    UnknownReference(String),
    #[error("Order {order_id} is already linked to a payment other than {payment_id}")]
    PaymentIdMismatch { order_id: i64, payment_id: String },
}

/// A cart line that asks for more than is on the shelf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockShortfall {
    pub product_id: ProductId,
    pub product_name: String,
    pub requested: i64,
    pub available: i64,
}

#[derive(Debug, Clone, Error)]
pub enum CheckoutError {
    #[error("The cart is empty")]
    EmptyCart,
    #[error("Invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity { product_id: ProductId, quantity: i64 },
    #[error("Product {0} does not exist")]
    ProductNotFound(ProductId),
    #[error("Not enough stock for {} product(s)", .0.len())]
    InsufficientStock(Vec<StockShortfall>),
    #[error("Invalid customer details: {0}")]
    InvalidCustomer(String),
    #[error("{0}")]
    CouponError(#[from] CouponError),
    #[error("{0}")]
    GatewayError(#[from] GatewayError),
    #[error("{0}")]
    StoreError(#[from] StoreError),
}

#[derive(Debug, Clone, Error)]
pub enum CouponError {
    #[error("Coupon {0} does not exist")]
    NotFound(String),
    #[error("Coupon {0} is not active")]
    Inactive(String),
    #[error("Coupon {0} has reached its usage limit")]
    Exhausted(String),
    #[error("Invalid coupon code: {0}")]
    InvalidCode(String),
    #[error("Discount must be between 0 and 100 percent, not {0}")]
    InvalidPercent(i64),
    #[error("Usage limit must be positive, not {0}")]
    InvalidUsageLimit(i64),
    #[error("{0}")]
    StoreError(#[from] StoreError),
}

#[derive(Debug, Clone, Error)]
pub enum FulfillmentError {
    #[error("The requested order (internal id {0}) does not exist")]
    OrderNotFound(i64),
    #[error("Order {order_id} cannot be fulfilled while its payment is {status}")]
    PaymentNotApproved { order_id: i64, status: PaymentStatus },
    #[error("Cannot move an order from {from} to {to}")]
    InvalidTransition { from: FulfillmentStatus, to: FulfillmentStatus },
    #[error("The order is already {0}")]
    NoChange(FulfillmentStatus),
    #[error("{0}")]
    StoreError(#[from] StoreError),
}

#[derive(Debug, Clone, Error)]
pub enum InventoryError {
    #[error("Product {0} does not exist")]
    ProductNotFound(ProductId),
    #[error("Invalid stock quantity: {0}")]
    InvalidQuantity(i64),
    #[error("Invalid product: {0}")]
    InvalidProduct(String),
    #[error("{0}")]
    StoreError(#[from] StoreError),
}
