use thiserror::Error;

use crate::db_types::{CouponUsage, Order, ProductId, StockMovement};

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("We have an internal database engine (configuration/uptime etc.) error: {0}")]
    DatabaseError(String),
    #[error("Cannot insert order, since external reference {0} is already in use")]
    OrderAlreadyExists(String),
    #[error("The requested order (internal id {0}) does not exist")]
    OrderNotFound(i64),
    #[error("The requested product {0} does not exist")]
    ProductNotFound(ProductId),
    #[error("The requested coupon {0} does not exist")]
    CouponNotFound(String),
    #[error("Cannot create coupon, since the code {0} is already in use")]
    CouponAlreadyExists(String),
    #[error("The requested change would result in a no-op.")]
    ModificationNoOp,
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::DatabaseError(e.to_string())
    }
}

/// Everything that changed when an order was approved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalResult {
    pub order: Order,
    pub movements: Vec<StockMovement>,
    pub coupon_usage: Option<CouponUsage>,
}
