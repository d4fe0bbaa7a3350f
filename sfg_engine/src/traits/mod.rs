//! # Order store contract
//!
//! This module defines the interfaces that storage *backends* must implement to support the storefront engine, and
//! the interface to the payment provider.
//!
//! * [`OrderManagement`] is the plain order store: create, read by id, read by field equality and partial update.
//! * [`ReconciliationStore`] adds the operations the reconciler needs: the per-payment webhook ledger, binding a
//!   gateway payment id onto an order, and the atomic approval claim that gates every side effect.
//! * [`InventoryManagement`] manages product stock and its audit trail.
//! * [`CouponManagement`] manages discount coupons and their usage history.
//! * [`PaymentGateway`] is the outbound side: creating hosted checkout sessions and querying authoritative payment
//!   status.
mod coupon_management;
mod data_objects;
mod inventory_management;
mod order_management;
mod payment_gateway;
mod reconciliation_store;

pub use coupon_management::CouponManagement;
pub use data_objects::{ApprovalResult, StoreError};
pub use inventory_management::InventoryManagement;
pub use order_management::OrderManagement;
pub use payment_gateway::{
    CheckoutSession,
    CheckoutSessionRequest,
    GatewayError,
    PaymentGateway,
    ReturnUrls,
    SessionItem,
    SessionPayer,
};
pub use reconciliation_store::ReconciliationStore;

/// A backend that can serve the whole checkout flow.
pub trait CheckoutDatabase: OrderManagement + InventoryManagement + CouponManagement {}

impl<T> CheckoutDatabase for T where T: OrderManagement + InventoryManagement + CouponManagement {}
