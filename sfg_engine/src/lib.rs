//! Storefront Payment Gateway engine
//!
//! This library holds the core logic of the storefront: the order store, payment reconciliation, checkout and the
//! administrative APIs for fulfillment, coupons and stock. It is provider-agnostic; the payment provider is reached
//! through the [`traits::PaymentGateway`] trait.
//!
//! The library is divided into three main sections:
//! 1. The storage contract ([`mod@traits`]) and its SQLite implementation, [`SqliteDatabase`]. The data types used in
//!    the database are defined in the `db_types` module and are public.
//! 2. The engine public API ([`mod@sfg_api`]). The [`ReconcileApi`] is the only code path that ever approves an order,
//!    and it does so at most once per order, however many times the provider delivers a notification.
//! 3. Event hooks ([`mod@events`]). An `OrderApprovedEvent` is emitted after every approval so that integrations can
//!    react without touching the engine.
#[cfg(feature = "sqlite")]
mod sqlite;

pub mod db_types;
pub mod events;
pub mod sfg_api;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use sfg_api::{
    checkout_api::{CartLine, CheckoutApi, CheckoutRequest, CheckoutResult},
    coupon_api::CouponApi,
    errors::{CheckoutError, CouponError, FulfillmentError, InventoryError, ReconcileError, StockShortfall},
    fulfillment_api::FulfillmentApi,
    inventory_api::InventoryApi,
    order_objects,
    reconcile_api::{MatchStrategy, PaymentReturn, ReconcileApi, ReconcileOptions, ReconcileOutcome},
};
#[cfg(feature = "sqlite")]
pub use sqlite::{db::new_pool, SqliteDatabase};
