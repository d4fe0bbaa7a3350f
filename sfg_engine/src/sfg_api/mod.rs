//! # Storefront engine public API
//!
//! The `sfg_api` module exposes the programmatic API of the engine. The API is modular, so that clients can pick the
//! functionality they need.
//!
//! * [`reconcile_api`] turns payment notifications into order state changes. It is the only part of the engine that
//!   ever approves an order.
//! * [`checkout_api`] validates carts, prices them, opens a hosted checkout session and stores the pending order.
//! * [`fulfillment_api`] moves paid orders through preparation and delivery.
//! * [`coupon_api`] and [`inventory_api`] are the administrative surfaces for discounts and stock.
//!
//! # API usage
//!
//! Every API is created by supplying a backend that implements the traits it needs, plus any collaborators:
//!
//! ```rust,ignore
//! use sfg_engine::{events::EventProducers, ReconcileApi, ReconcileOptions, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! let api = ReconcileApi::new(db, gateway, EventProducers::default(), ReconcileOptions::default());
//! let outcome = api.process_payment_notification("1319718851").await?;
//! ```

pub mod checkout_api;
pub mod coupon_api;
pub mod errors;
pub mod fulfillment_api;
pub mod inventory_api;
pub mod order_objects;
pub mod reconcile_api;
