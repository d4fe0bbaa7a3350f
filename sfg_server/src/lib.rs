//! # Storefront payment gateway server
//! This crate hosts the HTTP server of the storefront. It is responsible for:
//! * Receiving payment notifications from Mercado Pago and handing them to the engine's reconciler.
//! * Opening checkouts for the storefront.
//! * Exposing the administrative order, coupon and stock APIs.
//! * Periodically re-checking pending payments whose notifications may have been lost.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/payment/webhook`: Payment notifications (`POST`) and a liveness payload (`GET`).
//! * `/api/checkout`: Starts a checkout.
//! * `/api/orders`, `/api/coupons`, `/api/products`: Administration.
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod pending_worker;
pub mod routes;
pub mod server;
pub mod webhook;

#[cfg(test)]
mod endpoint_tests;
