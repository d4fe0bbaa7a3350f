//! Payment provider integrations. Each one adapts a provider client to the engine's `PaymentGateway` trait.
pub mod mercadopago;
