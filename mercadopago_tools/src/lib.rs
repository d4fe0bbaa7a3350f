mod api;
mod config;
mod error;
mod helpers;

mod data_objects;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use api::MercadoPagoApi;
pub use config::{MercadoPagoConfig, DEFAULT_MERCADOPAGO_API_URL};
pub use data_objects::{BackUrls, MercadoPagoPayment, PhoneNumber, Preference, PreferenceItem, PreferencePayer, PreferenceRequest};
pub use error::MercadoPagoApiError;
pub use helpers::split_phone_number;
