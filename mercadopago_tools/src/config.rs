use log::*;
use sfg_common::Secret;

pub const DEFAULT_MERCADOPAGO_API_URL: &str = "https://api.mercadopago.com";

#[derive(Debug, Clone, Default)]
pub struct MercadoPagoConfig {
    /// Base URL of the REST API, without a trailing slash.
    pub api_url: String,
    /// Seller access token. Left empty when the store runs without a payment provider.
    pub access_token: Secret<String>,
}

impl MercadoPagoConfig {
    pub fn new<S: Into<String>>(api_url: S, access_token: S) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Self { api_url, access_token: Secret::new(access_token.into()) }
    }

    pub fn new_from_env_or_default() -> Self {
        let api_url = std::env::var("SFG_MP_API_URL").unwrap_or_else(|_| {
            debug!("💳️ SFG_MP_API_URL not set, using {DEFAULT_MERCADOPAGO_API_URL}");
            DEFAULT_MERCADOPAGO_API_URL.to_string()
        });
        let access_token = std::env::var("SFG_MP_ACCESS_TOKEN").unwrap_or_else(|_| {
            warn!("💳️ SFG_MP_ACCESS_TOKEN not set. Checkout sessions cannot be created and every payment will be reported as pending.");
            String::default()
        });
        Self::new(api_url, access_token)
    }

    pub fn is_configured(&self) -> bool {
        !self.access_token.is_empty()
    }
}
