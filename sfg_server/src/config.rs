use std::env;

use log::*;
use mercadopago_tools::MercadoPagoConfig;
use sfg_common::{parse_boolean_flag, Secret};
use sfg_engine::{traits::ReturnUrls, MatchStrategy, ReconcileOptions};

const DEFAULT_SFG_HOST: &str = "127.0.0.1";
const DEFAULT_SFG_PORT: u16 = 8360;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/storefront.db";
const DEFAULT_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_PENDING_RECHECK_INTERVAL: u64 = 300;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// The public URL of the storefront. Checkout return pages and the webhook URL are derived from it.
    pub base_url: String,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address.
    pub use_forwarded: bool,
    /// Seconds between sweeps of pending orders that already carry a payment id. Zero disables the sweep.
    pub pending_recheck_interval: u64,
    pub reconcile_options: ReconcileOptions,
    pub mercadopago: MercadoPagoSettings,
}

#[derive(Clone, Debug, Default)]
pub struct MercadoPagoSettings {
    pub api: MercadoPagoConfig,
    /// Key used to verify the `x-signature` header on payment notifications.
    pub webhook_secret: Secret<String>,
    pub signature_checks: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SFG_HOST.to_string(),
            port: DEFAULT_SFG_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            pending_recheck_interval: DEFAULT_PENDING_RECHECK_INTERVAL,
            reconcile_options: ReconcileOptions::default(),
            mercadopago: MercadoPagoSettings::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("SFG_HOST").ok().unwrap_or_else(|| DEFAULT_SFG_HOST.into());
        let port = env::var("SFG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for SFG_PORT. {e} Using the default, {DEFAULT_SFG_PORT}, instead."
                    );
                    DEFAULT_SFG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_SFG_PORT);
        let database_url = env::var("SFG_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ SFG_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let base_url = env::var("SFG_BASE_URL").ok().unwrap_or_else(|| {
            warn!(
                "🪛️ SFG_BASE_URL is not set. Payment return pages and notifications will point at {DEFAULT_BASE_URL}."
            );
            DEFAULT_BASE_URL.to_string()
        });
        let use_x_forwarded_for = parse_boolean_flag(env::var("SFG_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("SFG_USE_FORWARDED").ok(), false);
        let pending_recheck_interval = configure_recheck_interval();
        let reconcile_options = configure_reconcile_options();
        let mercadopago = MercadoPagoSettings::from_env_or_defaults();
        Self {
            host,
            port,
            database_url,
            base_url,
            use_x_forwarded_for,
            use_forwarded,
            pending_recheck_interval,
            reconcile_options,
            mercadopago,
        }
    }

    pub fn return_urls(&self) -> ReturnUrls {
        ReturnUrls::from_base_url(&self.base_url)
    }
}

impl MercadoPagoSettings {
    pub fn from_env_or_defaults() -> Self {
        let api = MercadoPagoConfig::new_from_env_or_default();
        let webhook_secret = Secret::new(env::var("SFG_MP_WEBHOOK_SECRET").ok().unwrap_or_default());
        let mut signature_checks = parse_boolean_flag(env::var("SFG_MP_SIGNATURE_CHECKS").ok(), false);
        if signature_checks && webhook_secret.is_empty() {
            error!(
                "🪛️ SFG_MP_SIGNATURE_CHECKS is enabled but SFG_MP_WEBHOOK_SECRET is not set. Signature checks are \
                 disabled until a secret is configured."
            );
            signature_checks = false;
        }
        if !signature_checks {
            info!("🪛️ Payment notification signatures will not be checked.");
        }
        Self { api, webhook_secret, signature_checks }
    }
}

fn configure_recheck_interval() -> u64 {
    env::var("SFG_PENDING_RECHECK_INTERVAL")
        .map_err(|_| {
            info!(
                "🪛️ SFG_PENDING_RECHECK_INTERVAL is not set. Using the default value of \
                 {DEFAULT_PENDING_RECHECK_INTERVAL}s."
            )
        })
        .and_then(|s| {
            s.trim()
                .parse::<u64>()
                .map_err(|e| warn!("🪛️ Invalid configuration value for SFG_PENDING_RECHECK_INTERVAL. {e}"))
        })
        .ok()
        .unwrap_or(DEFAULT_PENDING_RECHECK_INTERVAL)
}

fn configure_reconcile_options() -> ReconcileOptions {
    let match_strategy = env::var("SFG_MATCH_STRATEGY")
        .ok()
        .and_then(|s| {
            s.parse::<MatchStrategy>()
                .map_err(|e| warn!("🪛️ Invalid configuration value for SFG_MATCH_STRATEGY. {e}"))
                .ok()
        })
        .unwrap_or_default();
    if match_strategy == MatchStrategy::FirstPending {
        warn!(
            "🪛️ Payments without a known order will be matched to the oldest pending order. This is ambiguous when \
             several checkouts are open at once."
        );
    }
    let record_declined_payments = parse_boolean_flag(env::var("SFG_RECORD_DECLINED_PAYMENTS").ok(), false);
    ReconcileOptions { match_strategy, record_declined_payments }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// The subset of the configuration that request handlers need. Contains no secrets.
#[derive(Clone, Copy, Debug, Default)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { use_x_forwarded_for: config.use_x_forwarded_for, use_forwarded: config.use_forwarded }
    }
}
