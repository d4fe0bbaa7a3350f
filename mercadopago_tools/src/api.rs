use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Serialize};
use sfg_common::{is_valid_payment_id, GatewayStatus, PaymentReport};

use crate::{
    config::MercadoPagoConfig,
    data_objects::{MercadoPagoPayment, Preference, PreferenceRequest},
    MercadoPagoApiError,
};

#[derive(Clone)]
pub struct MercadoPagoApi {
    config: MercadoPagoConfig,
    client: Arc<Client>,
}

impl MercadoPagoApi {
    pub fn new(config: MercadoPagoConfig) -> Result<Self, MercadoPagoApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| MercadoPagoApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<B>,
    ) -> Result<T, MercadoPagoApiError> {
        if !self.is_configured() {
            return Err(MercadoPagoApiError::Unconfigured);
        }
        let url = self.url(path);
        trace!("💳️ Sending REST query: {method} {url}");
        let mut req = self.client.request(method, url).bearer_auth(self.config.access_token.reveal());
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| MercadoPagoApiError::RestResponseError(e.to_string()))?;
        if response.status().is_success() {
            trace!("💳️ REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| MercadoPagoApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message =
                response.text().await.map_err(|e| MercadoPagoApiError::RestResponseError(e.to_string()))?;
            Err(MercadoPagoApiError::QueryError { status, message })
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_url)
    }

    /// Creates a hosted checkout preference. The provider's raw error text is preserved in
    /// [`MercadoPagoApiError::QueryError`] so that it can be surfaced to the caller.
    pub async fn create_preference(&self, preference: PreferenceRequest) -> Result<Preference, MercadoPagoApiError> {
        debug!("💳️ Creating checkout preference for {}", preference.external_reference);
        let result = self.rest_query::<Preference, _>(Method::POST, "/checkout/preferences", Some(preference)).await?;
        info!("💳️ Created checkout preference {}", result.id);
        Ok(result)
    }

    /// Fetches a payment by id. Ids that are not plain decimal numbers are refused without contacting the provider.
    pub async fn get_payment(&self, payment_id: &str) -> Result<MercadoPagoPayment, MercadoPagoApiError> {
        if !is_valid_payment_id(payment_id) {
            return Err(MercadoPagoApiError::InvalidPaymentId(payment_id.to_string()));
        }
        let path = format!("/v1/payments/{payment_id}");
        debug!("💳️ Fetching payment #{payment_id}");
        let result = self.rest_query::<MercadoPagoPayment, ()>(Method::GET, &path, None).await?;
        debug!("💳️ Payment #{payment_id} has status '{}'", result.status);
        Ok(result)
    }

    /// Queries the authoritative status of a payment. This call never fails: if the provider is unreachable,
    /// unconfigured or answers with an error, the payment is reported as pending so that no state is ever advanced
    /// on the strength of a failed lookup.
    pub async fn payment_report(&self, payment_id: &str) -> PaymentReport {
        match self.get_payment(payment_id).await {
            Ok(payment) => PaymentReport {
                status: GatewayStatus::from_provider_status(&payment.status),
                external_reference: payment.external_reference.filter(|r| !r.is_empty()),
            },
            Err(e) => {
                warn!("💳️ Could not fetch the status of payment #{payment_id}. Treating it as pending. {e}");
                PaymentReport::unavailable()
            },
        }
    }
}
