use log::*;
use mercadopago_tools::{
    split_phone_number,
    BackUrls,
    MercadoPagoApi,
    MercadoPagoApiError,
    PreferenceItem,
    PreferencePayer,
    PreferenceRequest,
};
use sfg_common::{PaymentReport, STORE_CURRENCY_CODE};
use sfg_engine::traits::{CheckoutSession, CheckoutSessionRequest, GatewayError, PaymentGateway};

/// The provider sends the buyer straight back to the store once a payment is approved.
const AUTO_RETURN: &str = "approved";

/// Mercado Pago as the engine's [`PaymentGateway`].
#[derive(Clone)]
pub struct MercadoPagoGateway {
    api: MercadoPagoApi,
}

impl MercadoPagoGateway {
    pub fn new(api: MercadoPagoApi) -> Self {
        Self { api }
    }
}

impl PaymentGateway for MercadoPagoGateway {
    async fn create_checkout_session(&self, request: CheckoutSessionRequest) -> Result<CheckoutSession, GatewayError> {
        if !self.api.is_configured() {
            error!("💳️ A checkout was attempted, but the Mercado Pago access token is not configured");
            return Err(GatewayError::GatewayUnconfigured);
        }
        let preference = self.api.create_preference(preference_request(request)).await.map_err(|e| match e {
            MercadoPagoApiError::Unconfigured => GatewayError::GatewayUnconfigured,
            MercadoPagoApiError::QueryError { message, .. } => GatewayError::GatewayRejected(message),
            e => GatewayError::GatewayRejected(e.to_string()),
        })?;
        let checkout_url = preference.checkout_url().map(String::from).ok_or_else(|| {
            GatewayError::GatewayRejected(format!("Preference {} has no checkout URL", preference.id))
        })?;
        Ok(CheckoutSession { session_id: preference.id, checkout_url })
    }

    async fn payment_status(&self, payment_id: &str) -> PaymentReport {
        self.api.payment_report(payment_id).await
    }
}

pub fn preference_request(request: CheckoutSessionRequest) -> PreferenceRequest {
    let items = request
        .items
        .into_iter()
        .map(|item| PreferenceItem {
            id: item.id,
            title: item.title,
            quantity: item.quantity,
            unit_price: item.unit_price.as_major_units(),
            currency_id: STORE_CURRENCY_CODE.to_string(),
        })
        .collect();
    let payer = PreferencePayer {
        name: request.payer.name,
        surname: request.payer.surname,
        email: request.payer.email,
        phone: request.payer.phone.as_deref().and_then(split_phone_number),
    };
    let urls = request.return_urls;
    PreferenceRequest {
        items,
        payer,
        back_urls: BackUrls { success: urls.success, failure: urls.failure, pending: urls.pending },
        auto_return: Some(AUTO_RETURN.to_string()),
        external_reference: request.external_reference,
        notification_url: urls.notification,
    }
}
