use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
        Mutex,
    },
};

use sfg_common::{GatewayStatus, PaymentReport};

use crate::traits::{CheckoutSession, CheckoutSessionRequest, GatewayError, PaymentGateway};

/// An in-memory payment provider. Payment statuses are set by the test; unknown payment ids are reported the same way
/// an unreachable provider would be, as pending.
///
/// Clones share state, so a test can keep a handle after giving the gateway to an API.
#[derive(Debug, Clone, Default)]
pub struct ScriptedGateway {
    reports: Arc<Mutex<HashMap<String, PaymentReport>>>,
    sessions: Arc<Mutex<Vec<CheckoutSessionRequest>>>,
    status_queries: Arc<AtomicU64>,
    unconfigured: bool,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// A gateway without credentials. Every checkout fails with `GatewayUnconfigured`.
    pub fn unconfigured() -> Self {
        Self { unconfigured: true, ..Self::default() }
    }

    pub fn set_payment(&self, payment_id: &str, status: GatewayStatus, external_reference: Option<&str>) {
        let mut report = PaymentReport::new(status);
        report.external_reference = external_reference.map(String::from);
        self.reports.lock().unwrap().insert(payment_id.to_string(), report);
    }

    /// Forgets a payment, which makes it look like the provider is failing for that id.
    pub fn fail_payment(&self, payment_id: &str) {
        self.reports.lock().unwrap().remove(payment_id);
    }

    pub fn sessions(&self) -> Vec<CheckoutSessionRequest> {
        self.sessions.lock().unwrap().clone()
    }

    pub fn status_queries(&self) -> u64 {
        self.status_queries.load(Ordering::SeqCst)
    }
}

impl PaymentGateway for ScriptedGateway {
    async fn create_checkout_session(&self, request: CheckoutSessionRequest) -> Result<CheckoutSession, GatewayError> {
        if self.unconfigured {
            return Err(GatewayError::GatewayUnconfigured);
        }
        if request.items.iter().any(|i| i.unit_price.value() < 0) {
            return Err(GatewayError::GatewayRejected("unit_price must be positive".into()));
        }
        let mut sessions = self.sessions.lock().unwrap();
        sessions.push(request);
        let n = sessions.len();
        Ok(CheckoutSession {
            session_id: format!("pref-{n}"),
            checkout_url: format!("https://checkout.example.com/pref-{n}"),
        })
    }

    async fn payment_status(&self, payment_id: &str) -> PaymentReport {
        self.status_queries.fetch_add(1, Ordering::SeqCst);
        self.reports.lock().unwrap().get(payment_id).cloned().unwrap_or_else(PaymentReport::unavailable)
    }
}
