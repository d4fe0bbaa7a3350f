use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// The payment status, as reported by the payment provider, collapsed into the states the store cares about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Cancelled,
    Unknown,
}

impl GatewayStatus {
    /// Maps the provider's raw status string. Anything that is still in flight maps to `Pending`. Refunds,
    /// chargebacks and unrecognised values map to `Unknown`.
    pub fn from_provider_status(status: &str) -> Self {
        match status {
            "approved" => Self::Approved,
            "rejected" => Self::Rejected,
            "cancelled" => Self::Cancelled,
            "pending" | "in_process" | "in_mediation" | "authorized" => Self::Pending,
            _ => Self::Unknown,
        }
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved)
    }

    /// Rejected and cancelled payments will never be approved later.
    pub fn is_declined(&self) -> bool {
        matches!(self, Self::Rejected | Self::Cancelled)
    }
}

impl Display for GatewayStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// What the provider told us about a single payment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReport {
    pub status: GatewayStatus,
    /// The merchant reference the payment was created against, if the provider returned one.
    pub external_reference: Option<String>,
}

impl PaymentReport {
    pub fn new(status: GatewayStatus) -> Self {
        Self { status, external_reference: None }
    }

    pub fn with_external_reference<S: Into<String>>(mut self, reference: S) -> Self {
        self.external_reference = Some(reference.into());
        self
    }

    /// The report used whenever the provider cannot be reached or answers with something unusable.
    pub fn unavailable() -> Self {
        Self::new(GatewayStatus::Pending)
    }
}
