use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use serde_json::json;
use sfg_engine::{
    traits::{GatewayError, StoreError},
    CheckoutError,
    CouponError,
    FulfillmentError,
    InventoryError,
    ReconcileError,
    StockShortfall,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Invalid webhook data")]
    InvalidWebhookData,
    #[error("Unsupported notification type: {0}")]
    UnsupportedNotification(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("The request conflicts with the current state. {0}")]
    Conflict(String),
    #[error("Not enough stock to complete the order")]
    InsufficientStock(Vec<StockShortfall>),
    #[error("The payment provider is not configured. Checkout is unavailable.")]
    GatewayUnconfigured,
    #[error("The payment provider rejected the checkout. {0}")]
    GatewayRejected(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InvalidWebhookData => StatusCode::BAD_REQUEST,
            Self::UnsupportedNotification(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::InsufficientStock(_) => StatusCode::CONFLICT,
            Self::GatewayUnconfigured => StatusCode::SERVICE_UNAVAILABLE,
            Self::GatewayRejected(_) => StatusCode::BAD_GATEWAY,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            Self::InsufficientStock(shortfalls) => json!({ "error": self.to_string(), "details": shortfalls }),
            _ => json!({ "error": self.to_string() }),
        };
        HttpResponse::build(self.status_code()).insert_header(ContentType::json()).body(body.to_string())
    }
}

impl From<ReconcileError> for ServerError {
    fn from(e: ReconcileError) -> Self {
        match e {
            ReconcileError::OrderNotFound(id) => Self::NoRecordFound(format!("Order {id} does not exist")),
            ReconcileError::NoPaymentId(_) | ReconcileError::PaymentIdMismatch { .. } => Self::Conflict(e.to_string()),
            ReconcileError::InvalidPaymentId(_) => Self::InvalidRequestBody(e.to_string()),
            ReconcileError::UnknownReference(_) => Self::NoRecordFound(e.to_string()),
            ReconcileError::StoreError(e) => Self::BackendError(e.to_string()),
        }
    }
}

impl From<CheckoutError> for ServerError {
    fn from(e: CheckoutError) -> Self {
        match e {
            CheckoutError::EmptyCart |
            CheckoutError::InvalidQuantity { .. } |
            CheckoutError::ProductNotFound(_) |
            CheckoutError::InvalidCustomer(_) => Self::InvalidRequestBody(e.to_string()),
            CheckoutError::InsufficientStock(shortfalls) => Self::InsufficientStock(shortfalls),
            CheckoutError::CouponError(e) => e.into(),
            CheckoutError::GatewayError(GatewayError::GatewayUnconfigured) => Self::GatewayUnconfigured,
            CheckoutError::GatewayError(GatewayError::GatewayRejected(msg)) => Self::GatewayRejected(msg),
            CheckoutError::StoreError(e) => Self::BackendError(e.to_string()),
        }
    }
}

impl From<CouponError> for ServerError {
    fn from(e: CouponError) -> Self {
        match e {
            CouponError::NotFound(_) => Self::NoRecordFound(e.to_string()),
            CouponError::Inactive(_) | CouponError::Exhausted(_) => Self::Conflict(e.to_string()),
            CouponError::InvalidCode(_) | CouponError::InvalidPercent(_) | CouponError::InvalidUsageLimit(_) => {
                Self::InvalidRequestBody(e.to_string())
            },
            CouponError::StoreError(StoreError::CouponAlreadyExists(code)) => {
                Self::Conflict(format!("Coupon {code} already exists"))
            },
            CouponError::StoreError(e) => Self::BackendError(e.to_string()),
        }
    }
}

impl From<FulfillmentError> for ServerError {
    fn from(e: FulfillmentError) -> Self {
        match e {
            FulfillmentError::OrderNotFound(_) => Self::NoRecordFound(e.to_string()),
            FulfillmentError::PaymentNotApproved { .. } |
            FulfillmentError::InvalidTransition { .. } |
            FulfillmentError::NoChange(_) => Self::Conflict(e.to_string()),
            FulfillmentError::StoreError(e) => Self::BackendError(e.to_string()),
        }
    }
}

impl From<InventoryError> for ServerError {
    fn from(e: InventoryError) -> Self {
        match e {
            InventoryError::ProductNotFound(_) => Self::NoRecordFound(e.to_string()),
            InventoryError::InvalidQuantity(_) | InventoryError::InvalidProduct(_) => {
                Self::InvalidRequestBody(e.to_string())
            },
            InventoryError::StoreError(e) => Self::BackendError(e.to_string()),
        }
    }
}
