use thiserror::Error;

#[derive(Debug, Error)]
pub enum MercadoPagoApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("The Mercado Pago access token has not been configured")]
    Unconfigured,
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("{0:?} is not a valid payment id")]
    InvalidPaymentId(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
}
