mod gateway_status;
mod helpers;
mod money;

pub mod op;
mod secret;

pub use gateway_status::{GatewayStatus, PaymentReport};
pub use helpers::{is_valid_payment_id, parse_boolean_flag, split_full_name};
pub use money::{Money, MoneyConversionError, STORE_CURRENCY_CODE};
pub use secret::Secret;
