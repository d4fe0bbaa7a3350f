const MAX_PAYMENT_ID_LENGTH: usize = 20;

/// Parse a boolean flag from a string value, or return the given default value otherwise.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let value = match value {
        Some(v) => v,
        None => return default,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// Splits a customer's full name into a first name and the remaining surname(s).
///
/// `"Ana María López"` becomes `("Ana", "María López")`. A single word has an empty surname.
pub fn split_full_name(full_name: &str) -> (String, String) {
    let mut parts = full_name.split_whitespace();
    let first = parts.next().unwrap_or_default().to_string();
    let rest = parts.collect::<Vec<_>>().join(" ");
    (first, rest)
}

/// Payment ids issued by the provider are decimal integers. Anything else must never reach a request URL.
pub fn is_valid_payment_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= MAX_PAYMENT_ID_LENGTH && id.bytes().all(|b| b.is_ascii_digit())
}
