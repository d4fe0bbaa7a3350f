use crate::PhoneNumber;

/// Splits a free-form phone number into the area code (first four digits) and the local number.
///
/// Non-digit characters are discarded. Returns `None` if there are no digits at all.
pub fn split_phone_number(phone: &str) -> Option<PhoneNumber> {
    let digits = phone.chars().filter(char::is_ascii_digit).collect::<String>();
    if digits.is_empty() {
        return None;
    }
    let split = digits.len().min(4);
    let (area_code, number) = digits.split_at(split);
    Some(PhoneNumber { area_code: area_code.to_string(), number: number.to_string() })
}
