//! Human-readable customer codes.
//!
//! A customer code is two uppercase ASCII letters followed by four digits
//! (`^[A-Z]{2}\d{4}$`), e.g. `KQ0381`. Staff type it at the till to find a
//! customer, so it is deliberately short; uniqueness is enforced by the store.

use rand::Rng;

/// Length of every customer code.
pub const CUSTOMER_CODE_LEN: usize = 6;

/// Generates a random customer code.
pub fn generate_customer_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    let first = char::from(rng.random_range(b'A'..=b'Z'));
    let second = char::from(rng.random_range(b'A'..=b'Z'));
    let digits: u16 = rng.random_range(0..10_000);
    format!("{first}{second}{digits:04}")
}

/// Returns true if `code` matches `^[A-Z]{2}\d{4}$`.
#[must_use]
pub fn is_valid_customer_code(code: &str) -> bool {
    let bytes = code.as_bytes();
    bytes.len() == CUSTOMER_CODE_LEN
        && bytes[..2].iter().all(u8::is_ascii_uppercase)
        && bytes[2..].iter().all(u8::is_ascii_digit)
}

/// Normalizes user input (trim, uppercase) and returns it if it is a valid code.
#[must_use]
pub fn normalize_customer_code(input: &str) -> Option<String> {
    let code = input.trim().to_ascii_uppercase();
    is_valid_customer_code(&code).then_some(code)
}
