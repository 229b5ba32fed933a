//! Flat-rate shipping estimation by CEP (Brazilian postal code) prefix.

use crate::errors::ServiceError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

/// A resolved shipping quote.
#[derive(Debug, Clone, Serialize)]
pub struct ShippingQuote {
    /// Normalized 8-digit postal code
    pub postal_code: String,
    pub fee: Decimal,
}

/// Strips formatting and validates the postal code.
///
/// Accepts any input whose digits form exactly 8 characters ("01310-100",
/// "01310100", "01310 100" are all the same CEP).
pub fn normalize_postal_code(raw: &str) -> Result<String, ServiceError> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() != 8 {
        return Err(ServiceError::ValidationError(
            "malformed postal code: expected 8 digits".to_string(),
        ));
    }
    Ok(digits)
}

/// Computes the flat shipping fee for a postal code.
///
/// The fee depends only on the two-digit region prefix, through a fixed
/// ordered bracket table. Brackets are half-open and non-overlapping; any
/// prefix not matched by the first four falls to the catch-all tier.
pub fn quote(raw_postal_code: &str) -> Result<ShippingQuote, ServiceError> {
    let postal_code = normalize_postal_code(raw_postal_code)?;

    // Prefix is two ASCII digits by construction.
    let prefix: u8 = postal_code[..2].parse().expect("validated digits");

    let fee = match prefix {
        0..=19 => dec!(14.90),
        20..=29 => dec!(18.90),
        30..=59 => dec!(22.90),
        60..=79 => dec!(27.90),
        _ => dec!(34.90),
    };

    Ok(ShippingQuote { postal_code, fee })
}
