//! Simulated payment gateway.
//!
//! Stateless dispatch over the supported payment instruments. Nothing here
//! touches storage or the network; every result is plain data handed back to
//! the checkout orchestrator, which decides what to persist.

use crate::entities::payment::{PaymentMethod, PaymentStatus};
use crate::errors::ServiceError;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

static EXPIRY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(0[1-9]|1[0-2])/\d{2}$").expect("valid expiry pattern"));
static CVV_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{3,4}$").expect("valid cvv pattern"));

/// Method-specific payment data, tagged by instrument.
///
/// Deserializing from the wire rejects unknown method tags at the boundary,
/// so the processor only ever sees supported instruments.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PaymentDetails {
    CreditCard {
        card_number: String,
        cardholder_name: String,
        /// MM/YY
        expiry: String,
        cvv: String,
    },
    Pix,
    Boleto,
}

impl PaymentDetails {
    pub fn method(&self) -> PaymentMethod {
        match self {
            PaymentDetails::CreditCard { .. } => PaymentMethod::CreditCard,
            PaymentDetails::Pix => PaymentMethod::Pix,
            PaymentDetails::Boleto => PaymentMethod::Boleto,
        }
    }
}

/// Outcome of a payment attempt.
#[derive(Debug, Clone)]
pub struct PaymentOutcome {
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub transaction_id: String,
    pub confirmation_code: Option<String>,
    pub message: String,
    pub card_last_four: Option<String>,
    pub cardholder_name: Option<String>,
}

/// Processes a payment attempt against the simulated gateway.
///
/// The amount must be strictly positive. Malformed instrument fields fail
/// with a field-specific `ValidationError`; a declined card is NOT an error
/// but an outcome with `PaymentStatus::Declined`.
pub fn process(amount: Decimal, details: &PaymentDetails) -> Result<PaymentOutcome, ServiceError> {
    if amount <= Decimal::ZERO {
        return Err(ServiceError::PaymentFailed(
            "payment amount must be greater than zero".to_string(),
        ));
    }

    match details {
        PaymentDetails::CreditCard {
            card_number,
            cardholder_name,
            expiry,
            cvv,
        } => process_credit_card(card_number, cardholder_name, expiry, cvv),
        PaymentDetails::Pix => Ok(process_pix()),
        PaymentDetails::Boleto => Ok(process_boleto()),
    }
}

fn process_credit_card(
    card_number: &str,
    cardholder_name: &str,
    expiry: &str,
    cvv: &str,
) -> Result<PaymentOutcome, ServiceError> {
    let digits: String = card_number.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 13 || digits.len() > 19 {
        return Err(ServiceError::ValidationError(
            "invalid card number".to_string(),
        ));
    }

    let holder = cardholder_name.trim();
    if holder.len() < 5 {
        return Err(ServiceError::ValidationError(
            "invalid cardholder name".to_string(),
        ));
    }

    if !EXPIRY_RE.is_match(expiry.trim()) {
        return Err(ServiceError::ValidationError(
            "invalid expiry date, expected MM/YY".to_string(),
        ));
    }

    if !CVV_RE.is_match(cvv.trim()) {
        return Err(ServiceError::ValidationError(
            "invalid security code".to_string(),
        ));
    }

    let transaction_id = new_transaction_id();
    let last_four = digits[digits.len() - 4..].to_string();

    // Simulation rule, standing in for an issuer check: cards whose final
    // digit is even are approved, odd are declined.
    let final_digit = last_four
        .chars()
        .last()
        .and_then(|c| c.to_digit(10))
        .expect("validated digits");

    let (status, message) = if final_digit % 2 != 0 {
        (
            PaymentStatus::Declined,
            "payment not authorized by the card issuer".to_string(),
        )
    } else {
        (
            PaymentStatus::Authorized,
            "credit card payment approved".to_string(),
        )
    };

    Ok(PaymentOutcome {
        method: PaymentMethod::CreditCard,
        status,
        transaction_id,
        confirmation_code: None,
        message,
        card_last_four: Some(last_four),
        cardholder_name: Some(holder.to_string()),
    })
}

/// Pix settles in real time: always authorized, with a confirmation code.
fn process_pix() -> PaymentOutcome {
    let code = format!(
        "PIX-{}",
        &Uuid::new_v4().simple().to_string().to_uppercase()[..10]
    );

    PaymentOutcome {
        method: PaymentMethod::Pix,
        status: PaymentStatus::Authorized,
        transaction_id: new_transaction_id(),
        confirmation_code: Some(code),
        message: "Pix payment confirmed".to_string(),
        card_last_four: None,
        cardholder_name: None,
    }
}

/// Boleto is an asynchronous instrument: always pending until clearance.
/// The confirmation code is a display-formatted pseudo digitable line.
fn process_boleto() -> PaymentOutcome {
    let block_source = Uuid::new_v4().simple().to_string().to_uppercase();
    let digitable_line = (0..25)
        .step_by(5)
        .map(|i| &block_source[i..i + 5])
        .collect::<Vec<_>>()
        .join(" ");

    PaymentOutcome {
        method: PaymentMethod::Boleto,
        status: PaymentStatus::Pending,
        transaction_id: new_transaction_id(),
        confirmation_code: Some(digitable_line),
        message: "boleto issued, awaiting clearance".to_string(),
        card_last_four: None,
        cardholder_name: None,
    }
}

fn new_transaction_id() -> String {
    Uuid::new_v4().simple().to_string()
}
