use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use crate::utils::expiry::{parse_expiry, CardExpiry, ExpiryError};
use crate::utils::money::{to_minor_units, MoneyError};

/// Payment as submitted by the caller. Every field is optional on the wire;
/// [`PaymentRequest::validate`] decides which ones are required.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub email: Option<String>,
    pub card_holder: Option<String>,
    pub card_number: Option<String>,
    pub expiry_date: Option<String>,
    pub cvc: Option<String>,
    pub amount: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("email is not a valid address")]
    InvalidEmail,
    #[error("card number must contain 12 to 19 digits")]
    InvalidCardNumber,
    #[error("cvc must contain 3 or 4 digits")]
    InvalidCvc,
    #[error(transparent)]
    InvalidExpiry(#[from] ExpiryError),
    #[error("invalid amount: {0}")]
    InvalidAmount(#[from] MoneyError),
}

/// Payment fields after validation and normalization, ready to be turned into
/// a transaction request.
#[derive(Clone, PartialEq, Eq)]
pub struct ValidatedPayment {
    pub email: String,
    pub card_holder: String,
    pub card_number: String,
    pub cvc: String,
    pub expiry: CardExpiry,
    pub amount_minor: u64,
}

// Card data stays out of logs.
impl std::fmt::Debug for ValidatedPayment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatedPayment")
            .field("email", &self.email)
            .field("card_holder", &self.card_holder)
            .field("card_number", &mask_card_number(&self.card_number))
            .field("amount_minor", &self.amount_minor)
            .finish_non_exhaustive()
    }
}

impl PaymentRequest {
    /// With `strict`, all six fields must be present and well-formed. Without
    /// it only the expiry date and amount are required, since the outbound
    /// request cannot be built without them; other fields pass through as-is.
    pub fn validate(&self, strict: bool) -> Result<ValidatedPayment, ValidationError> {
        let text = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let email = text(&self.email);
        let card_holder = text(&self.card_holder);
        let card_number = text(&self.card_number).map(|n| normalize_card_number(&n));
        let expiry_date = text(&self.expiry_date);
        let cvc = text(&self.cvc);

        let mut missing = Vec::new();
        if strict {
            for (name, value) in [
                ("email", &email),
                ("cardHolder", &card_holder),
                ("cardNumber", &card_number),
            ] {
                if value.is_none() {
                    missing.push(name);
                }
            }
        }
        if expiry_date.is_none() {
            missing.push("expiryDate");
        }
        if strict && cvc.is_none() {
            missing.push("cvc");
        }
        if self.amount.is_none() {
            missing.push("amount");
        }
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing));
        }

        let email = email.unwrap_or_default();
        let card_number = card_number.unwrap_or_default();
        let cvc = cvc.unwrap_or_default();

        if strict {
            if !looks_like_email(&email) {
                return Err(ValidationError::InvalidEmail);
            }
            if !(12..=19).contains(&card_number.len()) || !is_digits(&card_number) {
                return Err(ValidationError::InvalidCardNumber);
            }
            if !(3..=4).contains(&cvc.len()) || !is_digits(&cvc) {
                return Err(ValidationError::InvalidCvc);
            }
        }

        let expiry = parse_expiry(expiry_date.as_deref().unwrap_or_default())?;
        let amount_minor = to_minor_units(self.amount.unwrap_or_default())?;

        Ok(ValidatedPayment {
            email,
            card_holder: card_holder.unwrap_or_default(),
            card_number,
            cvc,
            expiry,
            amount_minor,
        })
    }
}

fn normalize_card_number(raw: &str) -> String {
    raw.chars().filter(|c| !matches!(c, ' ' | '-')).collect()
}

fn is_digits(value: &str) -> bool {
    value.bytes().all(|b| b.is_ascii_digit())
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.contains(char::is_whitespace)
        }
        None => false,
    }
}

pub fn mask_card_number(number: &str) -> String {
    let chars: Vec<char> = number.chars().collect();
    let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
    format!("****{tail}")
}
