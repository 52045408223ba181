use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::app::config::{AmountField, EmailField, PayloadSettings};
use crate::models::payment::{mask_card_number, ValidatedPayment};

pub const APPROVED_STATUS: &str = "APPROVED";

// Payload enviado ao processador
#[derive(Debug, Clone, Serialize)]
pub struct TransactionRequest {
    #[serde(flatten)]
    pub amount: MinorAmount,
    pub currency: String,
    #[serde(flatten)]
    pub contact: CustomerContact,
    pub reference: String,
    pub payment_source: PaymentSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MinorAmount {
    #[serde(rename = "amount")]
    Amount(u64),
    #[serde(rename = "amount_in_cents")]
    AmountInCents(u64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CustomerContact {
    #[serde(rename = "email")]
    Email(String),
    #[serde(rename = "customer_data")]
    CustomerData(CustomerData),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerData {
    pub email: String,
}

#[derive(Clone, Serialize)]
pub struct PaymentSource {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub number: String,
    pub cvc: String,
    pub exp_month: String,
    pub exp_year: String,
    pub card_holder: String,
}

impl std::fmt::Debug for PaymentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentSource")
            .field("kind", &self.kind)
            .field("number", &mask_card_number(&self.number))
            .field("card_holder", &self.card_holder)
            .finish_non_exhaustive()
    }
}

impl MinorAmount {
    pub fn value(self) -> u64 {
        match self {
            Self::Amount(v) | Self::AmountInCents(v) => v,
        }
    }
}

impl TransactionRequest {
    pub fn new(payment: &ValidatedPayment, settings: &PayloadSettings, reference: Uuid) -> Self {
        let amount = match settings.amount_field {
            AmountField::Amount => MinorAmount::Amount(payment.amount_minor),
            AmountField::AmountInCents => MinorAmount::AmountInCents(payment.amount_minor),
        };
        let contact = match settings.email_field {
            EmailField::Email => CustomerContact::Email(payment.email.clone()),
            EmailField::CustomerData => CustomerContact::CustomerData(CustomerData {
                email: payment.email.clone(),
            }),
        };

        Self {
            amount,
            currency: settings.currency.clone(),
            contact,
            reference: reference.to_string(),
            payment_source: PaymentSource {
                kind: "CARD",
                number: payment.card_number.clone(),
                cvc: payment.cvc.clone(),
                exp_month: payment.expiry.month.clone(),
                exp_year: payment.expiry.year.clone(),
                card_holder: payment.card_holder.clone(),
            },
        }
    }
}

/// Normalized view of an approved transaction returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// The subset of a declined transaction that is safe to hand back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeclineDetail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionOutcome {
    Approved(TransactionSummary),
    Declined(DeclineDetail),
}

/// Reads the transaction status from `data.status`. `APPROVED` is the only
/// success; any other status is a decline. `None` means the body does not
/// carry a status at all.
pub fn classify_transaction(body: &Value) -> Option<TransactionOutcome> {
    let data = body.get("data")?;
    let status = data.get("status")?.as_str()?.trim();
    if status.is_empty() {
        return None;
    }

    if status.eq_ignore_ascii_case(APPROVED_STATUS) {
        Some(TransactionOutcome::Approved(TransactionSummary {
            id: text_field(data, "id"),
            status: status.to_ascii_uppercase(),
            reference: text_field(data, "reference"),
            amount: data
                .get("amount_in_cents")
                .or_else(|| data.get("amount"))
                .and_then(Value::as_u64),
            currency: text_field(data, "currency"),
            created_at: text_field(data, "created_at"),
        }))
    } else {
        Some(TransactionOutcome::Declined(DeclineDetail {
            transaction_id: text_field(data, "id"),
            status: status.to_ascii_uppercase(),
            status_message: text_field(data, "status_message"),
        }))
    }
}

fn text_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
