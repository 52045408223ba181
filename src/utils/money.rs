// Conversão entre unidades maiores (dólares) e unidades menores (centavos)

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;

/// Minor units per major unit. The processor always expects cents.
pub const MINOR_UNITS_PER_MAJOR: u64 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    #[error("amount must be greater than zero")]
    NotPositive,
    #[error("amount has more than two decimal places")]
    SubMinorPrecision,
    #[error("amount is too large")]
    Overflow,
}

/// Converts a major-unit amount (e.g. `10.50` dollars) into minor units (`1050` cents).
///
/// Amounts that cannot be represented exactly in cents are rejected rather than rounded.
pub fn to_minor_units(amount: Decimal) -> Result<u64, MoneyError> {
    if amount <= Decimal::ZERO {
        return Err(MoneyError::NotPositive);
    }

    let minor = amount
        .checked_mul(Decimal::from(MINOR_UNITS_PER_MAJOR))
        .ok_or(MoneyError::Overflow)?;

    if !minor.fract().is_zero() {
        return Err(MoneyError::SubMinorPrecision);
    }

    minor.to_u64().ok_or(MoneyError::Overflow)
}

pub fn format_currency(amount: u64) -> String {
    format!(
        "${}.{:02}",
        amount / MINOR_UNITS_PER_MAJOR,
        amount % MINOR_UNITS_PER_MAJOR
    )
}
