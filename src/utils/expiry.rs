use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpiryError {
    #[error("expiry date must have the form MM/YY")]
    Format,
    #[error("expiry month must be between 01 and 12")]
    Month,
}

/// Card expiry as the processor expects it: two-digit month, four-digit year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardExpiry {
    pub month: String,
    pub year: String,
}

/// Parses an `MM/YY` expiry. A single-digit month is zero-padded and the
/// year is expanded into the 2000s, so `"9/26"` becomes `("09", "2026")`.
pub fn parse_expiry(raw: &str) -> Result<CardExpiry, ExpiryError> {
    let (month, year) = raw.trim().split_once('/').ok_or(ExpiryError::Format)?;
    let (month, year) = (month.trim(), year.trim());

    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(month) || month.len() > 2 || !all_digits(year) || year.len() != 2 {
        return Err(ExpiryError::Format);
    }

    let month_number: u8 = month.parse().map_err(|_| ExpiryError::Format)?;
    if !(1..=12).contains(&month_number) {
        return Err(ExpiryError::Month);
    }

    Ok(CardExpiry {
        month: format!("{month_number:02}"),
        year: format!("20{year}"),
    })
}
