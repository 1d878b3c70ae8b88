//! Fixed-point money helpers.
//!
//! Amounts travel as base-10 decimal strings with two fractional digits
//! (`"30.00"`) and are held as `rust_decimal::Decimal` with scale 2.

use crate::error::AppError;
use rust_decimal::Decimal;

/// Number of fractional digits carried by every amount and balance.
pub const SCALE: u32 = 2;

/// Largest balance a `NUMERIC(19,2)` column holds.
pub fn max_balance() -> Decimal {
    Decimal::from_i128_with_scale(9_999_999_999_999_999_999, SCALE)
}

/// Largest transfer amount a `NUMERIC(15,2)` column holds.
pub fn max_amount() -> Decimal {
    Decimal::from_i128_with_scale(999_999_999_999_999, SCALE)
}

/// Rescale to exactly two fractional digits.
///
/// Callers must have rejected values with more precision first;
/// rescaling never rounds an accepted value.
pub fn normalize(mut amount: Decimal) -> Decimal {
    amount.rescale(SCALE);
    amount
}

/// Validate a transfer amount: strictly positive, at most two decimals,
/// within [`max_amount`].
pub fn transfer_amount(amount: Decimal) -> Result<Decimal, AppError> {
    if amount <= Decimal::ZERO {
        return Err(AppError::InvalidRequest(
            "Amount must be greater than 0".to_string(),
        ));
    }
    if amount > max_amount() {
        return Err(AppError::InvalidRequest(format!(
            "Amount cannot exceed {}",
            max_amount()
        )));
    }
    check_precision(amount)?;
    Ok(normalize(amount))
}

/// Validate an opening balance: zero or positive, at most two decimals.
pub fn opening_balance(amount: Decimal) -> Result<Decimal, AppError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(AppError::InvalidRequest(
            "Initial balance cannot be negative".to_string(),
        ));
    }
    if amount > max_balance() {
        return Err(AppError::InvalidRequest(format!(
            "Initial balance cannot exceed {}",
            max_balance()
        )));
    }
    check_precision(amount)?;
    Ok(normalize(amount))
}

fn check_precision(amount: Decimal) -> Result<(), AppError> {
    if amount.normalize().scale() > SCALE {
        return Err(AppError::InvalidRequest(format!(
            "Amount {amount} has more than {SCALE} fractional digits"
        )));
    }
    Ok(())
}
