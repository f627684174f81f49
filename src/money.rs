//! Helpers for exact decimal money values.
//!
//! Amounts are kept as [Decimal] everywhere and stored in SQLite as TEXT so
//! that sums never pick up binary floating point drift. Values are rounded to
//! cents only when they leave the aggregation code.

use std::{str::FromStr, sync::OnceLock};

use numfmt::{Formatter, Precision};
use rusqlite::{Row, types::Type};
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};

use crate::Error;

/// The number of decimal places money is rounded to for display and JSON.
pub const MONEY_DECIMAL_PLACES: u32 = 2;

/// The exclusive upper bound on the size of a single amount, 1,000,000,000,000.
///
/// Sums of many bounded amounts stay far below the largest [Decimal].
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xD4A5_1000, 0xE8, 0, false, 0);

/// Check that `amount` is small enough to be summed safely.
///
/// # Errors
/// Returns [Error::AmountTooLarge] if the size of `amount` is [MAX_AMOUNT] or more.
pub fn check_amount(amount: Decimal) -> Result<Decimal, Error> {
    if amount.abs() >= MAX_AMOUNT {
        return Err(Error::AmountTooLarge);
    }

    Ok(amount)
}

/// Add two amounts, failing instead of overflowing.
///
/// # Errors
/// Returns [Error::AmountTooLarge] if the sum does not fit in a [Decimal].
pub fn checked_sum(left: Decimal, right: Decimal) -> Result<Decimal, Error> {
    left.checked_add(right).ok_or(Error::AmountTooLarge)
}

/// Round `value` to whole cents, rounding half-cents away from zero.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Read a decimal stored as TEXT from column `index` of `row`.
///
/// # Errors
/// Returns [rusqlite::Error::FromSqlConversionFailure] if the text is not a valid decimal.
pub fn get_decimal(row: &Row, index: usize) -> Result<Decimal, rusqlite::Error> {
    let raw: String = row.get(index)?;

    Decimal::from_str(&raw).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error))
    })
}

/// Convert a decimal into the TEXT representation stored in the database.
pub fn to_sql_text(value: Decimal) -> String {
    value.normalize().to_string()
}

/// Format `amount` as a dollar amount with thousands separators, e.g. "-$1,234.50".
pub fn format_currency(amount: Decimal) -> String {
    static POSITIVE_FMT: OnceLock<Formatter> = OnceLock::new();
    static NEGATIVE_FMT: OnceLock<Formatter> = OnceLock::new();

    let amount = round_money(amount);

    if amount.is_zero() {
        return "$0.00".to_owned();
    }

    let formatter = if amount.is_sign_negative() {
        NEGATIVE_FMT.get_or_init(|| {
            Formatter::currency("-$")
                .expect("static currency prefix is valid")
                .precision(Precision::Decimals(2))
        })
    } else {
        POSITIVE_FMT.get_or_init(|| {
            Formatter::currency("$")
                .expect("static currency prefix is valid")
                .precision(Precision::Decimals(2))
        })
    };

    let mut formatted = formatter.fmt_string(amount.abs().to_f64().unwrap_or_default());

    // numfmt drops trailing zeros in the fraction, e.g. "$12.3" or "$12".
    match formatted.rfind('.') {
        None => formatted.push_str(".00"),
        Some(dot) if formatted.len() - dot == 2 => formatted.push('0'),
        Some(_) => {}
    }

    formatted
}
