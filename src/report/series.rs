//! Income and expense totals per period, ready for a bar chart.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;
use time::Date;

use crate::{Error, ledger::Transaction, money::round_money, report::period::Period};

/// The longest window, in calendar months, that month-name labels can cover
/// without two periods sharing a label.
const MAX_SERIES_MONTHS: i32 = 12;

/// Income and expense totals for a list of periods, oldest first.
///
/// All three vectors have the same length.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncomeExpenseSeries {
    /// Month names for each period, e.g. "Jan".
    pub labels: Vec<String>,
    /// The sum of credits in each period.
    pub income: Vec<Decimal>,
    /// The absolute sum of debits in each period.
    pub expense: Vec<Decimal>,
}

#[derive(Debug, Default, Clone, Copy)]
struct Totals {
    income: Decimal,
    expense: Decimal,
}

/// Sum credits and debits into each of `periods`.
///
/// Transfers and removed transactions are ignored. Periods without any
/// transactions are still emitted with zero totals. `periods` may be in any
/// order; the output is sorted oldest first.
///
/// # Errors
/// Returns [Error::SeriesWindowTooLong] if the periods span more than twelve
/// calendar months, since the month-name labels would repeat.
pub fn build_income_expense_series(
    transactions: &[Transaction],
    periods: &[Period],
) -> Result<IncomeExpenseSeries, Error> {
    check_window(periods)?;

    let mut totals: BTreeMap<Date, (Period, Totals)> = periods
        .iter()
        .map(|period| (period.start, (*period, Totals::default())))
        .collect();

    for transaction in transactions.iter().filter(|t| t.is_countable()) {
        let Some((_, bucket)) = totals
            .values_mut()
            .find(|(period, _)| period.contains(transaction.date))
        else {
            continue;
        };

        if transaction.amount > Decimal::ZERO {
            bucket.income += transaction.amount;
        } else {
            bucket.expense += transaction.amount.abs();
        }
    }

    let mut series = IncomeExpenseSeries {
        labels: Vec::with_capacity(totals.len()),
        income: Vec::with_capacity(totals.len()),
        expense: Vec::with_capacity(totals.len()),
    };

    for (period, bucket) in totals.into_values() {
        series.labels.push(period.label_month());
        series.income.push(round_money(bucket.income));
        series.expense.push(round_money(bucket.expense));
    }

    Ok(series)
}

fn check_window(periods: &[Period]) -> Result<(), Error> {
    let (Some(earliest), Some(latest)) = (
        periods.iter().map(|period| period.start).min(),
        periods.iter().map(|period| period.end).max(),
    ) else {
        return Ok(());
    };

    let months_spanned = (latest.year() - earliest.year()) * 12
        + (latest.month() as i32 - earliest.month() as i32)
        + 1;

    if months_spanned > MAX_SERIES_MONTHS {
        return Err(Error::SeriesWindowTooLong);
    }

    Ok(())
}
