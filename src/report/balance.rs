//! Reconstructs historical balances by walking back from the current balance.

use rust_decimal::Decimal;
use serde::Serialize;
use time::Date;

use crate::{ledger::Transaction, money::round_money, report::period::Period};

/// The label of the final point in a [BalanceHistory].
pub const NOW_LABEL: &str = "Now";

/// Balances at the start of each period, oldest first, followed by the
/// current balance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceHistory {
    /// The period start for each point, e.g. "Nov 1st", then "Now".
    pub labels: Vec<String>,
    /// The balance at each point.
    pub balances: Vec<Decimal>,
}

/// Which accounts a balance covers, which decides whether transfers move it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceScope {
    /// The sum over several accounts. Both legs of a transfer land inside the
    /// sum and cancel out, so transfers are skipped.
    Combined,
    /// A single account. A transfer leg moves money in or out of it.
    SingleAccount,
}

impl BalanceScope {
    fn moves_balance(self, transaction: &Transaction) -> bool {
        match self {
            Self::Combined => transaction.is_countable(),
            Self::SingleAccount => transaction.removed_at.is_none(),
        }
    }
}

/// Work out what the balance was at the start of each of `periods`, given the
/// balance today.
///
/// The balance at the start of a period is `current_balance` minus everything
/// that happened from that period's start up to `as_of`. Removed transactions
/// are ignored, as are transactions dated after `as_of`. Transfers are ignored
/// for a [BalanceScope::Combined] balance.
///
/// The result has one point per period, oldest first, and a trailing "Now"
/// point equal to `current_balance`.
pub fn project_balance_history(
    current_balance: Decimal,
    transactions: &[Transaction],
    periods: &[Period],
    as_of: Date,
    scope: BalanceScope,
) -> BalanceHistory {
    let mut history: Vec<(Date, Decimal)> = Vec::new();

    let mut countable: Vec<&Transaction> = transactions
        .iter()
        .filter(|transaction| scope.moves_balance(transaction) && transaction.date <= as_of)
        .collect();
    countable.sort_by(|a, b| b.date.cmp(&a.date));

    let mut starts: Vec<Date> = periods.iter().map(|period| period.start).collect();
    starts.sort_by(|a, b| b.cmp(a));

    // Walk both lists newest to oldest, carrying the sum of everything seen so far.
    let mut since_start = Decimal::ZERO;
    let mut remaining = countable.into_iter().peekable();

    for start in starts {
        while let Some(transaction) = remaining.next_if(|t| t.date >= start) {
            since_start += transaction.amount;
        }

        history.push((start, current_balance - since_start));
    }

    history.reverse();

    let mut labels: Vec<String> = history
        .iter()
        .map(|(start, _)| Period::label_for_start(*start))
        .collect();
    let mut balances: Vec<Decimal> = history
        .into_iter()
        .map(|(_, balance)| round_money(balance))
        .collect();

    labels.push(NOW_LABEL.to_owned());
    balances.push(round_money(current_balance));

    BalanceHistory { labels, balances }
}
