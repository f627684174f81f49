//! Spend against a budget cap, period by period.

use std::collections::BTreeMap;

use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::Serialize;

use crate::{
    ledger::{Budget, Transaction},
    money::round_money,
    report::period::Period,
};

/// Narrows a budget's transactions down further.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrillDown {
    /// Keep transactions whose payee name equals this exactly.
    Payee(String),
    /// Keep transactions whose description contains this, ignoring case.
    Description(String),
}

impl DrillDown {
    /// Build a drill-down from optional query values.
    ///
    /// Blank values are ignored and a payee takes precedence over a description.
    pub fn from_query(payee: Option<&str>, description: Option<&str>) -> Option<Self> {
        fn non_blank(value: Option<&str>) -> Option<&str> {
            value.map(str::trim).filter(|value| !value.is_empty())
        }

        match (non_blank(payee), non_blank(description)) {
            (Some(payee), _) => Some(Self::Payee(payee.to_owned())),
            (None, Some(text)) => Some(Self::Description(text.to_owned())),
            (None, None) => None,
        }
    }

    fn matches(&self, transaction: &Transaction) -> bool {
        match self {
            Self::Payee(name) => transaction
                .payee
                .as_ref()
                .is_some_and(|payee| &payee.name == name),
            Self::Description(text) => transaction
                .description
                .to_lowercase()
                .contains(&text.to_lowercase()),
        }
    }
}

/// The payee that received or paid the most within a period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Counterparty {
    /// The payee's name.
    pub name: String,
    /// The magnitude of the payee's net amount in the period.
    pub amount: Decimal,
}

/// How a budget fared over one period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetPeriodSummary {
    /// The period being summarised.
    #[serde(flatten)]
    pub period: Period,
    /// The budget's transactions in the period, after any drill-down.
    pub transactions: Vec<Transaction>,
    /// The magnitude of the net amount of `transactions`.
    pub total_spend: Decimal,
    /// `total_spend` as a whole percentage of the cap, rounded down.
    ///
    /// `None` when the cap is zero or the percentage is too large to represent.
    pub percent_of_cap: Option<i64>,
    /// The payee with the largest net amount, if any transaction has a payee.
    pub top_counterparty: Option<Counterparty>,
}

/// Summarise `budget` over each of `periods`, in the order given.
///
/// Only countable transactions in one of the budget's categories and dated
/// inside a period count towards that period.
pub fn evaluate_budget(
    budget: &Budget,
    periods: &[Period],
    transactions: &[Transaction],
    drill_down: Option<&DrillDown>,
) -> Vec<BudgetPeriodSummary> {
    let in_budget: Vec<&Transaction> = transactions
        .iter()
        .filter(|transaction| {
            transaction.is_countable()
                && transaction
                    .category_id
                    .is_some_and(|id| budget.category_ids.contains(&id))
                && drill_down.is_none_or(|filter| filter.matches(transaction))
        })
        .collect();

    periods
        .iter()
        .map(|period| {
            let period_transactions: Vec<Transaction> = in_budget
                .iter()
                .filter(|transaction| period.contains(transaction.date))
                .map(|transaction| (*transaction).clone())
                .collect();

            summarise_period(*period, period_transactions, budget.cap)
        })
        .collect()
}

fn summarise_period(
    period: Period,
    transactions: Vec<Transaction>,
    cap: Decimal,
) -> BudgetPeriodSummary {
    let net: Decimal = transactions.iter().map(|t| t.amount).sum();
    let total_spend = round_money(net.abs());

    let percent_of_cap = total_spend
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|scaled| scaled.checked_div(cap))
        .and_then(|percent| percent.floor().to_i64());

    let top_counterparty = top_counterparty(&transactions);

    BudgetPeriodSummary {
        period,
        transactions,
        total_spend,
        percent_of_cap,
        top_counterparty,
    }
}

fn top_counterparty(transactions: &[Transaction]) -> Option<Counterparty> {
    let mut by_payee: BTreeMap<&str, Decimal> = BTreeMap::new();

    for transaction in transactions {
        if let Some(payee) = &transaction.payee {
            *by_payee.entry(payee.name.as_str()).or_default() += transaction.amount;
        }
    }

    // Names are visited in ascending order, so ties keep the smallest name.
    let mut top: Option<(&str, Decimal)> = None;

    for (name, net) in by_payee {
        let magnitude = net.abs();

        if top.is_none_or(|(_, best)| magnitude > best) {
            top = Some((name, magnitude));
        }
    }

    top.map(|(name, amount)| Counterparty {
        name: name.to_owned(),
        amount: round_money(amount),
    })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use time::macros::date;

    use crate::{
        ledger::{Budget, Transaction},
        report::period::{Cadence, Period, bucket_periods},
        user::UserID,
    };

    use super::{Counterparty, DrillDown, evaluate_budget};

    const GROCERIES: i64 = 3;
    const DINING: i64 = 7;
    const RENT: i64 = 4;

    fn budget(cap: Decimal) -> Budget {
        Budget {
            id: 1,
            owner_id: UserID::new(1),
            name: "Food".to_owned(),
            category_ids: vec![GROCERIES, DINING],
            cap,
            cadence: Cadence::Monthly,
            anchor_start: date!(2024 - 01 - 01),
        }
    }

    fn february() -> Vec<Period> {
        bucket_periods(date!(2024 - 02 - 20), Cadence::Monthly, 1).unwrap()
    }

    #[test]
    fn reports_spend_and_percent_of_cap() {
        let transactions = [
            Transaction::build(dec!(-300), date!(2024 - 02 - 03), "Weekly shop")
                .category_id(Some(GROCERIES))
                .payee("Supermarket")
                .finalise(1),
            Transaction::build(dec!(-150), date!(2024 - 02 - 14), "Dinner")
                .category_id(Some(DINING))
                .payee("Bistro")
                .finalise(2),
            Transaction::build(dec!(-1200), date!(2024 - 02 - 01), "Rent")
                .category_id(Some(RENT))
                .payee("Landlord")
                .finalise(3),
        ];

        let got = evaluate_budget(&budget(dec!(1000)), &february(), &transactions, None);

        assert_eq!(got.len(), 1);
        assert_eq!(got[0].total_spend, dec!(450));
        assert_eq!(got[0].percent_of_cap, Some(45));
        assert_eq!(got[0].transactions.len(), 2);
        assert_eq!(
            got[0].top_counterparty,
            Some(Counterparty {
                name: "Supermarket".to_owned(),
                amount: dec!(300),
            })
        );
    }

    #[test]
    fn zero_cap_has_no_percentage() {
        let transactions = [Transaction::build(dec!(-10), date!(2024 - 02 - 03), "Snack")
            .category_id(Some(GROCERIES))
            .finalise(1)];

        let got = evaluate_budget(&budget(Decimal::ZERO), &february(), &transactions, None);

        assert_eq!(got[0].total_spend, dec!(10));
        assert_eq!(got[0].percent_of_cap, None);
    }

    #[test]
    fn overflowing_percentage_is_none() {
        let transactions = [Transaction::build(Decimal::MAX / dec!(10), date!(2024 - 02 - 03), "")
            .category_id(Some(GROCERIES))
            .finalise(1)];

        let got = evaluate_budget(&budget(dec!(0.01)), &february(), &transactions, None);

        assert_eq!(got[0].percent_of_cap, None);
    }

    #[test]
    fn percentage_is_rounded_down() {
        let transactions = [Transaction::build(dec!(-2), date!(2024 - 02 - 03), "Gum")
            .category_id(Some(GROCERIES))
            .finalise(1)];

        let got = evaluate_budget(&budget(dec!(3)), &february(), &transactions, None);

        assert_eq!(got[0].percent_of_cap, Some(66));
    }

    #[test]
    fn transfers_and_removed_transactions_are_excluded() {
        let transactions = [
            Transaction::build(dec!(-80), date!(2024 - 02 - 03), "Moved")
                .category_id(Some(GROCERIES))
                .transfer(true)
                .finalise(1),
            Transaction::build(dec!(-20), date!(2024 - 02 - 04), "Deleted")
                .category_id(Some(GROCERIES))
                .removed(true)
                .finalise(2),
        ];

        let got = evaluate_budget(&budget(dec!(100)), &february(), &transactions, None);

        assert!(got[0].transactions.is_empty());
        assert_eq!(got[0].total_spend, Decimal::ZERO);
        assert_eq!(got[0].percent_of_cap, Some(0));
        assert_eq!(got[0].top_counterparty, None);
    }

    #[test]
    fn one_summary_per_period_in_input_order() {
        let periods = bucket_periods(date!(2024 - 03 - 01), Cadence::Monthly, 3).unwrap();
        let transactions = [
            Transaction::build(dec!(-10), date!(2024 - 01 - 05), "Jan")
                .category_id(Some(GROCERIES))
                .finalise(1),
            Transaction::build(dec!(-30), date!(2024 - 03 - 01), "Mar")
                .category_id(Some(DINING))
                .finalise(2),
        ];

        let got = evaluate_budget(&budget(dec!(100)), &periods, &transactions, None);

        let spend: Vec<_> = got.iter().map(|summary| summary.total_spend).collect();
        assert_eq!(spend, [dec!(30), dec!(0), dec!(10)]);
        assert_eq!(got[0].period, periods[0]);
    }

    #[test]
    fn counterparty_ties_go_to_the_smallest_name() {
        let transactions = [
            Transaction::build(dec!(-50), date!(2024 - 02 - 03), "")
                .category_id(Some(GROCERIES))
                .payee("Zed's")
                .finalise(1),
            Transaction::build(dec!(-50), date!(2024 - 02 - 04), "")
                .category_id(Some(GROCERIES))
                .payee("Abe's")
                .finalise(2),
        ];

        let got = evaluate_budget(&budget(dec!(100)), &february(), &transactions, None);

        assert_eq!(
            got[0].top_counterparty.as_ref().map(|c| c.name.as_str()),
            Some("Abe's")
        );
    }

    #[test]
    fn counterparty_uses_net_amount_per_payee() {
        let transactions = [
            Transaction::build(dec!(-90), date!(2024 - 02 - 03), "")
                .category_id(Some(GROCERIES))
                .payee("Market")
                .finalise(1),
            Transaction::build(dec!(60), date!(2024 - 02 - 04), "Refund")
                .category_id(Some(GROCERIES))
                .payee("Market")
                .finalise(2),
            Transaction::build(dec!(-40), date!(2024 - 02 - 05), "")
                .category_id(Some(GROCERIES))
                .payee("Bakery")
                .finalise(3),
        ];

        let got = evaluate_budget(&budget(dec!(100)), &february(), &transactions, None);

        assert_eq!(
            got[0].top_counterparty,
            Some(Counterparty {
                name: "Bakery".to_owned(),
                amount: dec!(40),
            })
        );
    }

    #[test]
    fn drill_down_by_payee() {
        let transactions = [
            Transaction::build(dec!(-12), date!(2024 - 02 - 03), "")
                .category_id(Some(DINING))
                .payee("Cafe")
                .finalise(1),
            Transaction::build(dec!(-99), date!(2024 - 02 - 04), "")
                .category_id(Some(DINING))
                .payee("Cafeteria")
                .finalise(2),
        ];
        let filter = DrillDown::Payee("Cafe".to_owned());

        let got = evaluate_budget(&budget(dec!(100)), &february(), &transactions, Some(&filter));

        assert_eq!(got[0].transactions.len(), 1);
        assert_eq!(got[0].total_spend, dec!(12));
    }

    #[test]
    fn drill_down_by_description_ignores_case() {
        let transactions = [
            Transaction::build(dec!(-12), date!(2024 - 02 - 03), "Birthday DINNER")
                .category_id(Some(DINING))
                .finalise(1),
            Transaction::build(dec!(-99), date!(2024 - 02 - 04), "Lunch")
                .category_id(Some(DINING))
                .finalise(2),
        ];
        let filter = DrillDown::Description("dinner".to_owned());

        let got = evaluate_budget(&budget(dec!(100)), &february(), &transactions, Some(&filter));

        assert_eq!(got[0].transactions.len(), 1);
        assert_eq!(got[0].transactions[0].id, 1);
    }

    #[test]
    fn drill_down_from_query_prefers_payee() {
        assert_eq!(
            DrillDown::from_query(Some("Cafe"), Some("lunch")),
            Some(DrillDown::Payee("Cafe".to_owned()))
        );
        assert_eq!(
            DrillDown::from_query(Some("  "), Some("lunch")),
            Some(DrillDown::Description("lunch".to_owned()))
        );
        assert_eq!(DrillDown::from_query(None, Some("")), None);
    }
}
