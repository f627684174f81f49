//! Monthly spending grouped by category, for a pie chart.

use std::collections::HashMap;

use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use rust_decimal::Decimal;
use serde::Serialize;
use time::Date;

use crate::{
    database_id::CategoryId,
    ledger::{Category, Transaction},
    money::round_money,
    report::period::month_containing,
};

/// The label used for spending that has no category.
pub const UNCATEGORIZED_LABEL: &str = "Uncategorized";

const PALETTE_SEED: u64 = 0x5EED_C010;

/// The total spent in one category over a month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySpend {
    /// The category name.
    pub category: String,
    /// The amount spent, as a positive number.
    pub amount: Decimal,
    /// The colour to draw this category with, as a CSS `hsla()` string.
    pub fill: String,
}

/// Total the debits in each category for the calendar month containing `month`.
///
/// Transactions without a category, or whose category is not in `categories`,
/// are grouped under [UNCATEGORIZED_LABEL]. Results are ordered by the largest
/// spend first, with ties broken by name.
pub fn category_spend_breakdown(
    transactions: &[Transaction],
    categories: &[Category],
    month: Date,
) -> Vec<CategorySpend> {
    let period = month_containing(month);
    let names: HashMap<CategoryId, &str> = categories
        .iter()
        .map(|category| (category.id, category.name.as_str()))
        .collect();

    let mut totals: HashMap<Option<CategoryId>, Decimal> = HashMap::new();

    for transaction in transactions.iter().filter(|t| {
        t.is_countable() && t.amount < Decimal::ZERO && period.contains(t.date)
    }) {
        let key = transaction.category_id.filter(|id| names.contains_key(id));
        *totals.entry(key).or_default() += transaction.amount;
    }

    let mut groups: Vec<(&str, Decimal)> = totals
        .into_iter()
        .map(|(id, total)| {
            let name = id
                .and_then(|id| names.get(&id).copied())
                .unwrap_or(UNCATEGORIZED_LABEL);
            (name, total)
        })
        .collect();
    groups.sort_by(|(a_name, a_total), (b_name, b_total)| {
        a_total.cmp(b_total).then_with(|| a_name.cmp(b_name))
    });

    let palette = category_palette(groups.len());

    groups
        .into_iter()
        .zip(palette)
        .map(|((name, total), fill)| CategorySpend {
            category: name.to_owned(),
            amount: round_money(total.abs()),
            fill,
        })
        .collect()
}

/// Generate `count` evenly spaced colours in a shuffled order.
///
/// The shuffle is seeded, so the same `count` always gives the same colours in
/// the same order.
pub fn category_palette(count: usize) -> Vec<String> {
    if count == 0 {
        return Vec::new();
    }

    let step = 360 / count;
    let mut colours: Vec<String> = (0..count)
        .map(|i| format!("hsla({},80%,50%,1.0)", i * step))
        .collect();

    let mut rng = StdRng::seed_from_u64(PALETTE_SEED ^ count as u64);
    colours.shuffle(&mut rng);

    colours
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rust_decimal_macros::dec;
    use time::macros::date;

    use crate::ledger::{Category, CategoryKind, Transaction};

    use super::{UNCATEGORIZED_LABEL, category_palette, category_spend_breakdown};

    fn categories() -> Vec<Category> {
        vec![
            Category {
                id: 1,
                name: "Groceries".to_owned(),
                kind: CategoryKind::Debit,
                owner_id: None,
            },
            Category {
                id: 2,
                name: "Rent".to_owned(),
                kind: CategoryKind::Debit,
                owner_id: None,
            },
            Category {
                id: 3,
                name: "Salary".to_owned(),
                kind: CategoryKind::Credit,
                owner_id: None,
            },
        ]
    }

    #[test]
    fn groups_debits_by_category_largest_first() {
        let transactions = [
            Transaction::build(dec!(-20), date!(2024 - 03 - 02), "")
                .category_id(Some(1))
                .finalise(1),
            Transaction::build(dec!(-35.5), date!(2024 - 03 - 09), "")
                .category_id(Some(1))
                .finalise(2),
            Transaction::build(dec!(-900), date!(2024 - 03 - 01), "")
                .category_id(Some(2))
                .finalise(3),
            Transaction::build(dec!(3000), date!(2024 - 03 - 15), "")
                .category_id(Some(3))
                .finalise(4),
            Transaction::build(dec!(-7), date!(2024 - 03 - 20), "").finalise(5),
        ];

        let got = category_spend_breakdown(&transactions, &categories(), date!(2024 - 03 - 15));

        let rows: Vec<_> = got
            .iter()
            .map(|spend| (spend.category.as_str(), spend.amount))
            .collect();
        assert_eq!(
            rows,
            [
                ("Rent", dec!(900)),
                ("Groceries", dec!(55.5)),
                (UNCATEGORIZED_LABEL, dec!(7)),
            ]
        );
    }

    #[test]
    fn only_counts_the_requested_month() {
        let transactions = [
            Transaction::build(dec!(-20), date!(2024 - 02 - 29), "")
                .category_id(Some(1))
                .finalise(1),
            Transaction::build(dec!(-10), date!(2024 - 04 - 01), "")
                .category_id(Some(1))
                .finalise(2),
        ];

        let got = category_spend_breakdown(&transactions, &categories(), date!(2024 - 03 - 01));

        assert!(got.is_empty());
    }

    #[test]
    fn transfers_and_removed_transactions_are_excluded() {
        let transactions = [
            Transaction::build(dec!(-500), date!(2024 - 03 - 02), "")
                .category_id(Some(2))
                .transfer(true)
                .finalise(1),
            Transaction::build(dec!(-15), date!(2024 - 03 - 02), "")
                .category_id(Some(1))
                .removed(true)
                .finalise(2),
        ];

        let got = category_spend_breakdown(&transactions, &categories(), date!(2024 - 03 - 01));

        assert!(got.is_empty());
    }

    #[test]
    fn ties_are_ordered_by_name() {
        let transactions = [
            Transaction::build(dec!(-10), date!(2024 - 03 - 02), "")
                .category_id(Some(2))
                .finalise(1),
            Transaction::build(dec!(-10), date!(2024 - 03 - 02), "")
                .category_id(Some(1))
                .finalise(2),
        ];

        let got = category_spend_breakdown(&transactions, &categories(), date!(2024 - 03 - 01));

        assert_eq!(got[0].category, "Groceries");
        assert_eq!(got[1].category, "Rent");
    }

    #[test]
    fn palette_is_deterministic_and_distinct() {
        let first = category_palette(6);
        let second = category_palette(6);

        assert_eq!(first, second);
        assert_eq!(first.iter().collect::<HashSet<_>>().len(), 6);
        assert!(first.contains(&"hsla(0,80%,50%,1.0)".to_owned()));
        assert!(first.contains(&"hsla(300,80%,50%,1.0)".to_owned()));
    }

    #[test]
    fn empty_palette() {
        assert!(category_palette(0).is_empty());
    }
}
