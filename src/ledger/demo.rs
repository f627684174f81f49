//! Fills a user's ledger with random accounts and transactions to try the app out.

use rand::{Rng, seq::SliceRandom};
use rust_decimal::Decimal;
use serde::Serialize;
use time::{Date, Duration, macros::date};

use crate::{
    Error,
    ledger::{
        account::{NewAccount, create_account},
        category::{CategoryKind, get_categories},
        transaction::{NewTransaction, create_transaction},
    },
    user::UserID,
};

/// How many income and how many expense transactions are generated.
const TRANSACTIONS_PER_KIND: usize = 25;

/// The first this many transactions of each kind go into the checking account.
const CHECKING_SHARE: usize = 13;

const PAYEES: [&str; 8] = [
    "Countdown",
    "Acme Ltd",
    "City Council",
    "Corner Cafe",
    "Power Co",
    "Bus Company",
    "Cinema",
    "Landlord",
];

const PRODUCTS: [&str; 10] = [
    "Bread",
    "Coffee",
    "Shoes",
    "Movie tickets",
    "Bus fare",
    "Electricity",
    "Rent",
    "Headphones",
    "Salary",
    "Refund",
];

/// The result of generating demo data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemoData {
    /// How many transactions were recorded.
    pub transactions_made: usize,
}

/// Open a checking and a savings account for `user_id` with random balances
/// and record 25 random income and 25 random expense transactions.
///
/// Transactions are dated between the start of 2024 and `today`.
///
/// # Errors
/// Returns [Error::DuplicateAccountName] if the user already has an account
/// called "Checking" or "Savings".
pub fn create_demo_data<R: Rng>(
    user_id: UserID,
    today: Date,
    rng: &mut R,
    connection: &rusqlite::Connection,
) -> Result<DemoData, Error> {
    let mut account_ids = Vec::with_capacity(2);
    for (name, kind) in [("Checking", "checking"), ("Savings", "savings")] {
        let account = create_account(
            user_id,
            NewAccount {
                name: name.to_owned(),
                kind: kind.to_owned(),
                initial_balance: random_amount(rng, 4),
            },
            connection,
        )?;
        account_ids.push(account.id);
    }

    let categories = get_categories(user_id, connection)?;
    let ids_of_kind = |kind: CategoryKind| -> Vec<i64> {
        categories
            .iter()
            .filter(|category| category.owner_id.is_none() && category.kind == kind)
            .map(|category| category.id)
            .collect()
    };
    let credit_categories = ids_of_kind(CategoryKind::Credit);
    let debit_categories = ids_of_kind(CategoryKind::Debit);

    let first_day = date!(2024 - 01 - 01).min(today - Duration::days(365));
    let day_count = (today - first_day).whole_days();

    let mut transactions_made = 0;
    let kinds = [
        (Decimal::ONE, &credit_categories),
        (Decimal::NEGATIVE_ONE, &debit_categories),
    ];

    for (sign, category_ids) in kinds {
        for i in 0..TRANSACTIONS_PER_KIND {
            let digits = rng.gen_range(1..=3);
            let account_id = if i < CHECKING_SHARE {
                account_ids[0]
            } else {
                account_ids[1]
            };

            create_transaction(
                NewTransaction {
                    account_id,
                    amount: sign * random_amount(rng, digits),
                    date: first_day + Duration::days(rng.gen_range(0..=day_count)),
                    category_id: category_ids.choose(rng).copied(),
                    category_name: None,
                    payee: PAYEES.choose(rng).map(|payee| payee.to_string()),
                    description: PRODUCTS.choose(rng).copied().unwrap_or_default().to_owned(),
                    is_transfer: false,
                    transfer_account_id: None,
                },
                user_id,
                today,
                connection,
            )?;
            transactions_made += 1;
        }
    }

    tracing::info!("Created {transactions_made} demo transactions for user {user_id}");

    Ok(DemoData { transactions_made })
}

/// A random amount of money with up to `digits` digits before the decimal point.
fn random_amount<R: Rng>(rng: &mut R, digits: u32) -> Decimal {
    let cents: i64 = rng.gen_range(0..10_i64.pow(digits + 2));

    Decimal::new(cents, 2)
}
