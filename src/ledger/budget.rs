//! Budgets cap how much may be spent on a set of categories each period.

use rusqlite::{Connection, Row};
use rust_decimal::Decimal;
use serde::Serialize;
use time::{Date, macros::date};

use crate::{
    Error,
    database_id::{BudgetId, CategoryId},
    ledger::category::get_category,
    money::{check_amount, get_decimal, to_sql_text},
    report::{Cadence, snap_to_period_start},
    user::UserID,
};

/// A spending limit over one or more categories that resets every period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Budget {
    /// The ID of the budget.
    pub id: BudgetId,
    /// The user that created the budget.
    pub owner_id: UserID,
    /// The display name.
    pub name: String,
    /// Spending in any of these categories counts toward the budget.
    pub category_ids: Vec<CategoryId>,
    /// The most that should be spent in one period.
    pub cap: Decimal,
    /// How often the budget resets.
    pub cadence: Cadence,
    /// The start of the first period the budget covers.
    pub anchor_start: Date,
}

/// The earliest date a budget may start from.
pub const EARLIEST_BUDGET_START: Date = date!(1970 - 01 - 01);

/// The data needed to create a budget.
#[derive(Debug, Clone, Serialize)]
pub struct NewBudget {
    /// The display name.
    pub name: String,
    /// How often the budget resets.
    pub cadence: Cadence,
    /// The categories the budget covers.
    pub category_ids: Vec<CategoryId>,
    /// The most that should be spent in one period.
    pub cap: Decimal,
    /// Any date in the first period. It is moved back to the start of that period.
    pub start: Date,
}

/// The name and ID of a budget, for listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetSummary {
    /// The ID of the budget.
    pub id: BudgetId,
    /// The display name.
    pub name: String,
}

/// Create the budget table and the table joining budgets to categories.
pub fn create_budget_tables(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS budget (
            id INTEGER PRIMARY KEY,
            owner_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            cap TEXT NOT NULL,
            cadence TEXT NOT NULL,
            anchor_start TEXT NOT NULL,
            FOREIGN KEY(owner_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS budget_category (
            budget_id INTEGER NOT NULL,
            category_id INTEGER NOT NULL,
            PRIMARY KEY(budget_id, category_id),
            FOREIGN KEY(budget_id) REFERENCES budget(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE CASCADE
        );",
    )?;

    Ok(())
}

/// Create a budget for `owner_id`.
///
/// The start date is moved back to the start of the period containing it.
///
/// # Errors
/// Returns:
/// - [Error::EmptyBudgetName] if the name is blank,
/// - [Error::InvalidBudgetCap] if the cap is not greater than zero,
/// - [Error::AmountTooLarge] if the cap is too large to track,
/// - [Error::EmptyBudgetCategories] if no categories were given,
/// - [Error::InvalidBudgetStart] if the start is after `today` or before
///   [EARLIEST_BUDGET_START],
/// - [Error::InvalidCategory] if a category is not one the user can use.
pub fn create_budget(
    owner_id: UserID,
    new_budget: NewBudget,
    today: Date,
    connection: &Connection,
) -> Result<Budget, Error> {
    let name = new_budget.name.trim();
    if name.is_empty() {
        return Err(Error::EmptyBudgetName);
    }

    if new_budget.cap <= Decimal::ZERO {
        return Err(Error::InvalidBudgetCap);
    }
    check_amount(new_budget.cap)?;

    let mut category_ids = new_budget.category_ids;
    category_ids.sort_unstable();
    category_ids.dedup();

    if category_ids.is_empty() {
        return Err(Error::EmptyBudgetCategories);
    }

    if new_budget.start > today || new_budget.start < EARLIEST_BUDGET_START {
        return Err(Error::InvalidBudgetStart(new_budget.start));
    }

    let sql_transaction = connection.unchecked_transaction()?;

    for category_id in &category_ids {
        get_category(*category_id, owner_id, &sql_transaction)?;
    }

    let anchor_start = snap_to_period_start(new_budget.start, new_budget.cadence)?;

    sql_transaction.execute(
        "INSERT INTO budget (owner_id, name, cap, cadence, anchor_start) VALUES (?1, ?2, ?3, ?4, ?5)",
        (
            owner_id.as_i64(),
            name,
            to_sql_text(new_budget.cap),
            new_budget.cadence.as_str(),
            anchor_start,
        ),
    )?;
    let id = sql_transaction.last_insert_rowid();

    {
        let mut statement = sql_transaction
            .prepare("INSERT INTO budget_category (budget_id, category_id) VALUES (?1, ?2)")?;
        for category_id in &category_ids {
            statement.execute((id, category_id))?;
        }
    }

    sql_transaction.commit()?;

    Ok(Budget {
        id,
        owner_id,
        name: name.to_owned(),
        category_ids,
        cap: new_budget.cap,
        cadence: new_budget.cadence,
        anchor_start,
    })
}

/// Get a budget that belongs to `user_id`.
///
/// # Errors
/// Returns [Error::NotFound] if the budget does not exist, or
/// [Error::UnauthorizedBudget] if it belongs to someone else.
pub fn get_budget(
    budget_id: BudgetId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Budget, Error> {
    let mut budget = connection
        .prepare("SELECT id, owner_id, name, cap, cadence, anchor_start FROM budget WHERE id = :id")?
        .query_row(&[(":id", &budget_id)], map_budget_row)?;

    if budget.owner_id != user_id {
        tracing::warn!("User {user_id} tried to access budget {budget_id}");
        return Err(Error::UnauthorizedBudget);
    }

    budget.category_ids = connection
        .prepare(
            "SELECT category_id FROM budget_category WHERE budget_id = :budget_id ORDER BY category_id",
        )?
        .query_map(&[(":budget_id", &budget_id)], |row| row.get(0))?
        .collect::<Result<Vec<CategoryId>, rusqlite::Error>>()?;

    Ok(budget)
}

/// Get the names and IDs of a user's budgets ordered by name.
pub fn get_budgets(user_id: UserID, connection: &Connection) -> Result<Vec<BudgetSummary>, Error> {
    connection
        .prepare("SELECT id, name FROM budget WHERE owner_id = :owner_id ORDER BY name ASC, id ASC")?
        .query_map(&[(":owner_id", &user_id.as_i64())], |row| {
            Ok(BudgetSummary {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .map(|maybe_budget| maybe_budget.map_err(|error| error.into()))
        .collect()
}

/// Category IDs are filled in separately from the join table.
fn map_budget_row(row: &Row) -> Result<Budget, rusqlite::Error> {
    let raw_cadence: String = row.get(4)?;
    let cadence = raw_cadence.parse().map_err(|error: Error| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            Box::new(std::io::Error::other(error.to_string())),
        )
    })?;

    Ok(Budget {
        id: row.get(0)?,
        owner_id: UserID::new(row.get(1)?),
        name: row.get(2)?,
        category_ids: Vec::new(),
        cap: get_decimal(row, 3)?,
        cadence,
        anchor_start: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use rust_decimal_macros::dec;
    use time::macros::date;

    use crate::{
        Error, PasswordHash,
        db::initialize,
        ledger::category::{CategoryKind, find_or_create_category},
        report::Cadence,
        user::{UserID, create_user},
    };

    use super::{EARLIEST_BUDGET_START, NewBudget, create_budget, get_budget, get_budgets};

    const TODAY: time::Date = date!(2024 - 06 - 30);

    fn get_test_connection() -> (Connection, UserID, UserID) {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let alice = create_user("alice", PasswordHash::new_unchecked("a"), &connection)
            .unwrap()
            .id;
        let bob = create_user("bob", PasswordHash::new_unchecked("b"), &connection)
            .unwrap()
            .id;

        (connection, alice, bob)
    }

    fn food_budget(connection: &Connection, user_id: UserID) -> NewBudget {
        let groceries =
            find_or_create_category("Groceries", CategoryKind::Debit, user_id, connection)
                .unwrap();
        let dining =
            find_or_create_category("Dining", CategoryKind::Debit, user_id, connection).unwrap();

        NewBudget {
            name: "Food".to_owned(),
            cadence: Cadence::Quarterly,
            category_ids: vec![dining.id, groceries.id, dining.id],
            cap: dec!(1000),
            start: date!(2024 - 05 - 17),
        }
    }

    #[test]
    fn create_budget_snaps_anchor_and_dedups_categories() {
        let (connection, alice, _) = get_test_connection();
        let new_budget = food_budget(&connection, alice);

        let created = create_budget(alice, new_budget, TODAY, &connection).unwrap();

        assert_eq!(created.anchor_start, date!(2024 - 04 - 01));
        assert_eq!(created.category_ids.len(), 2);
        assert_eq!(get_budget(created.id, alice, &connection), Ok(created));
    }

    #[test]
    fn create_budget_validates_input() {
        let (connection, alice, _) = get_test_connection();
        let valid = food_budget(&connection, alice);

        let cases = [
            (
                NewBudget {
                    name: "  ".to_owned(),
                    ..valid.clone()
                },
                Error::EmptyBudgetName,
            ),
            (
                NewBudget {
                    cap: dec!(0),
                    ..valid.clone()
                },
                Error::InvalidBudgetCap,
            ),
            (
                NewBudget {
                    category_ids: vec![],
                    ..valid.clone()
                },
                Error::EmptyBudgetCategories,
            ),
            (
                NewBudget {
                    cap: dec!(1000000000000),
                    ..valid.clone()
                },
                Error::AmountTooLarge,
            ),
            (
                NewBudget {
                    start: date!(2024 - 07 - 01),
                    ..valid.clone()
                },
                Error::InvalidBudgetStart(date!(2024 - 07 - 01)),
            ),
            (
                NewBudget {
                    start: date!(1969 - 12 - 31),
                    ..valid.clone()
                },
                Error::InvalidBudgetStart(date!(1969 - 12 - 31)),
            ),
            (
                NewBudget {
                    category_ids: vec![999],
                    ..valid
                },
                Error::InvalidCategory(Some(999)),
            ),
        ];

        for (new_budget, want) in cases {
            assert_eq!(create_budget(alice, new_budget, TODAY, &connection), Err(want));
        }
    }

    #[test]
    fn budget_may_start_on_the_earliest_date_or_today() {
        let (connection, alice, _) = get_test_connection();
        let valid = food_budget(&connection, alice);

        for start in [EARLIEST_BUDGET_START, TODAY] {
            let created = create_budget(
                alice,
                NewBudget {
                    start,
                    cadence: Cadence::Weekly,
                    ..valid.clone()
                },
                TODAY,
                &connection,
            )
            .unwrap();

            assert!(created.anchor_start <= start);
        }
    }

    #[test]
    fn get_budget_owned_by_someone_else_fails() {
        let (connection, alice, bob) = get_test_connection();
        let new_budget = food_budget(&connection, alice);
        let created = create_budget(alice, new_budget, TODAY, &connection).unwrap();

        assert_eq!(
            get_budget(created.id, bob, &connection),
            Err(Error::UnauthorizedBudget)
        );
        assert_eq!(get_budget(999, alice, &connection), Err(Error::NotFound));
    }

    #[test]
    fn budgets_are_listed_by_name() {
        let (connection, alice, bob) = get_test_connection();
        let food = food_budget(&connection, alice);
        create_budget(
            alice,
            NewBudget {
                name: "Takeaways".to_owned(),
                ..food.clone()
            },
            TODAY,
            &connection,
        )
        .unwrap();
        create_budget(alice, food.clone(), TODAY, &connection).unwrap();
        create_budget(bob, food_budget(&connection, bob), TODAY, &connection).unwrap();

        let names: Vec<String> = get_budgets(alice, &connection)
            .unwrap()
            .into_iter()
            .map(|budget| budget.name)
            .collect();

        assert_eq!(names, ["Food", "Takeaways"]);
    }
}
