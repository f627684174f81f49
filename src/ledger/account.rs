//! Bank accounts and their running balances.

use rusqlite::{Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    database_id::AccountId,
    money::{check_amount, checked_sum, get_decimal, to_sql_text},
    user::UserID,
};

/// A bank account owned by a user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Account {
    /// The ID of the account.
    pub id: AccountId,
    /// The user that owns the account.
    pub user_id: UserID,
    /// The name of the account, unique per user.
    pub name: String,
    /// Free text describing the account, e.g. "checking" or "savings".
    pub kind: String,
    /// The balance when the account was added.
    pub initial_balance: Decimal,
    /// The balance after every transaction that has not been removed.
    pub current_balance: Decimal,
    /// When the account was added.
    pub created_at: OffsetDateTime,
    /// When the account was closed, `None` if it is still open.
    pub closed_at: Option<OffsetDateTime>,
}

/// The data needed to open a new account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAccount {
    /// The name of the account.
    pub name: String,
    /// Free text describing the account.
    pub kind: String,
    /// The opening balance.
    #[serde(default)]
    pub initial_balance: Decimal,
}

/// Create the account table.
pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS account (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                kind TEXT NOT NULL,
                initial_balance TEXT NOT NULL,
                current_balance TEXT NOT NULL,
                created_at TEXT NOT NULL,
                closed_at TEXT,
                UNIQUE(user_id, name),
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

/// Open a new account for `user_id`.
///
/// The current balance starts at the initial balance.
///
/// # Errors
/// Returns [Error::DuplicateAccountName] if the user already has an account
/// with the same name, or [Error::AmountTooLarge] if the initial balance is
/// not smaller than [crate::money::MAX_AMOUNT].
pub fn create_account(
    user_id: UserID,
    new_account: NewAccount,
    connection: &Connection,
) -> Result<Account, Error> {
    check_amount(new_account.initial_balance)?;
    let created_at = OffsetDateTime::now_utc();
    let balance = to_sql_text(new_account.initial_balance);

    connection
        .execute(
            "INSERT INTO account (user_id, name, kind, initial_balance, current_balance, created_at)
            VALUES (?1, ?2, ?3, ?4, ?4, ?5)",
            (
                user_id.as_i64(),
                &new_account.name,
                &new_account.kind,
                &balance,
                created_at,
            ),
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                _,
            ) => Error::DuplicateAccountName(new_account.name.clone()),
            error => error.into(),
        })?;

    Ok(Account {
        id: connection.last_insert_rowid(),
        user_id,
        name: new_account.name,
        kind: new_account.kind,
        initial_balance: new_account.initial_balance,
        current_balance: new_account.initial_balance,
        created_at,
        closed_at: None,
    })
}

/// Get an account that belongs to `user_id`.
///
/// # Errors
/// Returns [Error::NotFound] if the account does not exist, or
/// [Error::UnauthorizedAccount] if it belongs to someone else.
pub fn get_account(
    account_id: AccountId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Account, Error> {
    let account = connection
        .prepare(
            "SELECT id, user_id, name, kind, initial_balance, current_balance, created_at, closed_at
            FROM account WHERE id = :id",
        )?
        .query_row(&[(":id", &account_id)], map_account_row)?;

    if account.user_id != user_id {
        tracing::warn!(
            "User {} tried to access account {} owned by user {}",
            user_id,
            account_id,
            account.user_id
        );
        return Err(Error::UnauthorizedAccount);
    }

    Ok(account)
}

/// Get all of a user's accounts ordered by name.
pub fn get_accounts(user_id: UserID, connection: &Connection) -> Result<Vec<Account>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, name, kind, initial_balance, current_balance, created_at, closed_at
            FROM account WHERE user_id = :user_id ORDER BY name ASC",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_account_row)?
        .map(|maybe_account| maybe_account.map_err(|error| error.into()))
        .collect()
}

/// Get the current balance of a single account.
///
/// # Errors
/// Same as [get_account].
pub fn get_account_balance(
    account_id: AccountId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Decimal, Error> {
    get_account(account_id, user_id, connection).map(|account| account.current_balance)
}

/// Sum the current balances of a user's open accounts.
pub fn get_total_balance(user_id: UserID, connection: &Connection) -> Result<Decimal, Error> {
    let balances = connection
        .prepare("SELECT current_balance FROM account WHERE user_id = :user_id AND closed_at IS NULL")?
        .query_map(&[(":user_id", &user_id.as_i64())], |row| get_decimal(row, 0))?
        .collect::<Result<Vec<Decimal>, rusqlite::Error>>()?;

    balances.into_iter().try_fold(Decimal::ZERO, checked_sum)
}

/// Get the IDs of a user's open accounts.
pub fn get_open_account_ids(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<AccountId>, Error> {
    connection
        .prepare("SELECT id FROM account WHERE user_id = :user_id AND closed_at IS NULL")?
        .query_map(&[(":user_id", &user_id.as_i64())], |row| row.get(0))?
        .map(|maybe_id| maybe_id.map_err(|error| error.into()))
        .collect()
}

/// Add `delta` to an account's current balance.
///
/// # Errors
/// Returns [Error::AmountTooLarge] if the new balance would overflow.
pub(super) fn adjust_balance(
    account_id: AccountId,
    delta: Decimal,
    connection: &Connection,
) -> Result<(), Error> {
    let current = connection
        .query_row(
            "SELECT current_balance FROM account WHERE id = ?1",
            [account_id],
            |row| get_decimal(row, 0),
        )
        .optional()?
        .ok_or(Error::NotFound)?;

    connection.execute(
        "UPDATE account SET current_balance = ?1 WHERE id = ?2",
        (to_sql_text(checked_sum(current, delta)?), account_id),
    )?;

    Ok(())
}

fn map_account_row(row: &Row) -> Result<Account, rusqlite::Error> {
    Ok(Account {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        name: row.get(2)?,
        kind: row.get(3)?,
        initial_balance: get_decimal(row, 4)?,
        current_balance: get_decimal(row, 5)?,
        created_at: row.get(6)?,
        closed_at: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use rust_decimal_macros::dec;
    use time::OffsetDateTime;

    use crate::{
        Error, PasswordHash,
        db::initialize,
        user::{UserID, create_user},
    };

    use super::{
        NewAccount, adjust_balance, create_account, get_account, get_account_balance,
        get_accounts, get_total_balance,
    };

    fn get_test_connection() -> (Connection, UserID, UserID) {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let alice = create_user("alice", PasswordHash::new_unchecked("a"), &connection).unwrap();
        let bob = create_user("bob", PasswordHash::new_unchecked("b"), &connection).unwrap();

        (connection, alice.id, bob.id)
    }

    fn new_account(name: &str, balance: rust_decimal::Decimal) -> NewAccount {
        NewAccount {
            name: name.to_owned(),
            kind: "checking".to_owned(),
            initial_balance: balance,
        }
    }

    #[test]
    fn create_and_get_account() {
        let (connection, alice, _) = get_test_connection();

        let created =
            create_account(alice, new_account("Everyday", dec!(12.34)), &connection).unwrap();
        let got = get_account(created.id, alice, &connection).unwrap();

        assert_eq!(got.name, "Everyday");
        assert_eq!(got.initial_balance, dec!(12.34));
        assert_eq!(got.current_balance, dec!(12.34));
        assert_eq!(got.closed_at, None);
    }

    #[test]
    fn duplicate_account_name_fails() {
        let (connection, alice, bob) = get_test_connection();
        create_account(alice, new_account("Everyday", dec!(0)), &connection).unwrap();

        let result = create_account(alice, new_account("Everyday", dec!(0)), &connection);
        assert_eq!(result, Err(Error::DuplicateAccountName("Everyday".to_owned())));

        // Names only need to be unique per user.
        assert!(create_account(bob, new_account("Everyday", dec!(0)), &connection).is_ok());
    }

    #[test]
    fn get_account_owned_by_someone_else_fails() {
        let (connection, alice, bob) = get_test_connection();
        let account = create_account(alice, new_account("Everyday", dec!(0)), &connection).unwrap();

        assert_eq!(
            get_account(account.id, bob, &connection),
            Err(Error::UnauthorizedAccount)
        );
        assert_eq!(get_account(999, alice, &connection), Err(Error::NotFound));
    }

    #[test]
    fn total_balance_skips_closed_accounts() {
        let (connection, alice, bob) = get_test_connection();
        create_account(alice, new_account("Everyday", dec!(100.10)), &connection).unwrap();
        create_account(alice, new_account("Savings", dec!(900)), &connection).unwrap();
        let closed = create_account(alice, new_account("Old", dec!(50)), &connection).unwrap();
        create_account(bob, new_account("Bob's", dec!(1000)), &connection).unwrap();
        connection
            .execute(
                "UPDATE account SET closed_at = ?1 WHERE id = ?2",
                (OffsetDateTime::UNIX_EPOCH, closed.id),
            )
            .unwrap();

        assert_eq!(get_total_balance(alice, &connection), Ok(dec!(1000.10)));
    }

    #[test]
    fn adjust_balance_keeps_exact_decimals() {
        let (connection, alice, _) = get_test_connection();
        let account = create_account(alice, new_account("Everyday", dec!(0.1)), &connection).unwrap();

        adjust_balance(account.id, dec!(0.2), &connection).unwrap();

        assert_eq!(
            get_account_balance(account.id, alice, &connection),
            Ok(dec!(0.3))
        );
    }

    #[test]
    fn adjust_balance_past_decimal_range_fails() {
        let (connection, alice, _) = get_test_connection();
        let account = create_account(alice, new_account("Everyday", dec!(1)), &connection).unwrap();

        let result = adjust_balance(account.id, rust_decimal::Decimal::MAX, &connection);

        assert_eq!(result, Err(Error::AmountTooLarge));
        assert_eq!(
            get_account_balance(account.id, alice, &connection),
            Ok(dec!(1))
        );
    }

    #[test]
    fn huge_initial_balance_is_rejected() {
        let (connection, alice, _) = get_test_connection();

        let result = create_account(
            alice,
            new_account("Everyday", dec!(10000000000000000000000000000)),
            &connection,
        );

        assert_eq!(result, Err(Error::AmountTooLarge));
    }

    #[test]
    fn accounts_are_sorted_by_name() {
        let (connection, alice, _) = get_test_connection();
        create_account(alice, new_account("Savings", dec!(0)), &connection).unwrap();
        create_account(alice, new_account("Everyday", dec!(0)), &connection).unwrap();

        let names: Vec<String> = get_accounts(alice, &connection)
            .unwrap()
            .into_iter()
            .map(|account| account.name)
            .collect();

        assert_eq!(names, ["Everyday", "Savings"]);
    }
}
