//! Transactions are the entries in the ledger.
//!
//! The store hands back raw rows, including removed transactions and
//! transfers. Reports decide what counts with [Transaction::is_countable].

use rusqlite::{Connection, OptionalExtension, Row, ToSql, params_from_iter};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    database_id::{AccountId, CategoryId, TransactionId},
    ledger::{
        account::{Account, adjust_balance, get_account},
        category::{CategoryKind, find_or_create_category, get_category},
        payee::{Payee, find_or_create_payee},
    },
    money::{check_amount, get_decimal, to_sql_text},
    user::UserID,
};

/// The most transactions a page of results may hold.
pub const MAX_PAGE_SIZE: u32 = 100;

/// How many transactions [get_recent_transactions] returns by default.
pub const RECENT_TRANSACTION_COUNT: u32 = 10;

/// An amount of money moving in or out of an account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The account the money moved in or out of.
    pub account_id: AccountId,
    /// Positive for money coming in, negative for money going out.
    pub amount: Decimal,
    /// When the transaction happened.
    pub date: Date,
    /// The category the transaction is grouped under, if any.
    pub category_id: Option<CategoryId>,
    /// Who was paid or who paid. Only transfers may have no payee.
    pub payee: Option<Payee>,
    /// Free text describing the transaction.
    pub description: String,
    /// Whether the money moved between two of the user's own accounts.
    pub is_transfer: bool,
    /// When the transaction was recorded.
    pub created_at: OffsetDateTime,
    /// When the transaction was removed, `None` if it is still live.
    pub removed_at: Option<OffsetDateTime>,
}

impl Transaction {
    /// Whether the transaction should be included in sums.
    ///
    /// Transfers and removed transactions never count.
    pub fn is_countable(&self) -> bool {
        !self.is_transfer && self.removed_at.is_none()
    }
}

/// The data needed to record a transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransaction {
    /// The account the money moved in or out of.
    pub account_id: AccountId,
    /// Positive for money coming in, negative for money going out.
    pub amount: Decimal,
    /// When the transaction happened. Must not be in the future.
    pub date: Date,
    /// An existing category.
    pub category_id: Option<CategoryId>,
    /// The name of a category, used when `category_id` is not given.
    ///
    /// A category that does not exist yet is added for the user.
    pub category_name: Option<String>,
    /// The payee's name. Required unless this is a transfer.
    pub payee: Option<String>,
    /// Free text describing the transaction.
    #[serde(default)]
    pub description: String,
    /// Whether the money is moving to another of the user's accounts.
    #[serde(default)]
    pub is_transfer: bool,
    /// The account receiving a transfer.
    pub transfer_account_id: Option<AccountId>,
}

/// The new values for an existing transaction.
///
/// The account and whether the transaction is a transfer cannot change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionUpdate {
    /// The new amount. For a transfer only the size is used, each side keeps
    /// its direction.
    pub amount: Decimal,
    /// When the transaction happened. Must not be in the future.
    pub date: Date,
    /// An existing category.
    pub category_id: Option<CategoryId>,
    /// The name of a category, used when `category_id` is not given.
    pub category_name: Option<String>,
    /// The payee's name. Required unless this is a transfer.
    pub payee: Option<String>,
    /// Free text describing the transaction.
    #[serde(default)]
    pub description: String,
}

/// Which transactions [find_transactions] should return.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    /// Only include these accounts. `None` means all of the user's accounts.
    pub account_ids: Option<Vec<AccountId>>,
    /// The earliest date to include.
    pub start: Option<Date>,
    /// The latest date to include.
    pub end: Option<Date>,
}

/// A transaction with the names of the things it refers to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionListing {
    /// The transaction.
    #[serde(flatten)]
    pub transaction: Transaction,
    /// The name of the account.
    pub account_name: String,
    /// The name of the category, if any.
    pub category_name: Option<String>,
}

/// One page of an account's transactions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionPage {
    /// The account the transactions belong to.
    pub account: Account,
    /// The transactions on this page, newest first.
    pub transactions: Vec<Transaction>,
    /// The total number of pages.
    pub page_count: u32,
    /// The zero-based page number.
    pub current_page: u32,
}

/// Create the transaction table.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
            id INTEGER PRIMARY KEY,
            account_id INTEGER NOT NULL,
            amount TEXT NOT NULL,
            date TEXT NOT NULL,
            category_id INTEGER,
            payee_id INTEGER,
            description TEXT NOT NULL,
            is_transfer INTEGER NOT NULL DEFAULT 0,
            linked_transaction_id INTEGER,
            created_at TEXT NOT NULL,
            removed_at TEXT,
            FOREIGN KEY(account_id) REFERENCES account(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE SET NULL,
            FOREIGN KEY(payee_id) REFERENCES payee(id) ON UPDATE CASCADE ON DELETE SET NULL
        );

        CREATE INDEX IF NOT EXISTS idx_transaction_account_date ON \"transaction\"(account_id, date);",
    )?;

    Ok(())
}

const TRANSACTION_COLUMNS: &str = "t.id, t.account_id, t.amount, t.date, t.category_id, \
    t.payee_id, payee.name, t.description, t.is_transfer, t.created_at, t.removed_at";

const TRANSACTION_JOINS: &str = "FROM \"transaction\" t \
    INNER JOIN account ON account.id = t.account_id \
    LEFT JOIN payee ON payee.id = t.payee_id";

/// Record a transaction and update the account balance.
///
/// A transfer takes `|amount|` out of `account_id` and adds a second
/// transaction putting the same amount into `transfer_account_id`. Both
/// sides are marked as transfers and have no payee. The side taken out of
/// `account_id` is returned.
///
/// # Errors
/// Returns:
/// - [Error::FutureDate] if the date is after `today`,
/// - [Error::AmountTooLarge] if the amount is too large to track,
/// - [Error::NotFound] or [Error::UnauthorizedAccount] if an account does not
///   exist or belongs to someone else,
/// - [Error::MissingTransferAccount] if a transfer has no destination, or the
///   destination is the source account,
/// - [Error::MissingPayee] if a transaction that is not a transfer has no payee,
/// - [Error::InvalidCategory] if `category_id` is not a category the user can use.
pub fn create_transaction(
    new_transaction: NewTransaction,
    user_id: UserID,
    today: Date,
    connection: &Connection,
) -> Result<Transaction, Error> {
    if new_transaction.date > today {
        return Err(Error::FutureDate(new_transaction.date));
    }
    check_amount(new_transaction.amount)?;

    let sql_transaction = connection.unchecked_transaction()?;

    get_account(new_transaction.account_id, user_id, &sql_transaction)?;

    let transfer_account_id = if new_transaction.is_transfer {
        let to = new_transaction
            .transfer_account_id
            .filter(|to| *to != new_transaction.account_id)
            .ok_or(Error::MissingTransferAccount)?;
        get_account(to, user_id, &sql_transaction)?;
        Some(to)
    } else {
        None
    };

    let payee = resolve_payee(
        new_transaction.payee.as_deref(),
        new_transaction.is_transfer,
        user_id,
        &sql_transaction,
    )?;
    let category_id = resolve_category(
        new_transaction.category_id,
        new_transaction.category_name.as_deref(),
        category_kind(new_transaction.is_transfer, new_transaction.amount),
        user_id,
        &sql_transaction,
    )?;
    let created_at = OffsetDateTime::now_utc();

    let amount = if new_transaction.is_transfer {
        -new_transaction.amount.abs()
    } else {
        new_transaction.amount
    };

    let transaction = insert_transaction(
        Transaction {
            id: 0,
            account_id: new_transaction.account_id,
            amount,
            date: new_transaction.date,
            category_id,
            payee,
            description: new_transaction.description,
            is_transfer: new_transaction.is_transfer,
            created_at,
            removed_at: None,
        },
        &sql_transaction,
    )?;
    adjust_balance(transaction.account_id, transaction.amount, &sql_transaction)?;

    if let Some(to) = transfer_account_id {
        let other_side = insert_transaction(
            Transaction {
                id: 0,
                account_id: to,
                amount: amount.abs(),
                ..transaction.clone()
            },
            &sql_transaction,
        )?;
        adjust_balance(other_side.account_id, other_side.amount, &sql_transaction)?;
        link_transactions(transaction.id, other_side.id, &sql_transaction)?;
    }

    sql_transaction.commit()?;

    Ok(transaction)
}

/// Transfers have no payee, everything else must name one.
fn resolve_payee(
    name: Option<&str>,
    is_transfer: bool,
    user_id: UserID,
    connection: &Connection,
) -> Result<Option<Payee>, Error> {
    if is_transfer {
        return Ok(None);
    }

    let name = name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or(Error::MissingPayee)?;

    find_or_create_payee(name, user_id, connection).map(Some)
}

fn category_kind(is_transfer: bool, amount: Decimal) -> CategoryKind {
    if is_transfer {
        CategoryKind::Transfer
    } else if amount > Decimal::ZERO {
        CategoryKind::Credit
    } else {
        CategoryKind::Debit
    }
}

/// An ID wins over a name. A name that does not exist yet becomes a new
/// category of `kind`.
fn resolve_category(
    category_id: Option<CategoryId>,
    category_name: Option<&str>,
    kind: CategoryKind,
    user_id: UserID,
    connection: &Connection,
) -> Result<Option<CategoryId>, Error> {
    if let Some(category_id) = category_id {
        return get_category(category_id, user_id, connection).map(|category| Some(category.id));
    }

    let Some(name) = category_name.map(str::trim).filter(|name| !name.is_empty()) else {
        return Ok(None);
    };

    find_or_create_category(name, kind, user_id, connection).map(|category| Some(category.id))
}

fn insert_transaction(
    transaction: Transaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection.execute(
        "INSERT INTO \"transaction\"
        (account_id, amount, date, category_id, payee_id, description, is_transfer, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        (
            transaction.account_id,
            to_sql_text(transaction.amount),
            transaction.date,
            transaction.category_id,
            transaction.payee.as_ref().map(|payee| payee.id),
            &transaction.description,
            transaction.is_transfer,
            transaction.created_at,
        ),
    )?;

    Ok(Transaction {
        id: connection.last_insert_rowid(),
        ..transaction
    })
}

fn link_transactions(
    first: TransactionId,
    second: TransactionId,
    connection: &Connection,
) -> Result<(), Error> {
    connection.execute(
        "UPDATE \"transaction\" SET linked_transaction_id = ?2 WHERE id = ?1",
        (first, second),
    )?;
    connection.execute(
        "UPDATE \"transaction\" SET linked_transaction_id = ?1 WHERE id = ?2",
        (first, second),
    )?;

    Ok(())
}

/// Get a transaction from one of `user_id`'s accounts.
///
/// # Errors
/// Returns [Error::NotFound] if the transaction does not exist, or
/// [Error::UnauthorizedAccount] if it belongs to another user's account.
pub fn get_transaction(
    transaction_id: TransactionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let (transaction, owner) = connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS}, account.user_id {TRANSACTION_JOINS} WHERE t.id = ?1"
        ))?
        .query_row([transaction_id], |row| {
            Ok((map_transaction_row(row)?, UserID::new(row.get(11)?)))
        })?;

    if owner != user_id {
        tracing::warn!("User {user_id} tried to access transaction {transaction_id}");
        return Err(Error::UnauthorizedAccount);
    }

    Ok(transaction)
}

/// Change the amount, date, category, payee and description of a live
/// transaction and move the account balance by the difference.
///
/// Editing one side of a transfer edits the other side too, which keeps the
/// opposite sign.
///
/// # Errors
/// Returns:
/// - [Error::FutureDate] if the date is after `today`,
/// - [Error::AmountTooLarge] if the amount is too large to track,
/// - [Error::NotFound] if the transaction does not exist or was removed,
/// - [Error::UnauthorizedAccount] if it belongs to another user,
/// - [Error::MissingPayee] if a transaction that is not a transfer has no payee,
/// - [Error::InvalidCategory] if `category_id` is not a category the user can use.
pub fn update_transaction(
    transaction_id: TransactionId,
    update: TransactionUpdate,
    user_id: UserID,
    today: Date,
    connection: &Connection,
) -> Result<Transaction, Error> {
    if update.date > today {
        return Err(Error::FutureDate(update.date));
    }
    check_amount(update.amount)?;

    let sql_transaction = connection.unchecked_transaction()?;

    let existing = get_transaction(transaction_id, user_id, &sql_transaction)?;
    if existing.removed_at.is_some() {
        return Err(Error::NotFound);
    }

    let amount = if existing.is_transfer {
        if existing.amount.is_sign_negative() {
            -update.amount.abs()
        } else {
            update.amount.abs()
        }
    } else {
        update.amount
    };

    let payee = resolve_payee(
        update.payee.as_deref(),
        existing.is_transfer,
        user_id,
        &sql_transaction,
    )?;
    let category_id = resolve_category(
        update.category_id,
        update.category_name.as_deref(),
        category_kind(existing.is_transfer, amount),
        user_id,
        &sql_transaction,
    )?;

    let updated = Transaction {
        amount,
        date: update.date,
        category_id,
        payee,
        description: update.description,
        ..existing.clone()
    };
    rewrite_transaction(&existing, &updated, &sql_transaction)?;

    if let Some(linked_id) = linked_transaction_id(transaction_id, &sql_transaction)? {
        let linked = get_transaction(linked_id, user_id, &sql_transaction)?;
        if linked.removed_at.is_none() {
            let other_side = Transaction {
                id: linked.id,
                account_id: linked.account_id,
                amount: -amount,
                created_at: linked.created_at,
                ..updated.clone()
            };
            rewrite_transaction(&linked, &other_side, &sql_transaction)?;
        }
    }

    sql_transaction.commit()?;

    Ok(updated)
}

/// Overwrite the editable columns of `old` with the values in `new` and move
/// the balance by the change in amount.
fn rewrite_transaction(
    old: &Transaction,
    new: &Transaction,
    connection: &Connection,
) -> Result<(), Error> {
    connection.execute(
        "UPDATE \"transaction\"
        SET amount = ?1, date = ?2, category_id = ?3, payee_id = ?4, description = ?5
        WHERE id = ?6",
        (
            to_sql_text(new.amount),
            new.date,
            new.category_id,
            new.payee.as_ref().map(|payee| payee.id),
            &new.description,
            old.id,
        ),
    )?;

    adjust_balance(old.account_id, new.amount - old.amount, connection)
}

fn linked_transaction_id(
    transaction_id: TransactionId,
    connection: &Connection,
) -> Result<Option<TransactionId>, Error> {
    let linked_id = connection
        .query_row(
            "SELECT linked_transaction_id FROM \"transaction\" WHERE id = ?1",
            [transaction_id],
            |row| row.get(0),
        )
        .optional()?
        .flatten();

    Ok(linked_id)
}

/// Soft delete a transaction and take its amount back off the account balance.
///
/// Removing one side of a transfer removes the other side too.
///
/// # Errors
/// Returns [Error::NotFound] if the transaction does not exist or was already
/// removed, or [Error::UnauthorizedAccount] if it belongs to another user.
pub fn remove_transaction(
    transaction_id: TransactionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let sql_transaction = connection.unchecked_transaction()?;

    let transaction = get_transaction(transaction_id, user_id, &sql_transaction)?;
    if transaction.removed_at.is_some() {
        return Err(Error::NotFound);
    }

    let removed_at = OffsetDateTime::now_utc();
    mark_removed(&transaction, removed_at, &sql_transaction)?;

    if let Some(linked_id) = linked_transaction_id(transaction_id, &sql_transaction)? {
        let linked = get_transaction(linked_id, user_id, &sql_transaction)?;
        if linked.removed_at.is_none() {
            mark_removed(&linked, removed_at, &sql_transaction)?;
        }
    }

    sql_transaction.commit()?;

    Ok(())
}

fn mark_removed(
    transaction: &Transaction,
    removed_at: OffsetDateTime,
    connection: &Connection,
) -> Result<(), Error> {
    connection.execute(
        "UPDATE \"transaction\" SET removed_at = ?1 WHERE id = ?2",
        (removed_at, transaction.id),
    )?;
    adjust_balance(transaction.account_id, -transaction.amount, connection)
}

/// Get the transactions on `user_id`'s accounts that match `filter`, oldest first.
///
/// Removed transactions and transfers are included.
pub fn find_transactions(
    user_id: UserID,
    filter: &TransactionFilter,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let mut clauses = vec!["account.user_id = ?".to_owned()];
    let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(user_id.as_i64())];

    if let Some(account_ids) = &filter.account_ids {
        if account_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; account_ids.len()].join(", ");
        clauses.push(format!("t.account_id IN ({placeholders})"));
        params.extend(
            account_ids
                .iter()
                .map(|id| Box::new(*id) as Box<dyn ToSql>),
        );
    }

    if let Some(start) = filter.start {
        clauses.push("t.date >= ?".to_owned());
        params.push(Box::new(start));
    }

    if let Some(end) = filter.end {
        clauses.push("t.date <= ?".to_owned());
        params.push(Box::new(end));
    }

    let query = format!(
        "SELECT {TRANSACTION_COLUMNS} {TRANSACTION_JOINS} WHERE {} ORDER BY t.date ASC, t.id ASC",
        clauses.join(" AND ")
    );

    connection
        .prepare(&query)?
        .query_map(params_from_iter(params.iter()), map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(|error| error.into()))
        .collect()
}

/// Get the newest `limit` live transactions across `user_id`'s accounts.
pub fn get_recent_transactions(
    user_id: UserID,
    limit: u32,
    connection: &Connection,
) -> Result<Vec<TransactionListing>, Error> {
    let query = format!(
        "SELECT {TRANSACTION_COLUMNS}, account.name, category.name {TRANSACTION_JOINS} \
        LEFT JOIN category ON category.id = t.category_id \
        WHERE account.user_id = ?1 AND t.removed_at IS NULL \
        ORDER BY t.date DESC, t.id DESC \
        LIMIT ?2"
    );

    connection
        .prepare(&query)?
        .query_map((user_id.as_i64(), limit), |row| {
            Ok(TransactionListing {
                transaction: map_transaction_row(row)?,
                account_name: row.get(11)?,
                category_name: row.get(12)?,
            })
        })?
        .map(|maybe_listing| maybe_listing.map_err(|error| error.into()))
        .collect()
}

/// Get one page of an account's live transactions, newest first.
///
/// # Errors
/// Returns [Error::InvalidPagination] if `per_page` is zero or larger than
/// [MAX_PAGE_SIZE], and the same errors as [get_account].
pub fn get_account_transactions_page(
    account_id: AccountId,
    user_id: UserID,
    page: u32,
    per_page: u32,
    connection: &Connection,
) -> Result<TransactionPage, Error> {
    if per_page == 0 || per_page > MAX_PAGE_SIZE {
        return Err(Error::InvalidPagination);
    }

    let account = get_account(account_id, user_id, connection)?;

    let count: i64 = connection.query_row(
        "SELECT COUNT(*) FROM \"transaction\" WHERE account_id = ?1 AND removed_at IS NULL",
        [account_id],
        |row| row.get(0),
    )?;

    let query = format!(
        "SELECT {TRANSACTION_COLUMNS} {TRANSACTION_JOINS} \
        WHERE t.account_id = ?1 AND t.removed_at IS NULL \
        ORDER BY t.date DESC, t.id DESC LIMIT ?2 OFFSET ?3"
    );
    let transactions = connection
        .prepare(&query)?
        .query_map(
            (account_id, per_page, i64::from(page) * i64::from(per_page)),
            map_transaction_row,
        )?
        .collect::<Result<Vec<Transaction>, rusqlite::Error>>()?;

    Ok(TransactionPage {
        account,
        transactions,
        page_count: ((count + i64::from(per_page) - 1) / i64::from(per_page)) as u32,
        current_page: page,
    })
}

fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let payee_id: Option<i64> = row.get(5)?;
    let payee_name: Option<String> = row.get(6)?;
    let payee = payee_id
        .zip(payee_name)
        .map(|(id, name)| Payee { id, name });

    Ok(Transaction {
        id: row.get(0)?,
        account_id: row.get(1)?,
        amount: get_decimal(row, 2)?,
        date: row.get(3)?,
        category_id: row.get(4)?,
        payee,
        description: row.get(7)?,
        is_transfer: row.get(8)?,
        created_at: row.get(9)?,
        removed_at: row.get(10)?,
    })
}

#[cfg(test)]
impl Transaction {
    /// Start building a transaction for tests of code that takes transactions
    /// as input.
    pub fn build(amount: Decimal, date: Date, description: &str) -> TransactionBuilder {
        TransactionBuilder {
            account_id: 1,
            amount,
            date,
            description: description.to_owned(),
            category_id: None,
            payee: None,
            is_transfer: false,
            is_removed: false,
        }
    }
}

/// Builds in-memory transactions for tests.
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    account_id: AccountId,
    amount: Decimal,
    date: Date,
    description: String,
    category_id: Option<CategoryId>,
    payee: Option<String>,
    is_transfer: bool,
    is_removed: bool,
}

#[cfg(test)]
impl TransactionBuilder {
    /// Set the account.
    pub fn account_id(mut self, account_id: AccountId) -> Self {
        self.account_id = account_id;
        self
    }

    /// Set the category.
    pub fn category_id(mut self, category_id: Option<CategoryId>) -> Self {
        self.category_id = category_id;
        self
    }

    /// Set the payee's name.
    pub fn payee(mut self, name: &str) -> Self {
        self.payee = Some(name.to_owned());
        self
    }

    /// Mark the transaction as a transfer.
    pub fn transfer(mut self, is_transfer: bool) -> Self {
        self.is_transfer = is_transfer;
        self
    }

    /// Mark the transaction as removed.
    pub fn removed(mut self, is_removed: bool) -> Self {
        self.is_removed = is_removed;
        self
    }

    /// Build the transaction with the given ID.
    pub fn finalise(self, id: TransactionId) -> Transaction {
        Transaction {
            id,
            account_id: self.account_id,
            amount: self.amount,
            date: self.date,
            category_id: self.category_id,
            payee: self.payee.map(|name| Payee { id: 0, name }),
            description: self.description,
            is_transfer: self.is_transfer,
            created_at: OffsetDateTime::UNIX_EPOCH,
            removed_at: self.is_removed.then_some(OffsetDateTime::UNIX_EPOCH),
        }
    }
}
