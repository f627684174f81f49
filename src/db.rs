//! Creates the application's database schema.

use rusqlite::{Connection, Transaction as SqlTransaction};

use crate::{
    Error,
    ledger::{
        create_account_table, create_budget_tables, create_category_table, create_payee_table,
        create_transaction_table, seed_global_categories,
    },
    user::create_user_table,
};

/// Create all the tables for the domain models and seed the global categories.
///
/// Safe to call on a database that has already been initialized.
///
/// # Errors
/// Returns an [Error::SqlError] if any of the tables could not be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    // Has no effect inside a transaction, so must come first.
    connection.execute("PRAGMA foreign_keys = ON", ())?;

    let transaction =
        SqlTransaction::new_unchecked(connection, rusqlite::TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_account_table(&transaction)?;
    create_category_table(&transaction)?;
    create_payee_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_budget_tables(&transaction)?;
    seed_global_categories(&transaction)?;

    transaction.commit()?;

    Ok(())
}
