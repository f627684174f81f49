//! Payees are the people and businesses on the other side of a transaction.

use rusqlite::{Connection, Row};
use serde::Serialize;

use crate::{Error, database_id::PayeeId, user::UserID};

/// The counterparty of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Payee {
    /// The ID of the payee.
    pub id: PayeeId,
    /// The payee's name, unique per user.
    pub name: String,
}

/// Create the payee table.
pub fn create_payee_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS payee (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                UNIQUE(user_id, name),
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

/// Get the payee called `name`, adding it for `user_id` if it does not exist yet.
pub fn find_or_create_payee(
    name: &str,
    user_id: UserID,
    connection: &Connection,
) -> Result<Payee, Error> {
    connection.execute(
        "INSERT INTO payee (user_id, name) VALUES (?1, ?2) ON CONFLICT(user_id, name) DO NOTHING",
        (user_id.as_i64(), name),
    )?;

    connection
        .prepare("SELECT id, name FROM payee WHERE user_id = :user_id AND name = :name")?
        .query_row(
            rusqlite::named_params! { ":user_id": user_id.as_i64(), ":name": name },
            map_payee_row,
        )
        .map_err(|error| error.into())
}

/// Get all of a user's payees ordered by name.
pub fn get_payees(user_id: UserID, connection: &Connection) -> Result<Vec<Payee>, Error> {
    connection
        .prepare("SELECT id, name FROM payee WHERE user_id = :user_id ORDER BY name ASC")?
        .query_map(&[(":user_id", &user_id.as_i64())], map_payee_row)?
        .map(|maybe_payee| maybe_payee.map_err(|error| error.into()))
        .collect()
}

fn map_payee_row(row: &Row) -> Result<Payee, rusqlite::Error> {
    Ok(Payee {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}
