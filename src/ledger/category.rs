//! Categories group transactions for reports and budgets.
//!
//! Global categories have no owner and are visible to everyone. Users may add
//! their own categories, which only they can see.

use std::str::FromStr;

use rusqlite::{
    Connection, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};

use crate::{Error, database_id::CategoryId, user::UserID};

/// Whether a category is meant for money coming in, going out, or moving
/// between accounts.
///
/// Reports go by the sign of each amount, so the kind is only a hint for
/// people reading the category list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
    /// Income.
    Credit,
    /// Spending.
    Debit,
    /// Money moved between the user's own accounts.
    Transfer,
}

impl CategoryKind {
    /// The lowercase name stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryKind::Credit => "credit",
            CategoryKind::Debit => "debit",
            CategoryKind::Transfer => "transfer",
        }
    }
}

impl FromStr for CategoryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credit" => Ok(CategoryKind::Credit),
            "debit" => Ok(CategoryKind::Debit),
            "transfer" => Ok(CategoryKind::Transfer),
            other => Err(format!("unknown category kind \"{other}\"")),
        }
    }
}

impl ToSql for CategoryKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for CategoryKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error: String| FromSqlError::Other(error.into()))
    }
}

/// A named group of transactions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Category {
    /// The ID of the category.
    pub id: CategoryId,
    /// The display name.
    pub name: String,
    /// Whether this category is for income, spending or transfers.
    pub kind: CategoryKind,
    /// The user that added the category, `None` for global categories.
    pub owner_id: Option<UserID>,
}

/// The categories available to every user.
const GLOBAL_CATEGORIES: [(&str, CategoryKind); 11] = [
    ("Salary", CategoryKind::Credit),
    ("Interest", CategoryKind::Credit),
    ("Groceries", CategoryKind::Debit),
    ("Rent", CategoryKind::Debit),
    ("Utilities", CategoryKind::Debit),
    ("Entertainment", CategoryKind::Debit),
    ("Dining", CategoryKind::Debit),
    ("Transport", CategoryKind::Debit),
    ("Other income", CategoryKind::Credit),
    ("Other expense", CategoryKind::Debit),
    ("Transfer", CategoryKind::Transfer),
];

/// Create the category table.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            kind TEXT NOT NULL,
            owner_id INTEGER,
            removed_at TEXT,
            FOREIGN KEY(owner_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_category_owner ON category(owner_id);",
    )?;

    Ok(())
}

/// Insert the global categories if they are not there already.
pub fn seed_global_categories(connection: &Connection) -> Result<(), rusqlite::Error> {
    let mut statement = connection.prepare(
        "INSERT INTO category (name, kind, owner_id)
        SELECT ?1, ?2, NULL
        WHERE NOT EXISTS (SELECT 1 FROM category WHERE name = ?1 AND owner_id IS NULL)",
    )?;

    for (name, kind) in GLOBAL_CATEGORIES {
        statement.execute((name, kind))?;
    }

    Ok(())
}

/// Get the global categories and the ones `user_id` added, ordered by name.
///
/// Removed categories are left out.
pub fn get_categories(user_id: UserID, connection: &Connection) -> Result<Vec<Category>, Error> {
    connection
        .prepare(
            "SELECT id, name, kind, owner_id FROM category
            WHERE (owner_id IS NULL OR owner_id = :user_id) AND removed_at IS NULL
            ORDER BY name ASC, id ASC",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_category_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Get a category that `user_id` is allowed to use.
///
/// # Errors
/// Returns [Error::InvalidCategory] if the category does not exist, was
/// removed, or was added by another user.
pub fn get_category(
    category_id: CategoryId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .prepare(
            "SELECT id, name, kind, owner_id FROM category
            WHERE id = :id AND (owner_id IS NULL OR owner_id = :user_id) AND removed_at IS NULL",
        )?
        .query_row(
            &[(":id", &category_id), (":user_id", &user_id.as_i64())],
            map_category_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::InvalidCategory(Some(category_id)),
            error => error.into(),
        })
}

/// Find the category called `name` that `user_id` can see, or add it as one
/// of their own categories.
pub fn find_or_create_category(
    name: &str,
    kind: CategoryKind,
    user_id: UserID,
    connection: &Connection,
) -> Result<Category, Error> {
    let existing = connection
        .prepare(
            "SELECT id, name, kind, owner_id FROM category
            WHERE name = :name AND (owner_id IS NULL OR owner_id = :user_id) AND removed_at IS NULL
            ORDER BY owner_id IS NULL DESC
            LIMIT 1",
        )?
        .query_row(
            rusqlite::named_params! { ":name": name, ":user_id": user_id.as_i64() },
            map_category_row,
        );

    match existing {
        Ok(category) => return Ok(category),
        Err(rusqlite::Error::QueryReturnedNoRows) => {}
        Err(error) => return Err(error.into()),
    }

    connection.execute(
        "INSERT INTO category (name, kind, owner_id) VALUES (?1, ?2, ?3)",
        (name, kind, user_id.as_i64()),
    )?;
    tracing::debug!("Created category \"{name}\" for user {user_id}");

    Ok(Category {
        id: connection.last_insert_rowid(),
        name: name.to_owned(),
        kind,
        owner_id: Some(user_id),
    })
}

fn map_category_row(row: &Row) -> Result<Category, rusqlite::Error> {
    let owner_id: Option<i64> = row.get(3)?;

    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        kind: row.get(2)?,
        owner_id: owner_id.map(UserID::new),
    })
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use crate::{
        Error, PasswordHash,
        db::initialize,
        user::{UserID, create_user},
    };

    use super::{CategoryKind, find_or_create_category, get_categories, get_category};

    fn get_test_connection() -> (Connection, UserID, UserID) {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let alice = create_user("alice", PasswordHash::new_unchecked("a"), &connection).unwrap();
        let bob = create_user("bob", PasswordHash::new_unchecked("b"), &connection).unwrap();

        (connection, alice.id, bob.id)
    }

    #[test]
    fn global_categories_are_sorted_by_name() {
        let (connection, alice, _) = get_test_connection();

        let names: Vec<String> = get_categories(alice, &connection)
            .unwrap()
            .into_iter()
            .map(|category| category.name)
            .collect();

        let mut want = names.clone();
        want.sort();
        assert_eq!(names, want);
        assert_eq!(names.len(), 11);
        assert!(names.contains(&"Groceries".to_owned()));
    }

    #[test]
    fn user_categories_are_private() {
        let (connection, alice, bob) = get_test_connection();

        let pets =
            find_or_create_category("Pets", CategoryKind::Debit, alice, &connection).unwrap();

        assert_eq!(pets.owner_id, Some(alice));
        assert_eq!(get_categories(alice, &connection).unwrap().len(), 12);
        assert_eq!(get_categories(bob, &connection).unwrap().len(), 11);
        assert_eq!(
            get_category(pets.id, bob, &connection),
            Err(Error::InvalidCategory(Some(pets.id)))
        );
        assert_eq!(get_category(pets.id, alice, &connection), Ok(pets));
    }

    #[test]
    fn find_or_create_reuses_global_category() {
        let (connection, alice, _) = get_test_connection();

        let groceries =
            find_or_create_category("Groceries", CategoryKind::Debit, alice, &connection).unwrap();

        assert_eq!(groceries.owner_id, None);
        assert_eq!(get_categories(alice, &connection).unwrap().len(), 11);
    }

    #[test]
    fn find_or_create_reuses_own_category() {
        let (connection, alice, _) = get_test_connection();

        let first =
            find_or_create_category("Bonus", CategoryKind::Credit, alice, &connection).unwrap();
        let second =
            find_or_create_category("Bonus", CategoryKind::Credit, alice, &connection).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn unknown_category_is_invalid() {
        let (connection, alice, _) = get_test_connection();

        assert_eq!(
            get_category(999, alice, &connection),
            Err(Error::InvalidCategory(Some(999)))
        );
    }
}
