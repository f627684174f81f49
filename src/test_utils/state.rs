use rusqlite::Connection;

use crate::{AppState, PasswordHash, UserID, create_user};

pub(crate) fn get_test_state() -> AppState {
    let connection = Connection::open_in_memory().expect("Could not open in-memory database");

    AppState::new(connection, "foobar", "Etc/UTC").expect("Could not create app state")
}

pub(crate) fn insert_test_user(state: &AppState, username: &str) -> UserID {
    let connection = state.db_connection.lock().unwrap();

    create_user(username, PasswordHash::new_unchecked("hunter2"), &connection)
        .expect("Could not create test user")
        .id
}
