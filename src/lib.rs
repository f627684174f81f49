//! A web app for tracking personal finances.
//!
//! Users record transactions against their bank accounts, group spending into
//! categories and budgets, and view charts of income, expenses and net worth.
//! The [report] module holds the aggregation engine behind those charts; the
//! rest of the crate stores the ledger in SQLite and serves it over HTTP.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use time::Date;
use tokio::signal;

mod api;
mod app_state;
mod auth;
mod budget_page;
mod dashboard;
mod database_id;
mod db;
mod endpoints;
mod html;
pub mod ledger;
mod logging;
pub mod money;
mod not_found;
pub mod report;
mod routing;
mod timezone;
mod user;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use auth::{PasswordHash, ValidatedPassword};
pub use database_id::{AccountId, BudgetId, CategoryId, DatabaseId, PayeeId, TransactionId};
pub use db::initialize as initialize_db;
pub use logging::logging_middleware;
pub use routing::build_router;
pub use timezone::get_local_offset;
pub use user::{User, UserID, create_user, get_user_by_username};

use crate::html::error_view;

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The username and password combination did not match a user.
    #[error("incorrect username or password")]
    InvalidCredentials,

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// A username that is already taken was used to create a user.
    #[error("the username is already taken")]
    DuplicateUsername,

    /// A cadence string was not one of the supported cadences.
    #[error("\"{0}\" is not a valid cadence, expected one of weekly, monthly, quarterly, biannually or annually")]
    InvalidCadence(String),

    /// Zero periods were requested.
    #[error("at least one period must be requested")]
    InvalidPeriodCount,

    /// A report was requested for a number of months outside the allowed range.
    #[error("{0} is not a valid number of months for this report")]
    InvalidMonthCount(u32),

    /// The periods of an income and expense series span more than twelve months.
    #[error("income and expense series cannot span more than twelve months")]
    SeriesWindowTooLong,

    /// A date is so close to the first or last representable date that the
    /// period around it cannot be represented.
    #[error("{0} is outside the range of dates that can be grouped into periods")]
    DateOutOfRange(Date),

    /// A budget was created with a start date in the future or before the
    /// earliest supported date.
    #[error("the budget start {0} must be between 1970-01-01 and today")]
    InvalidBudgetStart(Date),

    /// A budget was created with a cap that is not greater than zero.
    #[error("the budget cap must be greater than zero")]
    InvalidBudgetCap,

    /// An empty string was used to name a budget.
    #[error("budget name cannot be empty")]
    EmptyBudgetName,

    /// A budget was created without any categories.
    #[error("a budget needs at least one category")]
    EmptyBudgetCategories,

    /// A date in the future was used to create a transaction.
    ///
    /// Transactions record events that have already happened, therefore future
    /// dates are not allowed.
    #[error("{0} is a date in the future, which is not allowed")]
    FutureDate(Date),

    /// The category ID used to create a transaction or budget did not match a
    /// category the user can see.
    #[error("the category ID {0:?} does not refer to a valid category")]
    InvalidCategory(Option<crate::database_id::CategoryId>),

    /// A transfer was created without naming the account on the other side.
    #[error("a transfer needs a destination account")]
    MissingTransferAccount,

    /// A transaction amount or budget cap is too large to be tracked.
    #[error("amounts must be smaller than 1,000,000,000,000 in size")]
    AmountTooLarge,

    /// A transaction that is not a transfer was created without a payee.
    #[error("a transaction needs a payee unless it is a transfer")]
    MissingPayee,

    /// A page of results was requested with a page size of zero or too large.
    #[error("invalid page size")]
    InvalidPagination,

    /// The account does not belong to the user making the request.
    #[error("Unauthorized Access to Account")]
    UnauthorizedAccount,

    /// The budget does not belong to the user making the request.
    #[error("Unauthorized Access to Budget")]
    UnauthorizedBudget,

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// The specified account name already exists for the user.
    #[error("the account \"{0}\" already exists")]
    DuplicateAccountName(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// The session token could not be written to the auth cookie.
    #[error("could not create session: {0}")]
    SessionError(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl Error {
    /// The HTTP status code that best describes the error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidCadence(_)
            | Error::InvalidPeriodCount
            | Error::InvalidMonthCount(_)
            | Error::SeriesWindowTooLong
            | Error::DateOutOfRange(_)
            | Error::InvalidBudgetStart(_)
            | Error::AmountTooLarge
            | Error::InvalidBudgetCap
            | Error::EmptyBudgetName
            | Error::EmptyBudgetCategories
            | Error::FutureDate(_)
            | Error::InvalidCategory(_)
            | Error::MissingTransferAccount
            | Error::MissingPayee
            | Error::InvalidPagination
            | Error::TooWeak(_) => StatusCode::BAD_REQUEST,
            Error::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Error::UnauthorizedAccount | Error::UnauthorizedBudget => StatusCode::FORBIDDEN,
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::DuplicateUsername | Error::DuplicateAccountName(_) => StatusCode::CONFLICT,
            Error::HashingError(_)
            | Error::SqlError(_)
            | Error::InvalidTimezoneError(_)
            | Error::SessionError(_)
            | Error::DatabaseLockError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message that is safe to show to the client.
    ///
    /// Details of internal errors are logged and replaced with a generic message.
    fn client_message(&self) -> String {
        let status = self.status_code();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("An unexpected error occurred: {}", self);
            "An unexpected error occurred, check the server logs for more details.".to_owned()
        } else {
            self.to_string()
        }
    }

    /// Render the error as a full HTML page for page handlers.
    pub(crate) fn into_page_response(self) -> Response {
        let status = self.status_code();
        let message = self.client_message();

        let (header, description) = match status {
            StatusCode::NOT_FOUND => ("404", "Page not found"),
            StatusCode::FORBIDDEN => ("403", "Access denied"),
            StatusCode::INTERNAL_SERVER_ERROR => ("500", "Something went wrong"),
            _ => ("400", "Bad request"),
        };

        (
            status,
            error_view(description, header, description, &message),
        )
            .into_response()
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.client_message();

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod error_tests {
    use axum::{http::StatusCode, response::IntoResponse};
    use time::macros::date;

    use crate::Error;

    #[test]
    fn maps_errors_to_status_codes() {
        let cases = [
            (Error::InvalidCadence("daily".to_owned()), StatusCode::BAD_REQUEST),
            (Error::FutureDate(date!(2999 - 01 - 01)), StatusCode::BAD_REQUEST),
            (Error::DateOutOfRange(date!(9999 - 12 - 31)), StatusCode::BAD_REQUEST),
            (Error::InvalidBudgetStart(date!(1969 - 12 - 31)), StatusCode::BAD_REQUEST),
            (Error::AmountTooLarge, StatusCode::BAD_REQUEST),
            (Error::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (Error::UnauthorizedAccount, StatusCode::FORBIDDEN),
            (Error::NotFound, StatusCode::NOT_FOUND),
            (Error::DuplicateAccountName("Checking".to_owned()), StatusCode::CONFLICT),
            (Error::DatabaseLockError, StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, want) in cases {
            assert_eq!(error.status_code(), want, "wrong status for {error:?}");
        }
    }

    #[tokio::test]
    async fn api_error_body_is_json() {
        let response = Error::UnauthorizedAccount.into_response();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Unauthorized Access to Account");
    }

    #[tokio::test]
    async fn internal_error_details_are_hidden() {
        let response = Error::InvalidTimezoneError("Mars/Olympus".to_owned()).into_response();

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8_lossy(&body);
        assert!(!text.contains("Mars"));
    }

    #[test]
    fn no_rows_is_not_found() {
        let error: Error = rusqlite::Error::QueryReturnedNoRows.into();

        assert_eq!(error, Error::NotFound);
    }
}
