//! JSON handlers for the reports and the ledger.
//!
//! Every handler runs behind the API auth guard, which puts the logged in
//! user's [UserID](crate::UserID) into the request extensions.

use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::FromRef;
use rusqlite::Connection;

use crate::{AppState, Error};

mod budgets;
mod ledger;
mod reports;

pub use budgets::{
    BudgetPeriodsResponse, DrillDownQuery, create_budget_endpoint, get_budget_periods, list_budgets,
};
pub use ledger::{
    create_account_endpoint, create_demo_data_endpoint, create_transaction_endpoint,
    delete_transaction_endpoint, get_account_transactions, get_recent_transactions_endpoint,
    list_accounts, list_categories, list_payees, update_transaction_endpoint,
};
pub use reports::{
    get_account_balance_history, get_category_spend_report, get_income_expense_report,
    get_net_worth_report,
};

pub(crate) use budgets::budget_periods_for_user;
pub(crate) use reports::{category_spend_for_user, income_expense_for_user, net_worth_for_user};

/// The state needed by the JSON API handlers.
#[derive(Debug, Clone)]
pub struct ApiState {
    /// The database connection for reading and writing the ledger.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The canonical timezone used to work out today's date.
    pub local_timezone: String,
}

impl FromRef<AppState> for ApiState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Lock the shared connection, logging and converting a poisoned lock.
pub(crate) fn lock_connection(
    db_connection: &Mutex<Connection>,
) -> Result<MutexGuard<'_, Connection>, Error> {
    db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)
}
