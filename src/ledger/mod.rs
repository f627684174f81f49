//! The SQLite store for accounts, categories, payees, transactions and budgets.
//!
//! Every query that reads user data takes the requesting [UserID](crate::UserID)
//! and checks ownership before returning anything.

mod account;
mod budget;
mod category;
mod demo;
mod payee;
mod transaction;

pub use account::{
    Account, NewAccount, create_account, create_account_table, get_account, get_account_balance,
    get_accounts, get_open_account_ids, get_total_balance,
};
pub use budget::{
    Budget, BudgetSummary, EARLIEST_BUDGET_START, NewBudget, create_budget, create_budget_tables,
    get_budget, get_budgets,
};
pub use category::{
    Category, CategoryKind, create_category_table, find_or_create_category, get_categories,
    get_category, seed_global_categories,
};
pub use demo::{DemoData, create_demo_data};
pub use payee::{Payee, create_payee_table, find_or_create_payee, get_payees};
pub use transaction::{
    MAX_PAGE_SIZE, NewTransaction, RECENT_TRANSACTION_COUNT, Transaction, TransactionFilter,
    TransactionListing, TransactionPage, TransactionUpdate, create_transaction,
    create_transaction_table, find_transactions, get_account_transactions_page,
    get_recent_transactions, get_transaction, remove_transaction, update_transaction,
};
