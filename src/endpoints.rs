//! The endpoint URIs.
//!
//! For endpoints that take a parameter, e.g., '/budgets/{budget_id}', use [format_endpoint].

/// The root route which redirects to the dashboard.
pub const ROOT: &str = "/";
/// The landing page for logged in users.
pub const DASHBOARD_VIEW: &str = "/dashboard";
/// The page showing a budget period by period.
pub const BUDGET_VIEW: &str = "/budgets/{budget_id}";
/// The route for getting the log in page.
pub const LOG_IN_VIEW: &str = "/log_in";
/// The route for static files.
pub const STATIC: &str = "/static";

/// The route for logging in a user.
pub const LOG_IN_API: &str = "/api/log_in";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/api/log_out";

/// Monthly income and expense totals.
pub const INCOME_EXPENSE_REPORT: &str = "/api/reports/income_expense";
/// Net worth across all open accounts over time.
pub const NET_WORTH_REPORT: &str = "/api/reports/net_worth";
/// Spending per category for one month.
pub const CATEGORY_SPEND_REPORT: &str = "/api/reports/category_spend";

/// List or create budgets.
pub const BUDGETS_API: &str = "/api/budgets";
/// A budget's spend in each of its periods.
pub const BUDGET_PERIODS: &str = "/api/budgets/{budget_id}/periods";

/// List or create accounts.
pub const ACCOUNTS_API: &str = "/api/accounts";
/// One account's balance over time.
pub const ACCOUNT_BALANCE_HISTORY: &str = "/api/accounts/{account_id}/balance_history";
/// One page of an account's transactions.
pub const ACCOUNT_TRANSACTIONS: &str = "/api/accounts/{account_id}/transactions";

/// Create transactions.
pub const TRANSACTIONS_API: &str = "/api/transactions";
/// The most recent transactions across all accounts.
pub const RECENT_TRANSACTIONS: &str = "/api/transactions/recent";
/// Edit or remove a single transaction.
pub const TRANSACTION: &str = "/api/transactions/{transaction_id}";

/// Categories visible to the user.
pub const CATEGORIES_API: &str = "/api/categories";
/// The user's payees.
pub const PAYEES_API: &str = "/api/payees";
/// Fill the user's ledger with sample data.
pub const DEMO_DATA: &str = "/api/demo_data";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/budgets/{budget_id}', '{budget_id}' is the parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_owned();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|end| param_start + end + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
