//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router, middleware,
    response::Redirect,
    routing::{get, post, put},
};
use tower_http::services::ServeDir;

use crate::{
    AppState,
    api::{
        create_account_endpoint, create_budget_endpoint, create_demo_data_endpoint,
        create_transaction_endpoint, delete_transaction_endpoint, get_account_balance_history,
        get_account_transactions, get_budget_periods, get_category_spend_report,
        get_income_expense_report, get_net_worth_report, get_recent_transactions_endpoint,
        list_accounts, list_budgets, list_categories, list_payees, update_transaction_endpoint,
    },
    auth::{auth_guard, auth_guard_api, get_log_in_page, get_log_out, post_log_in},
    budget_page::get_budget_page,
    dashboard::get_dashboard_page,
    endpoints,
    not_found::get_404_not_found,
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::LOG_IN_VIEW, get(get_log_in_page))
        .route(endpoints::LOG_IN_API, post(post_log_in))
        .route(endpoints::LOG_OUT, get(get_log_out));

    let protected_pages = Router::new()
        .route(endpoints::ROOT, get(get_index_page))
        .route(endpoints::DASHBOARD_VIEW, get(get_dashboard_page))
        .route(endpoints::BUDGET_VIEW, get(get_budget_page))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    // The API answers with a JSON error instead of redirecting to the log-in page.
    let protected_api =
        api_routes().route_layer(middleware::from_fn_with_state(state.clone(), auth_guard_api));

    protected_pages
        .merge(protected_api)
        .merge(unprotected_routes)
        .nest_service(endpoints::STATIC, ServeDir::new("static/"))
        .fallback(get_404_not_found)
        .with_state(state)
}

/// The JSON API routes without any auth layer.
///
/// Every handler expects an `Extension<UserID>` on the request.
pub(crate) fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            endpoints::INCOME_EXPENSE_REPORT,
            get(get_income_expense_report),
        )
        .route(endpoints::NET_WORTH_REPORT, get(get_net_worth_report))
        .route(
            endpoints::CATEGORY_SPEND_REPORT,
            get(get_category_spend_report),
        )
        .route(
            endpoints::BUDGETS_API,
            get(list_budgets).post(create_budget_endpoint),
        )
        .route(endpoints::BUDGET_PERIODS, get(get_budget_periods))
        .route(
            endpoints::ACCOUNTS_API,
            get(list_accounts).post(create_account_endpoint),
        )
        .route(
            endpoints::ACCOUNT_BALANCE_HISTORY,
            get(get_account_balance_history),
        )
        .route(
            endpoints::ACCOUNT_TRANSACTIONS,
            get(get_account_transactions),
        )
        .route(
            endpoints::TRANSACTIONS_API,
            post(create_transaction_endpoint),
        )
        .route(
            endpoints::RECENT_TRANSACTIONS,
            get(get_recent_transactions_endpoint),
        )
        .route(
            endpoints::TRANSACTION,
            put(update_transaction_endpoint).delete(delete_transaction_endpoint),
        )
        .route(endpoints::CATEGORIES_API, get(list_categories))
        .route(endpoints::PAYEES_API, get(list_payees))
        .route(endpoints::DEMO_DATA, post(create_demo_data_endpoint))
}

/// The root path '/' redirects to the dashboard page.
async fn get_index_page() -> Redirect {
    Redirect::to(endpoints::DASHBOARD_VIEW)
}
