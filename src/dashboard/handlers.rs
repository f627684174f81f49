//! The dashboard page.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error, UserID,
    api::{
        category_spend_for_user, income_expense_for_user, lock_connection, net_worth_for_user,
    },
    dashboard::charts::{
        DashboardChart, category_spend_chart, charts_script, charts_view, income_expense_chart,
        net_worth_chart,
    },
    endpoints::{self, format_endpoint},
    html::{
        BUTTON_PRIMARY_STYLE, HeadElement, PAGE_CONTAINER_STYLE, base, link, loading_spinner,
        nav_bar,
    },
    ledger::{BudgetSummary, get_accounts, get_budgets},
    money::format_currency,
    timezone::local_today,
};

/// How many months the dashboard charts cover.
const DASHBOARD_MONTHS: u32 = 6;

/// The state needed for displaying the dashboard page.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// The database connection for reading the ledger.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Display a page with charts of the user's finances and a list of their budgets.
pub async fn get_dashboard_page(
    State(state): State<DashboardState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    match render_dashboard(&state, user_id) {
        Ok(page) => page.into_response(),
        Err(error) => {
            tracing::error!("could not render dashboard for user {user_id}: {error}");
            error.into_page_response()
        }
    }
}

fn render_dashboard(state: &DashboardState, user_id: UserID) -> Result<Markup, Error> {
    let today = local_today(&state.local_timezone)?;
    let connection = lock_connection(&state.db_connection)?;

    let accounts = get_accounts(user_id, &connection)?;
    if accounts.is_empty() {
        return Ok(dashboard_no_data_view());
    }

    let income_expense = income_expense_for_user(user_id, DASHBOARD_MONTHS, today, &connection)?;
    let net_worth = net_worth_for_user(user_id, DASHBOARD_MONTHS, today, &connection)?;
    let category_spend = category_spend_for_user(user_id, today, &connection)?;
    let budgets = get_budgets(user_id, &connection)?;

    let total = accounts
        .iter()
        .filter(|account| account.closed_at.is_none())
        .map(|account| account.current_balance)
        .sum();

    let charts = [
        DashboardChart {
            id: "income-expense-chart",
            options: income_expense_chart(&income_expense).to_string(),
        },
        DashboardChart {
            id: "net-worth-chart",
            options: net_worth_chart(&net_worth).to_string(),
        },
        DashboardChart {
            id: "category-spend-chart",
            options: category_spend_chart(&category_spend).to_string(),
        },
    ];

    Ok(dashboard_view(&charts, &budgets, &format_currency(total)))
}

fn dashboard_no_data_view() -> Markup {
    let content = html!(
        (nav_bar(endpoints::DASHBOARD_VIEW))

        div class=(PAGE_CONTAINER_STYLE)
        {
            h2 class="text-xl font-bold" { "Nothing here yet..." }

            p class="mb-4"
            {
                "Charts will show up here once you add an account and some transactions."
            }

            div class="w-64"
            {
                button
                    hx-post=(endpoints::DEMO_DATA)
                    hx-swap="none"
                    hx-indicator="#indicator"
                    hx-on--after-request="window.location.reload()"
                    class=(BUTTON_PRIMARY_STYLE)
                {
                    span class="inline htmx-indicator" id="indicator" { (loading_spinner()) }
                    "Add demo data"
                }
            }
        }
    );

    base("Dashboard", &[], &content)
}

fn dashboard_view(charts: &[DashboardChart], budgets: &[BudgetSummary], total: &str) -> Markup {
    let content = html!(
        (nav_bar(endpoints::DASHBOARD_VIEW))

        div
            id="dashboard-content"
            class="flex flex-col items-center px-2 lg:px-6 lg:py-8 mx-auto
                max-w-screen-xl text-gray-900 dark:text-white"
        {
            p class="text-2xl font-bold mb-4"
            {
                "Net worth: " span id="net-worth" { (total) }
            }

            (charts_view(charts))

            section id="budgets" class="w-full mb-8"
            {
                h3 class="text-xl font-semibold mb-4" { "Budgets" }

                @if budgets.is_empty() {
                    p { "You have not set up any budgets yet." }
                } @else {
                    ul class="list-disc list-inside"
                    {
                        @for budget in budgets {
                            li { (link(&format_endpoint(endpoints::BUDGET_VIEW, budget.id), &budget.name)) }
                        }
                    }
                }
            }
        }
    );

    let scripts = [
        HeadElement::ScriptLink("/static/echarts.6.0.0.min.js".to_owned()),
        charts_script(charts),
    ];

    base("Dashboard", &scripts, &content)
}
