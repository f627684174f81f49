//! The page that shows a budget's spend in each of its periods.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, BudgetId, Error, UserID,
    api::{BudgetPeriodsResponse, DrillDownQuery, budget_periods_for_user, lock_connection},
    endpoints::{self, format_endpoint},
    html::{
        BUTTON_PRIMARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, LINK_STYLE,
        PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base,
        nav_bar,
    },
    money::format_currency,
    report::{BudgetPeriodSummary, DrillDown},
    timezone::local_today,
};

/// The state needed for displaying a budget.
#[derive(Debug, Clone)]
pub struct BudgetPageState {
    /// The database connection for reading budgets and transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for BudgetPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Display a budget with one row per period, most recent first.
///
/// The `payee` and `description` query parameters narrow the transactions
/// that count towards each period.
pub async fn get_budget_page(
    State(state): State<BudgetPageState>,
    Extension(user_id): Extension<UserID>,
    Path(budget_id): Path<BudgetId>,
    Query(query): Query<DrillDownQuery>,
) -> Response {
    let drill_down = query.drill_down();

    let report = local_today(&state.local_timezone).and_then(|today| {
        let connection = lock_connection(&state.db_connection)?;
        budget_periods_for_user(budget_id, user_id, drill_down.as_ref(), today, &connection)
    });

    match report {
        Ok(report) => budget_view(&report, drill_down.as_ref()).into_response(),
        Err(error) => {
            if !matches!(error, Error::NotFound | Error::UnauthorizedBudget) {
                tracing::error!("could not render budget {budget_id}: {error}");
            }
            error.into_page_response()
        }
    }
}

fn budget_view(report: &BudgetPeriodsResponse, drill_down: Option<&DrillDown>) -> Markup {
    let budget = &report.budget;
    let page_url = format_endpoint(endpoints::BUDGET_VIEW, budget.id);
    let (payee, description) = match drill_down {
        Some(DrillDown::Payee(payee)) => (payee.as_str(), ""),
        Some(DrillDown::Description(text)) => ("", text.as_str()),
        None => ("", ""),
    };

    let content = html!(
        (nav_bar(endpoints::DASHBOARD_VIEW))

        div class=(PAGE_CONTAINER_STYLE)
        {
            h2 class="text-xl font-bold" { (budget.name) }

            p class="mb-4"
            {
                "Cap of " (format_currency(budget.cap)) " per " (period_noun(budget.cadence.as_str()))
            }

            form method="get" action=(page_url) class="flex flex-row gap-4 items-end mb-4"
            {
                div
                {
                    label for="payee" class=(FORM_LABEL_STYLE) { "Payee" }
                    input type="text" name="payee" id="payee" class=(FORM_TEXT_INPUT_STYLE) value=(payee);
                }

                div
                {
                    label for="description" class=(FORM_LABEL_STYLE) { "Description" }
                    input
                        type="text"
                        name="description"
                        id="description"
                        class=(FORM_TEXT_INPUT_STYLE)
                        value=(description);
                }

                div class="w-32"
                {
                    button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Filter" }
                }

                @if drill_down.is_some() {
                    a href=(page_url) class=(LINK_STYLE) { "Clear" }
                }
            }

            div class="relative overflow-x-auto shadow-md rounded w-full"
            {
                table class="w-full text-sm text-left rtl:text-right text-gray-500 dark:text-gray-400"
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            th scope="col" class=(TABLE_CELL_STYLE) { "Period" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Spent" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Of cap" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Top payee" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Transactions" }
                        }
                    }

                    tbody
                    {
                        @for period in &report.periods {
                            (period_row(period, &page_url))
                        }
                    }
                }
            }
        }
    );

    base(&budget.name, &[], &content)
}

fn period_row(summary: &BudgetPeriodSummary, page_url: &str) -> Markup {
    let period = summary.period;

    html!(
        tr class=(TABLE_ROW_STYLE)
        {
            td class=(TABLE_CELL_STYLE)
            {
                (period.start) " to " (period.end)
            }

            td class=(TABLE_CELL_STYLE) { (format_currency(summary.total_spend)) }

            td class=(TABLE_CELL_STYLE)
            {
                @match summary.percent_of_cap {
                    Some(percent) => {
                        @if percent > 100 {
                            span class="text-red-500" { (percent) "%" }
                        } @else {
                            (percent) "%"
                        }
                    },
                    None => { "-" },
                }
            }

            td class=(TABLE_CELL_STYLE)
            {
                @match &summary.top_counterparty {
                    Some(counterparty) => {
                        a
                            href=(payee_drill_down_url(page_url, &counterparty.name))
                            class=(LINK_STYLE)
                        {
                            (counterparty.name)
                        }
                        " (" (format_currency(counterparty.amount)) ")"
                    },
                    None => { "-" },
                }
            }

            td class=(TABLE_CELL_STYLE) { (summary.transactions.len()) }
        }
    )
}

fn period_noun(cadence: &str) -> &'static str {
    match cadence {
        "weekly" => "week",
        "monthly" => "month",
        "quarterly" => "quarter",
        "biannually" => "half year",
        _ => "year",
    }
}

/// The budget page narrowed to one payee.
fn payee_drill_down_url(page_url: &str, payee: &str) -> String {
    match serde_urlencoded::to_string([("payee", payee)]) {
        Ok(query) => format!("{page_url}?{query}"),
        Err(error) => {
            tracing::error!("could not encode payee {payee:?}: {error}");
            page_url.to_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        Extension,
        extract::{FromRef, Path, Query, State},
        http::StatusCode,
    };
    use rust_decimal_macros::dec;
    use scraper::Selector;
    use time::Duration;

    use crate::{
        AppState, UserID,
        api::DrillDownQuery,
        ledger::{
            NewAccount, NewBudget, NewTransaction, create_account, create_budget,
            create_transaction, get_categories,
        },
        report::Cadence,
        test_utils::{assert_valid_html, get_test_state, insert_test_user, parse_html},
        timezone::local_today,
    };

    use super::{BudgetPageState, get_budget_page, payee_drill_down_url};

    fn fixture() -> (AppState, UserID, i64) {
        let state = get_test_state();
        let user_id = insert_test_user(&state, "alice");
        let today = local_today(&state.local_timezone).unwrap();

        let budget_id = {
            let connection = state.db_connection.lock().unwrap();
            let account = create_account(
                user_id,
                NewAccount {
                    name: "Checking".to_owned(),
                    kind: "checking".to_owned(),
                    initial_balance: dec!(0),
                },
                &connection,
            )
            .unwrap();
            let groceries = get_categories(user_id, &connection)
                .unwrap()
                .into_iter()
                .find(|category| category.name == "Groceries")
                .unwrap()
                .id;

            for (amount, payee, description) in [
                (dec!(-120), "Supermarket", "Weekly shop"),
                (dec!(-30), "Corner Store", "Milk"),
            ] {
                create_transaction(
                    NewTransaction {
                        account_id: account.id,
                        amount,
                        date: today,
                        category_id: Some(groceries),
                        category_name: None,
                        payee: Some(payee.to_owned()),
                        description: description.to_owned(),
                        is_transfer: false,
                        transfer_account_id: None,
                    },
                    user_id,
                    today,
                    &connection,
                )
                .unwrap();
            }

            create_budget(
                user_id,
                NewBudget {
                    name: "Food".to_owned(),
                    cadence: Cadence::Monthly,
                    category_ids: vec![groceries],
                    cap: dec!(100),
                    start: today - Duration::days(35),
                },
                today,
                &connection,
            )
            .unwrap()
            .id
        };

        (state, user_id, budget_id)
    }

    async fn render(
        state: &AppState,
        user_id: UserID,
        budget_id: i64,
        query: DrillDownQuery,
    ) -> (StatusCode, String) {
        let response = get_budget_page(
            State(BudgetPageState::from_ref(state)),
            Extension(user_id),
            Path(budget_id),
            Query(query),
        )
        .await;

        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        (status, String::from_utf8_lossy(&body).to_string())
    }

    #[tokio::test]
    async fn budget_page_has_a_row_per_period() {
        let (state, user_id, budget_id) = fixture();

        let (status, text) = render(&state, user_id, budget_id, DrillDownQuery::default()).await;

        assert_eq!(status, StatusCode::OK);
        let html = parse_html(&text);
        assert_valid_html(&html);

        let rows: Vec<_> = html
            .select(&Selector::parse("tbody tr").unwrap())
            .collect();
        assert!(rows.len() >= 2);

        let cells: Vec<String> = rows[0]
            .select(&Selector::parse("td").unwrap())
            .map(|cell| cell.text().collect::<String>().trim().to_owned())
            .collect();
        assert_eq!(cells[1], "$150.00");
        assert_eq!(cells[2], "150%");
        assert!(cells[3].starts_with("Supermarket"));
        assert_eq!(cells[4], "2");
    }

    #[tokio::test]
    async fn budget_page_drill_down_by_payee() {
        let (state, user_id, budget_id) = fixture();

        let (_, text) = render(
            &state,
            user_id,
            budget_id,
            DrillDownQuery {
                payee: Some("Corner Store".to_owned()),
                description: None,
            },
        )
        .await;

        let html = parse_html(&text);
        let first_row = html
            .select(&Selector::parse("tbody tr").unwrap())
            .next()
            .unwrap();
        let spent = first_row
            .select(&Selector::parse("td").unwrap())
            .nth(1)
            .unwrap()
            .text()
            .collect::<String>();
        assert_eq!(spent.trim(), "$30.00");

        let payee_input = html
            .select(&Selector::parse("input#payee").unwrap())
            .next()
            .unwrap();
        assert_eq!(payee_input.value().attr("value"), Some("Corner Store"));
    }

    #[tokio::test]
    async fn other_users_budget_is_forbidden() {
        let (state, _, budget_id) = fixture();
        let bob = insert_test_user(&state, "bob");

        let (status, text) = render(&state, bob, budget_id, DrillDownQuery::default()).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_valid_html(&parse_html(&text));
    }

    #[tokio::test]
    async fn missing_budget_is_not_found() {
        let (state, user_id, _) = fixture();

        let (status, _) = render(&state, user_id, 999, DrillDownQuery::default()).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn drill_down_url_encodes_payee() {
        assert_eq!(
            payee_drill_down_url("/budgets/1", "Corner Store & Co"),
            "/budgets/1?payee=Corner+Store+%26+Co"
        );
    }
}
