//! Budget endpoints.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use rust_decimal::Decimal;
use time::Date;

use crate::{
    BudgetId, CategoryId, Error, UserID,
    api::{ApiState, lock_connection},
    ledger::{
        Budget, BudgetSummary, NewBudget, TransactionFilter, create_budget, find_transactions,
        get_budget, get_budgets,
    },
    report::{BudgetPeriodSummary, Cadence, DrillDown, evaluate_budget, periods_since},
    timezone::local_today,
};

/// Optional filters for narrowing a budget's transactions.
#[derive(Debug, Default, Deserialize)]
pub struct DrillDownQuery {
    /// Only include transactions with this payee.
    pub payee: Option<String>,
    /// Only include transactions whose description contains this text.
    pub description: Option<String>,
}

impl DrillDownQuery {
    pub(crate) fn drill_down(&self) -> Option<DrillDown> {
        DrillDown::from_query(self.payee.as_deref(), self.description.as_deref())
    }
}

/// The JSON body for creating a budget.
///
/// The cadence is kept as text so that an unknown cadence is reported as
/// [Error::InvalidCadence] rather than a generic body parsing error.
#[derive(Debug, Deserialize)]
pub struct BudgetRequest {
    name: String,
    cadence: String,
    category_ids: Vec<CategoryId>,
    cap: Decimal,
    start: Date,
}

impl TryFrom<BudgetRequest> for NewBudget {
    type Error = Error;

    fn try_from(request: BudgetRequest) -> Result<Self, Self::Error> {
        Ok(NewBudget {
            name: request.name,
            cadence: request.cadence.parse::<Cadence>()?,
            category_ids: request.category_ids,
            cap: request.cap,
            start: request.start,
        })
    }
}

/// A budget and how it fared in each of its periods, most recent first.
#[derive(Debug, Serialize)]
pub struct BudgetPeriodsResponse {
    /// The budget.
    pub budget: Budget,
    /// One summary per period from the current period back to the first.
    pub periods: Vec<BudgetPeriodSummary>,
}

/// Evaluate a budget over every period from its anchor up to `today`.
pub(crate) fn budget_periods_for_user(
    budget_id: BudgetId,
    user_id: UserID,
    drill_down: Option<&DrillDown>,
    today: Date,
    connection: &Connection,
) -> Result<BudgetPeriodsResponse, Error> {
    let budget = get_budget(budget_id, user_id, connection)?;
    let periods = periods_since(budget.anchor_start, today, budget.cadence)?;

    let transactions = find_transactions(
        user_id,
        &TransactionFilter {
            account_ids: None,
            start: periods.last().map(|period| period.start),
            end: Some(today),
        },
        connection,
    )?;

    let periods = evaluate_budget(&budget, &periods, &transactions, drill_down);

    Ok(BudgetPeriodsResponse { budget, periods })
}

/// List the user's budgets.
pub async fn list_budgets(
    State(state): State<ApiState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<Vec<BudgetSummary>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_budgets(user_id, &connection).map(Json)
}

/// Create a budget.
pub async fn create_budget_endpoint(
    State(state): State<ApiState>,
    Extension(user_id): Extension<UserID>,
    Json(request): Json<BudgetRequest>,
) -> Result<(StatusCode, Json<Budget>), Error> {
    let new_budget = NewBudget::try_from(request)?;
    let today = local_today(&state.local_timezone)?;
    let connection = lock_connection(&state.db_connection)?;

    let budget = create_budget(user_id, new_budget, today, &connection)?;
    tracing::info!("User {user_id} created budget {}", budget.id);

    Ok((StatusCode::CREATED, Json(budget)))
}

/// A budget's spend in each period, optionally narrowed to a payee or description.
pub async fn get_budget_periods(
    State(state): State<ApiState>,
    Extension(user_id): Extension<UserID>,
    Path(budget_id): Path<BudgetId>,
    Query(query): Query<DrillDownQuery>,
) -> Result<Json<BudgetPeriodsResponse>, Error> {
    let today = local_today(&state.local_timezone)?;
    let connection = lock_connection(&state.db_connection)?;

    budget_periods_for_user(
        budget_id,
        user_id,
        query.drill_down().as_ref(),
        today,
        &connection,
    )
    .map(Json)
}

#[cfg(test)]
mod tests {
    use axum::{Extension, http::StatusCode};
    use axum_test::TestServer;
    use rust_decimal_macros::dec;
    use serde_json::{Value, json};
    use time::Duration;

    use crate::{
        AppState, endpoints,
        ledger::{NewAccount, NewTransaction, create_account, create_transaction, get_categories},
        routing::api_routes,
        test_utils::{get_test_state, insert_test_user},
        timezone::local_today,
    };

    struct Fixture {
        server: TestServer,
        state: AppState,
        groceries: i64,
    }

    fn fixture() -> Fixture {
        let state = get_test_state();
        let user_id = insert_test_user(&state, "alice");
        let today = local_today(&state.local_timezone).unwrap();

        let groceries = {
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
                (dec!(-300), "Supermarket", "Weekly shop"),
                (dec!(-150), "Market", "Fruit and veg"),
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

            groceries
        };

        let app = api_routes()
            .layer(Extension(user_id))
            .with_state(state.clone());

        Fixture {
            server: TestServer::new(app),
            state,
            groceries,
        }
    }

    async fn create_food_budget(f: &Fixture) -> i64 {
        let today = local_today(&f.state.local_timezone).unwrap();
        let response = f
            .server
            .post(endpoints::BUDGETS_API)
            .json(&json!({
                "name": "Food",
                "cadence": "monthly",
                "category_ids": [f.groceries],
                "cap": 1000,
                "start": today - Duration::days(40),
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        response.json::<Value>()["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn create_and_list_budgets() {
        let f = fixture();
        let id = create_food_budget(&f).await;

        let response = f.server.get(endpoints::BUDGETS_API).await;

        response.assert_status_ok();
        assert_eq!(response.json::<Value>(), json!([{ "id": id, "name": "Food" }]));
    }

    #[tokio::test]
    async fn create_budget_with_invalid_cadence_fails() {
        let f = fixture();

        let response = f
            .server
            .post(endpoints::BUDGETS_API)
            .json(&json!({
                "name": "Food",
                "cadence": "fortnightly",
                "category_ids": [f.groceries],
                "cap": 1000,
                "start": "2024-01-01",
            }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let message = response.json::<Value>()["error"].as_str().unwrap().to_owned();
        assert!(message.contains("fortnightly"), "got {message}");
    }

    #[tokio::test]
    async fn create_budget_starting_at_last_date_fails_without_poisoning_lock() {
        let f = fixture();

        let response = f
            .server
            .post(endpoints::BUDGETS_API)
            .json(&json!({
                "name": "Food",
                "cadence": "weekly",
                "category_ids": [f.groceries],
                "cap": 1000,
                "start": "9999-12-31",
            }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(
            response.json::<Value>()["error"],
            "the budget start 9999-12-31 must be between 1970-01-01 and today"
        );
        assert!(!f.state.db_connection.is_poisoned());
        f.server
            .get(endpoints::BUDGETS_API)
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn create_budget_before_earliest_start_fails() {
        let f = fixture();

        let response = f
            .server
            .post(endpoints::BUDGETS_API)
            .json(&json!({
                "name": "Food",
                "cadence": "weekly",
                "category_ids": [f.groceries],
                "cap": 1000,
                "start": "0001-01-01",
            }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_budget_with_zero_cap_fails() {
        let f = fixture();

        let response = f
            .server
            .post(endpoints::BUDGETS_API)
            .json(&json!({
                "name": "Food",
                "cadence": "monthly",
                "category_ids": [f.groceries],
                "cap": 0,
                "start": "2024-01-01",
            }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(
            response.json::<Value>()["error"],
            "the budget cap must be greater than zero"
        );
    }

    #[tokio::test]
    async fn budget_periods_report_spend() {
        let f = fixture();
        let id = create_food_budget(&f).await;

        let response = f
            .server
            .get(&endpoints::format_endpoint(endpoints::BUDGET_PERIODS, id))
            .await;

        response.assert_status_ok();
        let json: Value = response.json();
        let periods = json["periods"].as_array().unwrap();
        assert!(periods.len() >= 2);
        let current = &periods[0];
        assert_eq!(current["total_spend"], 450.0);
        assert_eq!(current["percent_of_cap"], 45);
        assert_eq!(current["top_counterparty"]["name"], "Supermarket");
        assert_eq!(current["transactions"].as_array().unwrap().len(), 2);
        assert_eq!(json["budget"]["name"], "Food");
    }

    #[tokio::test]
    async fn budget_periods_drill_down() {
        let f = fixture();
        let id = create_food_budget(&f).await;

        let response = f
            .server
            .get(&endpoints::format_endpoint(endpoints::BUDGET_PERIODS, id))
            .add_query_param("description", "FRUIT")
            .await;

        let json: Value = response.json();
        let current = &json["periods"][0];
        assert_eq!(current["total_spend"], 150.0);
        assert_eq!(current["top_counterparty"]["name"], "Market");
    }

    #[tokio::test]
    async fn budget_of_another_user_is_forbidden() {
        let f = fixture();
        let id = create_food_budget(&f).await;
        let bob = insert_test_user(&f.state, "bob");
        let server = TestServer::new(
            api_routes()
                .layer(Extension(bob))
                .with_state(f.state.clone()),
        );

        let response = server
            .get(&endpoints::format_endpoint(endpoints::BUDGET_PERIODS, id))
            .await;

        response.assert_status(StatusCode::FORBIDDEN);
    }
}
