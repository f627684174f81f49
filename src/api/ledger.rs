//! Endpoints for reading and changing the ledger.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use rand::{SeedableRng, rngs::StdRng};
use serde::Deserialize;

use crate::{
    AccountId, Error, TransactionId, UserID,
    api::{ApiState, lock_connection},
    ledger::{
        Account, Category, DemoData, NewAccount, NewTransaction, Payee, RECENT_TRANSACTION_COUNT,
        Transaction, TransactionListing, TransactionPage, TransactionUpdate, create_account,
        create_demo_data, create_transaction, get_account_transactions_page, get_accounts,
        get_categories, get_payees, get_recent_transactions, remove_transaction,
        update_transaction,
    },
    timezone::local_today,
};

const DEFAULT_PAGE_SIZE: u32 = 25;

/// The query string for paginated lists.
#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    /// The zero-based page number.
    #[serde(default)]
    pub page: u32,
    /// How many items per page.
    pub per_page: Option<u32>,
}

/// List the user's accounts.
pub async fn list_accounts(
    State(state): State<ApiState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<Vec<Account>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_accounts(user_id, &connection).map(Json)
}

/// Open a new account.
pub async fn create_account_endpoint(
    State(state): State<ApiState>,
    Extension(user_id): Extension<UserID>,
    Json(new_account): Json<NewAccount>,
) -> Result<(StatusCode, Json<Account>), Error> {
    let connection = lock_connection(&state.db_connection)?;

    let account = create_account(user_id, new_account, &connection)?;

    Ok((StatusCode::CREATED, Json(account)))
}

/// One page of an account's transactions, newest first.
pub async fn get_account_transactions(
    State(state): State<ApiState>,
    Extension(user_id): Extension<UserID>,
    Path(account_id): Path<AccountId>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<TransactionPage>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_account_transactions_page(
        account_id,
        user_id,
        query.page,
        query.per_page.unwrap_or(DEFAULT_PAGE_SIZE),
        &connection,
    )
    .map(Json)
}

/// The newest transactions across all of the user's accounts.
pub async fn get_recent_transactions_endpoint(
    State(state): State<ApiState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<Vec<TransactionListing>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_recent_transactions(user_id, RECENT_TRANSACTION_COUNT, &connection).map(Json)
}

/// Record a transaction or a transfer.
pub async fn create_transaction_endpoint(
    State(state): State<ApiState>,
    Extension(user_id): Extension<UserID>,
    Json(new_transaction): Json<NewTransaction>,
) -> Result<(StatusCode, Json<Transaction>), Error> {
    let today = local_today(&state.local_timezone)?;
    let connection = lock_connection(&state.db_connection)?;

    let transaction = create_transaction(new_transaction, user_id, today, &connection)?;

    Ok((StatusCode::CREATED, Json(transaction)))
}

/// Edit a transaction, moving the account balance by the change in amount.
pub async fn update_transaction_endpoint(
    State(state): State<ApiState>,
    Extension(user_id): Extension<UserID>,
    Path(transaction_id): Path<TransactionId>,
    Json(update): Json<TransactionUpdate>,
) -> Result<Json<Transaction>, Error> {
    let today = local_today(&state.local_timezone)?;
    let connection = lock_connection(&state.db_connection)?;

    let transaction = update_transaction(transaction_id, update, user_id, today, &connection)?;
    tracing::info!("User {user_id} edited transaction {transaction_id}");

    Ok(Json(transaction))
}

/// Remove a transaction, undoing its effect on the account balance.
pub async fn delete_transaction_endpoint(
    State(state): State<ApiState>,
    Extension(user_id): Extension<UserID>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;

    remove_transaction(transaction_id, user_id, &connection)?;

    Ok(StatusCode::NO_CONTENT)
}

/// List the categories the user can use.
pub async fn list_categories(
    State(state): State<ApiState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<Vec<Category>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_categories(user_id, &connection).map(Json)
}

/// List the user's payees.
pub async fn list_payees(
    State(state): State<ApiState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<Vec<Payee>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_payees(user_id, &connection).map(Json)
}

/// Fill the user's ledger with random accounts and transactions.
pub async fn create_demo_data_endpoint(
    State(state): State<ApiState>,
    Extension(user_id): Extension<UserID>,
) -> Result<(StatusCode, Json<DemoData>), Error> {
    let today = local_today(&state.local_timezone)?;
    let connection = lock_connection(&state.db_connection)?;
    let mut rng = StdRng::from_entropy();

    let demo_data = create_demo_data(user_id, today, &mut rng, &connection)?;

    Ok((StatusCode::CREATED, Json(demo_data)))
}
