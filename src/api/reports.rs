//! Report endpoints: income and expenses, net worth, account balance history
//! and spending per category.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use rusqlite::Connection;
use serde::Deserialize;
use time::Date;

use crate::{
    AccountId, Error, UserID,
    api::{ApiState, lock_connection},
    ledger::{
        TransactionFilter, find_transactions, get_account, get_categories, get_open_account_ids,
        get_total_balance,
    },
    report::{
        BalanceHistory, BalanceScope, Cadence, CategorySpend, IncomeExpenseSeries, Period, bucket_periods,
        build_income_expense_series, category_spend_breakdown, month_containing,
        project_balance_history,
    },
    timezone::local_today,
};

/// How many months a report covers when the request does not say.
pub(crate) const DEFAULT_REPORT_MONTHS: u32 = 6;

/// Month-name labels repeat after a year.
const MAX_INCOME_EXPENSE_MONTHS: u32 = 12;

const MAX_BALANCE_HISTORY_MONTHS: u32 = 120;

/// The query string for reports that cover a number of months.
#[derive(Debug, Deserialize)]
pub struct MonthsQuery {
    /// How many months to cover, ending with the current month.
    pub months: Option<u32>,
}

/// The query string for reports on a single month.
#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    /// Any date in the month to report on. Defaults to today.
    pub month: Option<Date>,
}

fn validate_months(months: Option<u32>, max: u32) -> Result<u32, Error> {
    let months = months.unwrap_or(DEFAULT_REPORT_MONTHS);

    if months == 0 || months > max {
        return Err(Error::InvalidMonthCount(months));
    }

    Ok(months)
}

/// The earliest start and latest end of `periods`.
fn span(periods: &[Period]) -> (Option<Date>, Option<Date>) {
    (
        periods.iter().map(|period| period.start).min(),
        periods.iter().map(|period| period.end).max(),
    )
}

/// Income and expenses for the current month and the `months - 1` before it.
pub(crate) fn income_expense_for_user(
    user_id: UserID,
    months: u32,
    today: Date,
    connection: &Connection,
) -> Result<IncomeExpenseSeries, Error> {
    let periods = bucket_periods(today, Cadence::Monthly, months as usize)?;
    let (start, end) = span(&periods);

    let transactions = find_transactions(
        user_id,
        &TransactionFilter {
            account_ids: None,
            start,
            end,
        },
        connection,
    )?;

    build_income_expense_series(&transactions, &periods)
}

/// The combined balance of the user's open accounts at the start of each month.
pub(crate) fn net_worth_for_user(
    user_id: UserID,
    months: u32,
    today: Date,
    connection: &Connection,
) -> Result<BalanceHistory, Error> {
    let current_balance = get_total_balance(user_id, connection)?;
    let account_ids = get_open_account_ids(user_id, connection)?;

    balance_history(
        user_id,
        account_ids,
        current_balance,
        BalanceScope::Combined,
        months,
        today,
        connection,
    )
}

fn balance_history(
    user_id: UserID,
    account_ids: Vec<AccountId>,
    current_balance: rust_decimal::Decimal,
    scope: BalanceScope,
    months: u32,
    today: Date,
    connection: &Connection,
) -> Result<BalanceHistory, Error> {
    let periods = bucket_periods(today, Cadence::Monthly, months as usize)?;
    let (start, _) = span(&periods);

    let transactions = find_transactions(
        user_id,
        &TransactionFilter {
            account_ids: Some(account_ids),
            start,
            end: Some(today),
        },
        connection,
    )?;

    Ok(project_balance_history(
        current_balance,
        &transactions,
        &periods,
        today,
        scope,
    ))
}

/// Spending per category in the month containing `month`.
pub(crate) fn category_spend_for_user(
    user_id: UserID,
    month: Date,
    connection: &Connection,
) -> Result<Vec<CategorySpend>, Error> {
    let period = month_containing(month);
    let categories = get_categories(user_id, connection)?;
    let transactions = find_transactions(
        user_id,
        &TransactionFilter {
            account_ids: None,
            start: Some(period.start),
            end: Some(period.end),
        },
        connection,
    )?;

    Ok(category_spend_breakdown(&transactions, &categories, month))
}

/// Monthly income and expense totals, oldest first.
pub async fn get_income_expense_report(
    State(state): State<ApiState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<MonthsQuery>,
) -> Result<Json<IncomeExpenseSeries>, Error> {
    let months = validate_months(query.months, MAX_INCOME_EXPENSE_MONTHS)?;
    let today = local_today(&state.local_timezone)?;
    let connection = lock_connection(&state.db_connection)?;

    income_expense_for_user(user_id, months, today, &connection).map(Json)
}

/// Net worth at the start of each month plus the current value.
pub async fn get_net_worth_report(
    State(state): State<ApiState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<MonthsQuery>,
) -> Result<Json<BalanceHistory>, Error> {
    let months = validate_months(query.months, MAX_BALANCE_HISTORY_MONTHS)?;
    let today = local_today(&state.local_timezone)?;
    let connection = lock_connection(&state.db_connection)?;

    net_worth_for_user(user_id, months, today, &connection).map(Json)
}

/// One account's balance at the start of each month plus the current value.
pub async fn get_account_balance_history(
    State(state): State<ApiState>,
    Extension(user_id): Extension<UserID>,
    Path(account_id): Path<AccountId>,
    Query(query): Query<MonthsQuery>,
) -> Result<Json<BalanceHistory>, Error> {
    let months = validate_months(query.months, MAX_BALANCE_HISTORY_MONTHS)?;
    let today = local_today(&state.local_timezone)?;
    let connection = lock_connection(&state.db_connection)?;

    let account = get_account(account_id, user_id, &connection)?;

    balance_history(
        user_id,
        vec![account.id],
        account.current_balance,
        BalanceScope::SingleAccount,
        months,
        today,
        &connection,
    )
    .map(Json)
}

/// Spending per category for one month, largest first.
pub async fn get_category_spend_report(
    State(state): State<ApiState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<MonthQuery>,
) -> Result<Json<Vec<CategorySpend>>, Error> {
    let month = match query.month {
        Some(month) => month,
        None => local_today(&state.local_timezone)?,
    };
    let connection = lock_connection(&state.db_connection)?;

    category_spend_for_user(user_id, month, &connection).map(Json)
}
