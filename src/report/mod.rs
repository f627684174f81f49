//! The aggregation engine behind the reports and charts.
//!
//! Every function here is pure: callers fetch transactions from the ledger
//! and pass them in, so nothing in this module touches the database.

mod balance;
mod budget;
mod category;
mod period;
mod series;

pub use balance::{BalanceHistory, BalanceScope, NOW_LABEL, project_balance_history};
pub use budget::{BudgetPeriodSummary, Counterparty, DrillDown, evaluate_budget};
pub use category::{CategorySpend, UNCATEGORIZED_LABEL, category_palette, category_spend_breakdown};
pub use period::{
    Cadence, Period, bucket_periods, month_containing, period_containing, periods_since,
    snap_to_period_start,
};
pub use series::{IncomeExpenseSeries, build_income_expense_series};
