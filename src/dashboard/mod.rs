//! Dashboard module
//!
//! Provides an overview page with charts of income, expenses, net worth and
//! spending per category, plus links to the user's budgets.

mod charts;
mod handlers;

pub use handlers::{DashboardState, get_dashboard_page};
