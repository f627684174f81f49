#![allow(missing_docs)]

pub(crate) mod html;
pub(crate) mod state;

pub(crate) use html::{assert_chart_exists, assert_valid_html, parse_html};
pub(crate) use state::{get_test_state, insert_test_user};
