//! Session handling: the private auth cookie, the middleware that checks it,
//! and the log-in and log-out handlers.

mod cookie;
mod log_in;
mod log_out;
mod middleware;
mod password;
mod token;

pub(crate) use cookie::DEFAULT_COOKIE_DURATION;
pub use log_in::{get_log_in_page, post_log_in};
pub use log_out::get_log_out;
pub use middleware::{auth_guard, auth_guard_api};
pub use password::{PasswordHash, ValidatedPassword};

#[cfg(test)]
pub(crate) use cookie::{COOKIE_TOKEN, set_auth_cookie};
