//! Reading and writing the private auth cookie.

use std::cmp::max;

use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use time::{Duration, OffsetDateTime};

use crate::{UserID, auth::token::Token};

/// The name of the cookie holding the session token.
pub(crate) const COOKIE_TOKEN: &str = "token";
/// How long a session lasts without activity.
pub(crate) const DEFAULT_COOKIE_DURATION: Duration = Duration::minutes(30);

/// Add a token cookie for `user_id` that expires `duration` from now.
///
/// # Errors
///
/// Returns an error if the token could not be serialized.
pub(crate) fn set_auth_cookie(
    jar: PrivateCookieJar,
    user_id: UserID,
    duration: Duration,
) -> Result<PrivateCookieJar, serde_json::Error> {
    let token = Token {
        user_id,
        expires_at: OffsetDateTime::now_utc() + duration,
    };

    set_token_cookie(jar, &token)
}

fn set_token_cookie(
    jar: PrivateCookieJar,
    token: &Token,
) -> Result<PrivateCookieJar, serde_json::Error> {
    let value = serde_json::to_string(token)?;

    Ok(jar.add(
        Cookie::build((COOKIE_TOKEN, value))
            .expires(token.expires_at)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true)
            .path("/"),
    ))
}

/// Replace the token cookie with an expired one so the browser drops it.
pub(crate) fn invalidate_auth_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.add(
        Cookie::build((COOKIE_TOKEN, "deleted"))
            .expires(OffsetDateTime::UNIX_EPOCH)
            .max_age(Duration::ZERO)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true)
            .path("/"),
    )
}

/// Get the unexpired token from `jar`, if there is one.
pub(crate) fn get_token_from_cookies(jar: &PrivateCookieJar) -> Option<Token> {
    let cookie = jar.get(COOKIE_TOKEN)?;
    let token: Token = serde_json::from_str(cookie.value_trimmed())
        .inspect_err(|error| tracing::warn!("could not parse auth token: {error}"))
        .ok()?;

    token.is_live_at(OffsetDateTime::now_utc()).then_some(token)
}

/// Push the token's expiry out to at least `duration` from now.
///
/// # Errors
///
/// Returns an error if the token could not be serialized. The jar is not
/// modified in that case.
pub(crate) fn extend_auth_cookie(
    jar: PrivateCookieJar,
    token: &Token,
    duration: Duration,
) -> Result<PrivateCookieJar, serde_json::Error> {
    let extended = Token {
        user_id: token.user_id,
        expires_at: max(token.expires_at, OffsetDateTime::now_utc() + duration),
    };

    set_token_cookie(jar, &extended)
}
