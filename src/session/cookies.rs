//! Session cookie construction.

use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

/// Build the session cookie carrying an opaque session id.
///
/// HttpOnly and SameSite=Lax; the value itself is additionally encrypted
/// by the private cookie jar before it reaches the browser.
pub fn session_cookie(name: &str, session_id: &str, ttl_minutes: i64) -> Cookie<'static> {
    Cookie::build((name.to_string(), session_id.to_string()))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::minutes(ttl_minutes))
        .build()
}

/// Build a removal cookie for the session.
pub fn clear_session_cookie(name: &str) -> Cookie<'static> {
    Cookie::build((name.to_string(), ""))
        .path("/")
        .max_age(Duration::ZERO)
        .build()
}
