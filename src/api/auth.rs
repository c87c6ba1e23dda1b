//! Login, callback, and logout handlers.

use super::{AppError, AppState};
use crate::identity::IdentityRecord;
use crate::session::{clear_session_cookie, mint_session_id, session_cookie};
use axum::{
    extract::{Query, State},
    response::Redirect,
};
use axum_extra::extract::PrivateCookieJar;
use serde::Deserialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// OAuth callback query parameters. The opaque `state` echo is ignored;
/// identity comes from the profile fetch, not the redirect.
#[derive(Deserialize)]
pub struct CallbackParams {
    code: Option<String>,
    error: Option<String>,
}

/// GET /login
///
/// Redirects the browser to the provider's authorization page. Pure URL
/// construction; nothing is stored and no network call is made.
pub async fn login(State(state): State<AppState>) -> Redirect {
    let oauth_state = Uuid::new_v4().to_string();
    let url = state.provider.authorize_url(&oauth_state);

    debug!("Redirecting to authorization page");
    Redirect::to(&url)
}

/// GET /callback?code=...
///
/// The provider's redirect target. Exchanges the code, fetches the
/// profile, upserts the identity store, and binds the browser session.
/// The store is only touched once both the token and the profile are in
/// hand; a failure in either step leaves it unchanged.
pub async fn callback(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<(PrivateCookieJar, Redirect), AppError> {
    if let Some(err) = params.error {
        warn!(error = %err, "Provider denied authorization");
        return Err(AppError::MissingCode);
    }

    let code = params.code.ok_or(AppError::MissingCode)?;

    let token = state.provider.exchange_code(&code).await.map_err(|e| {
        error!(error = %e, "Token exchange failed");
        AppError::TokenExchange(e.to_string())
    })?;

    let profile = state
        .provider
        .current_profile(&token.access_token)
        .await
        .map_err(|e| {
            error!(error = %e, "Profile fetch failed");
            AppError::ProfileFetch(e.to_string())
        })?;

    let user_id = profile.id.clone();
    state
        .store
        .upsert(IdentityRecord {
            id: user_id.clone(),
            token,
            profile,
        })
        .map_err(|e| AppError::Internal(e.to_string()))?;

    // Diagnostic enumeration of known identities
    if let Ok(identities) = state.store.list() {
        debug!(count = identities.len(), "Identities in store after login");
    }

    // Reuse the browser's session id if it already has one
    let session_id = jar
        .get(&state.cookie_name)
        .map(|cookie| cookie.value().to_string())
        .unwrap_or_else(mint_session_id);

    state.sessions.bind(&session_id, &user_id);
    let jar = jar.add(session_cookie(
        &state.cookie_name,
        &session_id,
        state.session_ttl_minutes,
    ));

    info!(user = %user_id, "Login complete");
    Ok((jar, Redirect::to("/top")))
}

/// GET /logout
///
/// Unbinds the session and removes the cookie. The store is untouched:
/// other active sessions for the same identity keep working.
pub async fn logout(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
) -> (PrivateCookieJar, Redirect) {
    if let Some(cookie) = jar.get(&state.cookie_name) {
        state.sessions.unbind(cookie.value());
    }

    let jar = jar.add(clear_session_cookie(&state.cookie_name));
    (jar, Redirect::to("/"))
}

/// Resolve the session cookie to a bound identity id.
///
/// `None` covers every unauthenticated shape: no cookie, unknown or
/// expired session id.
pub(super) fn session_user(state: &AppState, jar: &PrivateCookieJar) -> Option<String> {
    let cookie = jar.get(&state.cookie_name)?;
    state.sessions.current(cookie.value())
}
