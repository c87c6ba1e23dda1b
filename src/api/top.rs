//! Content handlers: home view and the top tracks/artists view.

use super::auth::session_user;
use super::views;
use super::{AppError, AppState};
use crate::identity::{IdentityRecord, TokenInfo};
use crate::provider::TimeRange;
use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::PrivateCookieJar;
use serde::Deserialize;
use tracing::{debug, error, info};

/// Query parameters for GET /top
#[derive(Deserialize)]
pub struct TopParams {
    #[serde(default = "default_time_range")]
    time_range: String,
    #[serde(default = "default_limit")]
    limit: u32,
}

fn default_time_range() -> String {
    "short_term".to_string()
}

fn default_limit() -> u32 {
    5
}

/// GET /
///
/// Home view. A greeting for an authenticated user, a login prompt for
/// everyone else. Never calls the upstream content API.
pub async fn home(State(state): State<AppState>, jar: PrivateCookieJar) -> Result<Html<String>, AppError> {
    let Some(user_id) = session_user(&state, &jar) else {
        return Ok(views::home_signed_out());
    };

    // A binding whose identity is gone from the store is stale
    match state
        .store
        .get(&user_id)
        .map_err(|e| AppError::Internal(e.to_string()))?
    {
        Some(record) => Ok(views::home_signed_in(&record.profile)),
        None => Ok(views::home_signed_out()),
    }
}

/// GET /top?time_range=..&limit=..
///
/// The user's top tracks and artists for the requested time window.
/// Unauthenticated (or stale) sessions are redirected to login; that is
/// the normal path, not an error. An unknown `time_range` is a client
/// error with no default substitution.
pub async fn top(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Query(params): Query<TopParams>,
) -> Result<Response, AppError> {
    let Some(user_id) = session_user(&state, &jar) else {
        debug!("No session binding, redirecting to login");
        return Ok(Redirect::to("/login").into_response());
    };

    let Some(record) = state
        .store
        .get(&user_id)
        .map_err(|e| AppError::Internal(e.to_string()))?
    else {
        debug!(user = %user_id, "Stale session binding, redirecting to login");
        return Ok(Redirect::to("/login").into_response());
    };

    let time_range = TimeRange::parse(&params.time_range)
        .ok_or_else(|| AppError::InvalidTimeRange(params.time_range.clone()))?;

    let token = fresh_token(&state, record).await?;

    // `limit` passes through as-is; if it is larger than the provider
    // accepts, the rejection surfaces as an upstream failure.
    let tracks = state
        .provider
        .top_tracks(&token.access_token, time_range, params.limit)
        .await
        .map_err(|e| {
            error!(error = %e, "Top tracks fetch failed");
            AppError::Upstream(e.to_string())
        })?;

    let artists = state
        .provider
        .top_artists(&token.access_token, time_range, params.limit)
        .await
        .map_err(|e| {
            error!(error = %e, "Top artists fetch failed");
            AppError::Upstream(e.to_string())
        })?;

    debug!(
        user = %user_id,
        time_range = time_range.as_str(),
        tracks = tracks.len(),
        artists = artists.len(),
        "Top items fetched"
    );

    Ok(views::top_page(&user_id, time_range, &tracks, &artists).into_response())
}

/// An access token ready for content calls.
///
/// An expired token with a refresh token is refreshed and the store
/// updated before use. Without a refresh token the stored token is used
/// as-is; the upstream's rejection then surfaces to the caller.
async fn fresh_token(state: &AppState, record: IdentityRecord) -> Result<TokenInfo, AppError> {
    if !record.token.is_expired() {
        return Ok(record.token);
    }

    let Some(refresh) = record.token.refresh_token.clone() else {
        return Ok(record.token);
    };

    let mut refreshed = state.provider.refresh_token(&refresh).await.map_err(|e| {
        error!(user = %record.id, error = %e, "Token refresh failed");
        AppError::TokenExchange(e.to_string())
    })?;

    // The provider may not rotate the refresh token
    if refreshed.refresh_token.is_none() {
        refreshed.refresh_token = Some(refresh);
    }

    state
        .store
        .upsert(IdentityRecord {
            id: record.id.clone(),
            token: refreshed.clone(),
            profile: record.profile,
        })
        .map_err(|e| AppError::Internal(e.to_string()))?;

    info!(user = %record.id, "Access token refreshed");
    Ok(refreshed)
}
