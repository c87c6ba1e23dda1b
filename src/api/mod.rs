//! HTTP surface of the dashboard.
//!
//! Routes:
//! - `GET /` - home view (login prompt, or greeting when authenticated)
//! - `GET /login` - redirect to the provider's authorization page
//! - `GET /callback` - OAuth redirect target (code → token → profile → store)
//! - `GET /logout` - unbind the session, back to home
//! - `GET /top` - the user's top tracks and artists for a time window

mod auth;
mod top;
mod views;

use crate::identity::IdentityStore;
use crate::provider::MusicProvider;
use crate::session::SessionRegistry;
use anyhow::{anyhow, Context, Result};
use axum::{
    extract::FromRef,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use axum_extra::extract::cookie::Key;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Serialize;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub store: std::sync::Arc<dyn IdentityStore>,
    pub sessions: SessionRegistry,
    pub provider: std::sync::Arc<dyn MusicProvider>,
    /// Key for the private (encrypted) session cookie jar
    pub cookie_key: Key,
    pub cookie_name: String,
    pub session_ttl_minutes: i64,
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Key {
        state.cookie_key.clone()
    }
}

/// Derive the cookie jar key from base64 key material.
///
/// Requires at least 32 bytes of decoded material.
pub fn cookie_key_from_base64(key_base64: &str) -> Result<Key> {
    let bytes = BASE64
        .decode(key_base64)
        .context("Cookie key is not valid base64")?;

    if bytes.len() < 32 {
        return Err(anyhow!(
            "Cookie key must decode to at least 32 bytes, got {}",
            bytes.len()
        ));
    }

    Ok(Key::derive_from(&bytes))
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Request failures surfaced to the browser.
///
/// "Not authenticated" is deliberately absent: an unbound or stale
/// session is normal control flow (redirect to login), not an error.
pub enum AppError {
    /// Callback arrived without an authorization code
    MissingCode,
    /// Code-for-token exchange failed (codes are single-use, no retry)
    TokenExchange(String),
    /// Profile fetch with a fresh token failed
    ProfileFetch(String),
    /// `time_range` is not one of the three known windows
    InvalidTimeRange(String),
    /// The music API failed at content-fetch time
    Upstream(String),
    /// Store or other internal fault
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::MissingCode => (
                StatusCode::BAD_REQUEST,
                "Authorization code missing".to_string(),
            ),
            AppError::TokenExchange(msg) => (
                StatusCode::BAD_GATEWAY,
                format!("Token exchange failed: {}", msg),
            ),
            AppError::ProfileFetch(msg) => (
                StatusCode::BAD_GATEWAY,
                format!("Profile fetch failed: {}", msg),
            ),
            AppError::InvalidTimeRange(value) => (
                StatusCode::BAD_REQUEST,
                format!("Invalid time range '{}'", value),
            ),
            AppError::Upstream(msg) => (
                StatusCode::BAD_GATEWAY,
                format!("Upstream request failed: {}", msg),
            ),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse {
            error: error_message,
        });

        (status, body).into_response()
    }
}

/// Create the dashboard router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(top::home))
        .route("/login", get(auth::login))
        .route("/callback", get(auth::callback))
        .route("/logout", get(auth::logout))
        .route("/top", get(top::top))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
