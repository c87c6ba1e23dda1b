//! Music provider integration.
//!
//! The OAuth 2.0 authorization-code flow:
//! 1. User clicks "Log in" on the dashboard
//! 2. GET /login → Redirect to the provider's authorization page
//! 3. User authorizes on the provider's site
//! 4. Provider redirects to /callback?code=...
//! 5. Exchange code for tokens, fetch the profile, store both
//! 6. The dashboard can now query the user's top items
//!
//! Everything the dashboard needs from the provider sits behind the
//! [`MusicProvider`] trait, so the HTTP handlers can be exercised in
//! tests without a network.

use crate::identity::{Profile, TokenInfo};
use anyhow::Result;
use async_trait::async_trait;

mod models;
mod spotify;

pub use models::{Artist, TimeRange, Track};
pub use spotify::SpotifyProvider;

/// The upstream music provider: OAuth endpoints plus the Web API calls
/// the dashboard makes on the user's behalf.
#[async_trait]
pub trait MusicProvider: Send + Sync {
    /// The provider's authorization URL for the given opaque state
    /// value. Pure URL construction, no network call.
    fn authorize_url(&self, state: &str) -> String;

    /// Exchange an authorization code for token material.
    ///
    /// Codes are single-use: a failed exchange is never retried.
    async fn exchange_code(&self, code: &str) -> Result<TokenInfo>;

    /// Obtain fresh token material from a refresh token.
    ///
    /// The provider may omit a new refresh token; the caller keeps the
    /// old one in that case.
    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenInfo>;

    /// Fetch the authenticated user's profile ("who am I").
    async fn current_profile(&self, access_token: &str) -> Result<Profile>;

    /// The user's top tracks for a time window, at most `limit` items.
    async fn top_tracks(
        &self,
        access_token: &str,
        time_range: TimeRange,
        limit: u32,
    ) -> Result<Vec<Track>>;

    /// The user's top artists for a time window, at most `limit` items.
    async fn top_artists(
        &self,
        access_token: &str,
        time_range: TimeRange,
        limit: u32,
    ) -> Result<Vec<Artist>>;
}
