//! Spotify-shaped provider over HTTP.
//!
//! Handles the token endpoint (code exchange, refresh) and the Web API
//! calls the dashboard makes (`/me`, `/me/top/tracks`, `/me/top/artists`).
//! All requests share one client with an explicit timeout.

use super::models::{Artist, TimeRange, Track};
use super::MusicProvider;
use crate::identity::{Profile, TokenInfo};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::Deserialize;
use std::collections::HashMap;

const ACCOUNTS_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
const ACCOUNTS_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const API_BASE_URL: &str = "https://api.spotify.com/v1";

/// Scope needed to read the user's top tracks and artists.
const SCOPE: &str = "user-top-read";

/// Production [`MusicProvider`] backed by the provider's HTTP endpoints.
pub struct SpotifyProvider {
    http: reqwest::Client,
    auth_url: String,
    token_url: String,
    api_base: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl SpotifyProvider {
    /// Build a provider client.
    ///
    /// `timeout` bounds every OAuth and Web API request; the provider
    /// is outside our control and a hung call must not pin a worker.
    pub fn new(
        client_id: &str,
        client_secret: &str,
        redirect_uri: &str,
        timeout: std::time::Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            auth_url: ACCOUNTS_AUTH_URL.to_string(),
            token_url: ACCOUNTS_TOKEN_URL.to_string(),
            api_base: API_BASE_URL.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            redirect_uri: redirect_uri.to_string(),
        })
    }

    /// Point the provider at different endpoints (tests).
    #[cfg(test)]
    fn with_endpoints(mut self, auth_url: &str, token_url: &str, api_base: &str) -> Self {
        self.auth_url = auth_url.to_string();
        self.token_url = token_url.to_string();
        self.api_base = api_base.to_string();
        self
    }

    /// POST a form to the token endpoint and parse the token response.
    async fn token_request(&self, form: &HashMap<&str, &str>) -> Result<TokenInfo> {
        let response = self
            .http
            .post(&self.token_url)
            .header("Accept", "application/json")
            .form(form)
            .send()
            .await
            .context("Failed to send token request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!("Token endpoint returned {}: {}", status, body));
        }

        let token: TokenResponse = response
            .json()
            .await
            .context("Failed to parse token response")?;

        Ok(TokenInfo {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at: token
                .expires_in
                .map(|seconds| Utc::now() + Duration::seconds(seconds)),
            scope: token.scope,
        })
    }

    /// GET a Web API path with a bearer token, erroring on non-2xx.
    async fn api_get(&self, path_and_query: &str, access_token: &str) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.api_base, path_and_query);

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!("Upstream returned {}: {}", status, body));
        }

        Ok(response)
    }
}

#[async_trait]
impl MusicProvider for SpotifyProvider {
    fn authorize_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&response_type=code&redirect_uri={}&scope={}&state={}",
            self.auth_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(SCOPE),
            urlencoding::encode(state)
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenInfo> {
        let mut form = HashMap::new();
        form.insert("grant_type", "authorization_code");
        form.insert("code", code);
        form.insert("redirect_uri", self.redirect_uri.as_str());
        form.insert("client_id", self.client_id.as_str());
        form.insert("client_secret", self.client_secret.as_str());

        tracing::debug!("Exchanging authorization code at {}", self.token_url);
        self.token_request(&form).await
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenInfo> {
        let mut form = HashMap::new();
        form.insert("grant_type", "refresh_token");
        form.insert("refresh_token", refresh_token);
        form.insert("client_id", self.client_id.as_str());
        form.insert("client_secret", self.client_secret.as_str());

        tracing::debug!("Refreshing access token at {}", self.token_url);
        self.token_request(&form).await
    }

    async fn current_profile(&self, access_token: &str) -> Result<Profile> {
        let response = self.api_get("/me", access_token).await?;
        let me: ProfileResponse = response
            .json()
            .await
            .context("Failed to parse profile response")?;

        Ok(Profile {
            id: me.id,
            display_name: me.display_name,
            avatar_url: me.images.into_iter().next().map(|image| image.url),
            profile_url: me.external_urls.spotify,
        })
    }

    async fn top_tracks(
        &self,
        access_token: &str,
        time_range: TimeRange,
        limit: u32,
    ) -> Result<Vec<Track>> {
        let path = format!(
            "/me/top/tracks?time_range={}&limit={}",
            time_range.as_str(),
            limit
        );
        let response = self.api_get(&path, access_token).await?;
        let page: Page<TrackItem> = response
            .json()
            .await
            .context("Failed to parse top tracks response")?;

        Ok(page
            .items
            .into_iter()
            .map(|item| Track {
                name: item.name,
                artists: item.artists.into_iter().map(|a| a.name).collect(),
                album: item.album.map(|a| a.name),
                url: item.external_urls.spotify,
            })
            .collect())
    }

    async fn top_artists(
        &self,
        access_token: &str,
        time_range: TimeRange,
        limit: u32,
    ) -> Result<Vec<Artist>> {
        let path = format!(
            "/me/top/artists?time_range={}&limit={}",
            time_range.as_str(),
            limit
        );
        let response = self.api_get(&path, access_token).await?;
        let page: Page<ArtistItem> = response
            .json()
            .await
            .context("Failed to parse top artists response")?;

        Ok(page
            .items
            .into_iter()
            .map(|item| Artist {
                name: item.name,
                genres: item.genres,
                url: item.external_urls.spotify,
            })
            .collect())
    }
}

/// Token endpoint response (standard OAuth 2.0)
#[derive(Deserialize, Debug)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    scope: Option<String>,
}

/// Wrapper around the Web API's paged item lists
#[derive(Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Deserialize, Default)]
struct ExternalUrls {
    #[serde(default)]
    spotify: Option<String>,
}

#[derive(Deserialize)]
struct ProfileResponse {
    id: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    images: Vec<ImageRef>,
    #[serde(default)]
    external_urls: ExternalUrls,
}

#[derive(Deserialize)]
struct ImageRef {
    url: String,
}

#[derive(Deserialize)]
struct TrackItem {
    name: String,
    #[serde(default)]
    artists: Vec<NamedRef>,
    #[serde(default)]
    album: Option<NamedRef>,
    #[serde(default)]
    external_urls: ExternalUrls,
}

#[derive(Deserialize)]
struct NamedRef {
    name: String,
}

#[derive(Deserialize)]
struct ArtistItem {
    name: String,
    #[serde(default)]
    genres: Vec<String>,
    #[serde(default)]
    external_urls: ExternalUrls,
}
