//! Identity records and token storage.
//!
//! One [`IdentityRecord`] per provider user id, holding the latest OAuth
//! token material and the last profile fetched for that user. The store
//! is an upsert-only keyed map behind the [`IdentityStore`] trait, with
//! two backings:
//!
//! - [`MemoryIdentityStore`] - process-local map, used in tests
//! - [`SqliteIdentityStore`] - SQLite file, tokens encrypted at rest
//!   with AES-256-GCM
//!
//! Absence of a record is a normal outcome (`Ok(None)`), never an error:
//! callers treat it as "not authenticated" and redirect to login.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

mod encryption;
mod memory;
mod sqlite;

pub use memory::MemoryIdentityStore;
pub use sqlite::SqliteIdentityStore;

/// Shown when the provider returned no profile images.
pub const PLACEHOLDER_AVATAR_URL: &str = "https://via.placeholder.com/150";

/// Refresh this long before the nominal expiry to avoid using a token
/// that dies mid-request.
const EXPIRY_LEEWAY_SECONDS: i64 = 30;

/// OAuth token material as returned by the provider's token endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// Access token used for Web API requests
    pub access_token: String,

    /// Refresh token used to obtain new access tokens
    pub refresh_token: Option<String>,

    /// When the access token expires (UTC)
    pub expires_at: Option<DateTime<Utc>>,

    /// Granted scopes, space-separated
    pub scope: Option<String>,
}

impl TokenInfo {
    /// Whether the access token is expired (or about to expire).
    ///
    /// Tokens with no known expiry are treated as still valid; the
    /// upstream API is the authority and will reject them if not.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => {
                expires_at <= Utc::now() + Duration::seconds(EXPIRY_LEEWAY_SECONDS)
            }
            None => false,
        }
    }
}

/// Profile information from the provider's "who am I" endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// The provider's stable user identifier
    pub id: String,

    /// Human-readable display name, if the user set one
    pub display_name: Option<String>,

    /// URL of the first profile image, if any
    pub avatar_url: Option<String>,

    /// Link to the user's public profile page
    pub profile_url: Option<String>,
}

impl Profile {
    /// Display name, falling back to the user id.
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }

    /// Avatar URL, falling back to a placeholder image.
    pub fn avatar(&self) -> &str {
        self.avatar_url.as_deref().unwrap_or(PLACEHOLDER_AVATAR_URL)
    }
}

/// One authenticated end user: id + latest token + latest profile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IdentityRecord {
    /// Provider user id (primary key)
    pub id: String,

    /// Latest token material for this user
    pub token: TokenInfo,

    /// Latest profile fetched for this user
    pub profile: Profile,
}

/// Keyed upsert store for identity records.
///
/// Implementations must apply each `upsert` atomically: a concurrent
/// reader sees either the whole old record or the whole new one, never
/// a mix of old token and new profile. Last-writer-wins between two
/// concurrent upserts for the same id is acceptable.
pub trait IdentityStore: Send + Sync {
    /// Insert-or-replace by `record.id`.
    fn upsert(&self, record: IdentityRecord) -> Result<()>;

    /// Look up a record. `Ok(None)` for an unknown id.
    fn get(&self, id: &str) -> Result<Option<IdentityRecord>>;

    /// Enumerate all records (diagnostics only, store-defined order).
    fn list(&self) -> Result<Vec<IdentityRecord>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(expires_at: Option<DateTime<Utc>>) -> TokenInfo {
        TokenInfo {
            access_token: "tok".to_string(),
            refresh_token: None,
            expires_at,
            scope: None,
        }
    }

    #[test]
    fn test_token_without_expiry_is_not_expired() {
        assert!(!token(None).is_expired());
    }

    #[test]
    fn test_token_past_expiry_is_expired() {
        let t = token(Some(Utc::now() - Duration::hours(1)));
        assert!(t.is_expired());
    }

    #[test]
    fn test_token_within_leeway_is_expired() {
        // Expires in 10 seconds, leeway is 30 - treated as expired
        let t = token(Some(Utc::now() + Duration::seconds(10)));
        assert!(t.is_expired());
    }

    #[test]
    fn test_token_far_from_expiry_is_valid() {
        let t = token(Some(Utc::now() + Duration::hours(1)));
        assert!(!t.is_expired());
    }

    #[test]
    fn test_profile_name_falls_back_to_id() {
        let profile = Profile {
            id: "u42".to_string(),
            display_name: None,
            avatar_url: None,
            profile_url: None,
        };
        assert_eq!(profile.name(), "u42");

        let named = Profile {
            display_name: Some("Alex".to_string()),
            ..profile
        };
        assert_eq!(named.name(), "Alex");
    }

    #[test]
    fn test_profile_avatar_falls_back_to_placeholder() {
        let profile = Profile {
            id: "u42".to_string(),
            display_name: None,
            avatar_url: None,
            profile_url: None,
        };
        assert_eq!(profile.avatar(), PLACEHOLDER_AVATAR_URL);

        let with_image = Profile {
            avatar_url: Some("https://img.example/me.png".to_string()),
            ..profile
        };
        assert_eq!(with_image.avatar(), "https://img.example/me.png");
    }
}
