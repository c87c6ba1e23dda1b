//! SQLite identity store with tokens encrypted at rest.

use super::encryption::{self, Sealed};
use super::{IdentityRecord, IdentityStore, Profile, TokenInfo};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::Mutex;

/// Identity store backed by SQLite.
///
/// # Schema
/// ```sql
/// CREATE TABLE identities (
///     id TEXT PRIMARY KEY,
///     access_token TEXT NOT NULL,       -- Encrypted
///     access_token_nonce TEXT NOT NULL,
///     refresh_token TEXT,               -- Encrypted (optional)
///     refresh_token_nonce TEXT,
///     expires_at TEXT,                  -- ISO 8601 (optional)
///     scope TEXT,
///     display_name TEXT,
///     avatar_url TEXT,
///     profile_url TEXT,
///     created_at TEXT NOT NULL,
///     updated_at TEXT NOT NULL
/// );
/// ```
///
/// Tokens are sealed with AES-256-GCM, one nonce per value. The upsert
/// is a single `INSERT .. ON CONFLICT(id) DO UPDATE` statement, so
/// SQLite's ACID guarantees rule out torn records; the connection sits
/// behind a `Mutex`, which serializes concurrent upserts for one id.
pub struct SqliteIdentityStore {
    conn: Mutex<Connection>,
    key: Vec<u8>,
}

impl SqliteIdentityStore {
    /// Create or open an identity store.
    ///
    /// `key_base64` is the base64-encoded 32-byte master key used to
    /// seal token material.
    pub fn open<P: AsRef<Path>>(db_path: P, key_base64: &str) -> Result<Self> {
        let key = encryption::decode_key(key_base64).context("Invalid encryption key")?;

        let conn = Connection::open(db_path).context("Failed to open identity database")?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS identities (
                id TEXT PRIMARY KEY,
                access_token TEXT NOT NULL,
                access_token_nonce TEXT NOT NULL,
                refresh_token TEXT,
                refresh_token_nonce TEXT,
                expires_at TEXT,
                scope TEXT,
                display_name TEXT,
                avatar_url TEXT,
                profile_url TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
            [],
        )
        .context("Failed to create identities table")?;

        Ok(Self {
            conn: Mutex::new(conn),
            key,
        })
    }

    fn row_to_record(&self, row: &Row) -> Result<IdentityRecord> {
        let id: String = row.get(0)?;

        let access_sealed = Sealed {
            ciphertext: row.get(1)?,
            nonce: row.get(2)?,
        };
        let access_token =
            encryption::open(&access_sealed, &self.key).context("Failed to open access token")?;

        let refresh_ciphertext: Option<String> = row.get(3)?;
        let refresh_nonce: Option<String> = row.get(4)?;
        let refresh_token = match (refresh_ciphertext, refresh_nonce) {
            (Some(ciphertext), Some(nonce)) => Some(
                encryption::open(&Sealed { ciphertext, nonce }, &self.key)
                    .context("Failed to open refresh token")?,
            ),
            _ => None,
        };

        let expires_at: Option<String> = row.get(5)?;
        let expires_at = expires_at
            .map(|s| DateTime::parse_from_rfc3339(&s).map(|dt| dt.with_timezone(&Utc)))
            .transpose()
            .context("Failed to parse expires_at timestamp")?;

        Ok(IdentityRecord {
            id: id.clone(),
            token: TokenInfo {
                access_token,
                refresh_token,
                expires_at,
                scope: row.get(6)?,
            },
            profile: Profile {
                id,
                display_name: row.get(7)?,
                avatar_url: row.get(8)?,
                profile_url: row.get(9)?,
            },
        })
    }
}

impl IdentityStore for SqliteIdentityStore {
    fn upsert(&self, record: IdentityRecord) -> Result<()> {
        let access = encryption::seal(&record.token.access_token, &self.key)
            .context("Failed to seal access token")?;

        let refresh = record
            .token
            .refresh_token
            .as_deref()
            .map(|t| encryption::seal(t, &self.key))
            .transpose()
            .context("Failed to seal refresh token")?;

        let expires_at = record.token.expires_at.map(|dt| dt.to_rfc3339());
        let now = Utc::now().to_rfc3339();

        self.conn
            .lock()
            .unwrap()
            .execute(
                r#"
                INSERT INTO identities (
                    id,
                    access_token, access_token_nonce,
                    refresh_token, refresh_token_nonce,
                    expires_at, scope,
                    display_name, avatar_url, profile_url,
                    created_at, updated_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
                ON CONFLICT(id) DO UPDATE SET
                    access_token = excluded.access_token,
                    access_token_nonce = excluded.access_token_nonce,
                    refresh_token = excluded.refresh_token,
                    refresh_token_nonce = excluded.refresh_token_nonce,
                    expires_at = excluded.expires_at,
                    scope = excluded.scope,
                    display_name = excluded.display_name,
                    avatar_url = excluded.avatar_url,
                    profile_url = excluded.profile_url,
                    updated_at = excluded.updated_at
                "#,
                params![
                    record.id,
                    access.ciphertext,
                    access.nonce,
                    refresh.as_ref().map(|s| s.ciphertext.clone()),
                    refresh.as_ref().map(|s| s.nonce.clone()),
                    expires_at,
                    record.token.scope,
                    record.profile.display_name,
                    record.profile.avatar_url,
                    record.profile.profile_url,
                    now,
                ],
            )
            .context("Failed to upsert identity")?;

        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<IdentityRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                r#"
                SELECT id,
                       access_token, access_token_nonce,
                       refresh_token, refresh_token_nonce,
                       expires_at, scope,
                       display_name, avatar_url, profile_url
                FROM identities
                WHERE id = ?1
                "#,
            )
            .context("Failed to prepare query")?;

        let mut rows = stmt.query(params![id]).context("Failed to execute query")?;

        match rows.next().context("Failed to read row")? {
            Some(row) => Ok(Some(self.row_to_record(row)?)),
            None => Ok(None),
        }
    }

    fn list(&self) -> Result<Vec<IdentityRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                r#"
                SELECT id,
                       access_token, access_token_nonce,
                       refresh_token, refresh_token_nonce,
                       expires_at, scope,
                       display_name, avatar_url, profile_url
                FROM identities
                ORDER BY id
                "#,
            )
            .context("Failed to prepare query")?;

        let mut rows = stmt.query([]).context("Failed to execute query")?;
        let mut records = Vec::new();
        while let Some(row) = rows.next().context("Failed to read row")? {
            records.push(self.row_to_record(row)?);
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
    use chrono::Duration;

    fn create_test_store() -> SqliteIdentityStore {
        let key = BASE64.encode([0u8; 32]);
        SqliteIdentityStore::open(":memory:", &key).expect("Failed to create test store")
    }

    fn record(id: &str, access_token: &str) -> IdentityRecord {
        IdentityRecord {
            id: id.to_string(),
            token: TokenInfo {
                access_token: access_token.to_string(),
                refresh_token: Some("refresh-123".to_string()),
                expires_at: Some(Utc::now() + Duration::hours(1)),
                scope: Some("user-top-read".to_string()),
            },
            profile: Profile {
                id: id.to_string(),
                display_name: Some("Alex".to_string()),
                avatar_url: Some("https://img.example/alex.png".to_string()),
                profile_url: Some("https://music.example/user/alex".to_string()),
            },
        }
    }

    #[test]
    fn test_upsert_and_get() {
        let store = create_test_store();
        store.upsert(record("u42", "tok-a")).unwrap();

        let found = store.get("u42").unwrap().expect("record not found");
        assert_eq!(found.token.access_token, "tok-a");
        assert_eq!(found.token.refresh_token.as_deref(), Some("refresh-123"));
        assert!(found.token.expires_at.is_some());
        assert_eq!(found.profile.display_name.as_deref(), Some("Alex"));
    }

    #[test]
    fn test_get_unknown_id_is_none() {
        let store = create_test_store();
        assert!(store.get("unknown").unwrap().is_none());
    }

    #[test]
    fn test_reauth_overwrites_record() {
        let store = create_test_store();
        store.upsert(record("u42", "tok-a")).unwrap();

        let mut second = record("u42", "tok-b");
        second.profile.display_name = Some("Alexandra".to_string());
        store.upsert(second).unwrap();

        let found = store.get("u42").unwrap().unwrap();
        assert_eq!(found.token.access_token, "tok-b");
        assert_eq!(found.profile.display_name.as_deref(), Some("Alexandra"));
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_record_without_optional_fields() {
        let store = create_test_store();
        let rec = IdentityRecord {
            id: "u1".to_string(),
            token: TokenInfo {
                access_token: "only-access".to_string(),
                refresh_token: None,
                expires_at: None,
                scope: None,
            },
            profile: Profile {
                id: "u1".to_string(),
                display_name: None,
                avatar_url: None,
                profile_url: None,
            },
        };
        store.upsert(rec).unwrap();

        let found = store.get("u1").unwrap().unwrap();
        assert_eq!(found.token.access_token, "only-access");
        assert!(found.token.refresh_token.is_none());
        assert!(found.token.expires_at.is_none());
        assert!(found.profile.display_name.is_none());
    }

    #[test]
    fn test_list_ordered_by_id() {
        let store = create_test_store();
        store.upsert(record("u2", "tok-2")).unwrap();
        store.upsert(record("u1", "tok-1")).unwrap();

        let all = store.list().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, "u1");
        assert_eq!(all[1].id, "u2");
    }

    #[test]
    fn test_tokens_not_stored_in_plaintext() {
        let store = create_test_store();
        store.upsert(record("u42", "super-secret-token")).unwrap();

        let conn = store.conn.lock().unwrap();
        let stored: String = conn
            .query_row("SELECT access_token FROM identities WHERE id = 'u42'", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_ne!(stored, "super-secret-token");
        assert!(!stored.contains("super-secret"));
    }

    #[test]
    fn test_invalid_encryption_key() {
        assert!(SqliteIdentityStore::open(":memory:", "short").is_err());
        assert!(SqliteIdentityStore::open(":memory:", "!!not-base64!!").is_err());
    }
}
