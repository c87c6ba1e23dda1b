//! In-process identity store.
//!
//! Backs the store contract with a plain map. Replaces the module-level
//! global mapping of earlier revisions: it is constructed explicitly and
//! injected, so tests and the SQLite backing are interchangeable.

use super::{IdentityRecord, IdentityStore};
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Mutex;

/// Identity store backed by an in-memory map.
///
/// Records are whole-record replaced under one lock, so readers never
/// observe a half-updated token/profile pair.
#[derive(Default)]
pub struct MemoryIdentityStore {
    records: Mutex<HashMap<String, IdentityRecord>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdentityStore for MemoryIdentityStore {
    fn upsert(&self, record: IdentityRecord) -> Result<()> {
        let mut records = self.records.lock().unwrap();
        records.insert(record.id.clone(), record);
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<IdentityRecord>> {
        let records = self.records.lock().unwrap();
        Ok(records.get(id).cloned())
    }

    fn list(&self) -> Result<Vec<IdentityRecord>> {
        let records = self.records.lock().unwrap();
        Ok(records.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{Profile, TokenInfo};

    fn record(id: &str, access_token: &str, display_name: &str) -> IdentityRecord {
        IdentityRecord {
            id: id.to_string(),
            token: TokenInfo {
                access_token: access_token.to_string(),
                refresh_token: Some(format!("{}-refresh", access_token)),
                expires_at: None,
                scope: Some("user-top-read".to_string()),
            },
            profile: Profile {
                id: id.to_string(),
                display_name: Some(display_name.to_string()),
                avatar_url: None,
                profile_url: None,
            },
        }
    }

    #[test]
    fn test_upsert_and_get() {
        let store = MemoryIdentityStore::new();
        store.upsert(record("u1", "tok-1", "Alice")).unwrap();

        let found = store.get("u1").unwrap().expect("record not found");
        assert_eq!(found.token.access_token, "tok-1");
        assert_eq!(found.profile.display_name.as_deref(), Some("Alice"));
    }

    #[test]
    fn test_last_write_wins() {
        let store = MemoryIdentityStore::new();
        store.upsert(record("u1", "tok-1", "Alice")).unwrap();
        store.upsert(record("u1", "tok-2", "Alicia")).unwrap();

        // Second upsert replaces the whole record, no merging
        let found = store.get("u1").unwrap().unwrap();
        assert_eq!(found.token.access_token, "tok-2");
        assert_eq!(found.profile.display_name.as_deref(), Some("Alicia"));
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_get_unknown_id_is_none() {
        let store = MemoryIdentityStore::new();
        assert!(store.get("nobody").unwrap().is_none());
    }

    #[test]
    fn test_list_enumerates_all() {
        let store = MemoryIdentityStore::new();
        store.upsert(record("u1", "tok-1", "Alice")).unwrap();
        store.upsert(record("u2", "tok-2", "Bob")).unwrap();

        let all = store.list().unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().any(|r| r.id == "u1"));
        assert!(all.iter().any(|r| r.id == "u2"));
    }
}
