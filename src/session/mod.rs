//! Browser session registry.
//!
//! Associates an opaque session id (carried in an encrypted cookie) with
//! one identity id. The registry answers "who does this session claim to
//! be" only; whether that identity still exists in the store is the
//! caller's concern. Bindings expire after a configurable TTL and a
//! background task sweeps the dead ones.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

mod cookies;

pub use cookies::{clear_session_cookie, session_cookie};

/// One session → identity binding.
#[derive(Clone, Debug)]
struct Binding {
    user_id: String,
    created_at: DateTime<Utc>,
}

/// Session registry with automatic expiration.
#[derive(Clone)]
pub struct SessionRegistry {
    bindings: Arc<Mutex<HashMap<String, Binding>>>,
    ttl: Duration,
}

/// Mint a fresh opaque session id.
pub fn mint_session_id() -> String {
    Uuid::new_v4().to_string()
}

impl SessionRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            bindings: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Bind a session to an identity, overwriting any prior binding.
    /// A session holds at most one identity at a time.
    pub fn bind(&self, session_id: &str, user_id: &str) {
        let mut bindings = self.bindings.lock().unwrap();
        bindings.insert(
            session_id.to_string(),
            Binding {
                user_id: user_id.to_string(),
                created_at: Utc::now(),
            },
        );
    }

    /// Clear a session's binding. Safe to call when nothing is bound.
    pub fn unbind(&self, session_id: &str) {
        let mut bindings = self.bindings.lock().unwrap();
        bindings.remove(session_id);
    }

    /// The bound identity id, or `None` when unbound or expired.
    ///
    /// Does NOT validate that the identity still exists in the store.
    pub fn current(&self, session_id: &str) -> Option<String> {
        let mut bindings = self.bindings.lock().unwrap();

        let binding = bindings.get(session_id)?.clone();
        if Utc::now() - binding.created_at > self.ttl {
            bindings.remove(session_id);
            return None;
        }

        Some(binding.user_id)
    }

    /// Drop expired bindings (called periodically).
    pub fn sweep_expired(&self) {
        let mut bindings = self.bindings.lock().unwrap();
        let now = Utc::now();

        bindings.retain(|_, binding| now - binding.created_at <= self.ttl);
    }

    /// Number of live bindings (for monitoring).
    pub fn count(&self) -> usize {
        self.bindings.lock().unwrap().len()
    }
}

/// Background task to periodically sweep expired session bindings.
pub async fn run_session_sweeper(registry: SessionRegistry, interval_seconds: u64) {
    let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(interval_seconds));

    loop {
        interval.tick().await;
        registry.sweep_expired();
        tracing::debug!("Session sweep complete, {} bindings remaining", registry.count());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_and_current() {
        let registry = SessionRegistry::new(Duration::minutes(10));

        registry.bind("s1", "u1");
        assert_eq!(registry.current("s1").as_deref(), Some("u1"));
    }

    #[test]
    fn test_unbound_session_is_none() {
        let registry = SessionRegistry::new(Duration::minutes(10));
        assert!(registry.current("never-seen").is_none());
    }

    #[test]
    fn test_second_login_overwrites_binding() {
        let registry = SessionRegistry::new(Duration::minutes(10));

        registry.bind("s1", "u1");
        registry.bind("s1", "u2");

        // Overwrite, not merge
        assert_eq!(registry.current("s1").as_deref(), Some("u2"));
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_unbind_is_idempotent() {
        let registry = SessionRegistry::new(Duration::minutes(10));

        registry.bind("s1", "u1");
        registry.unbind("s1");
        assert!(registry.current("s1").is_none());

        // Nothing bound - still fine
        registry.unbind("s1");
        assert!(registry.current("s1").is_none());
    }

    #[test]
    fn test_sessions_are_independent() {
        let registry = SessionRegistry::new(Duration::minutes(10));

        registry.bind("s1", "u1");
        registry.bind("s2", "u1");
        registry.unbind("s1");

        // Logging out one browser leaves the other session intact
        assert!(registry.current("s1").is_none());
        assert_eq!(registry.current("s2").as_deref(), Some("u1"));
    }

    #[test]
    fn test_expired_binding_reads_none() {
        let registry = SessionRegistry::new(Duration::zero());

        registry.bind("s1", "u1");
        std::thread::sleep(std::time::Duration::from_millis(20));

        assert!(registry.current("s1").is_none());
    }

    #[test]
    fn test_sweep_removes_expired() {
        let registry = SessionRegistry::new(Duration::zero());

        registry.bind("s1", "u1");
        registry.bind("s2", "u2");
        assert_eq!(registry.count(), 2);

        std::thread::sleep(std::time::Duration::from_millis(20));
        registry.sweep_expired();
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn test_minted_ids_are_unique() {
        assert_ne!(mint_session_id(), mint_session_id());
    }
}
