use anyhow::{Context, Result};
use serde::Deserialize;

/// Complete tunedeck configuration, loaded from a TOML file.
///
/// Every section has sensible defaults so a missing or partial file
/// still yields a runnable development setup. Secrets (OAuth client
/// credentials, encryption keys) never live in the file; see [`Secrets`].
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_bind_addr() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

/// Identity store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite database file
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

fn default_db_path() -> String {
    "tunedeck.db".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

/// Browser session configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Name of the session cookie
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// How long a session binding stays valid (minutes)
    #[serde(default = "default_session_ttl")]
    pub ttl_minutes: i64,
    /// How often expired bindings are swept (seconds)
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_seconds: u64,
}

fn default_cookie_name() -> String {
    "tunedeck_session".to_string()
}

fn default_session_ttl() -> i64 {
    7 * 24 * 60
}

fn default_cleanup_interval() -> u64 {
    300
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            ttl_minutes: default_session_ttl(),
            cleanup_interval_seconds: default_cleanup_interval(),
        }
    }
}

/// Upstream music API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    /// Request timeout for OAuth and Web API calls (seconds).
    /// The provider is outside our control; a hung call must not
    /// pin a worker indefinitely.
    #[serde(default = "default_upstream_timeout")]
    pub timeout_seconds: u64,
}

fn default_upstream_timeout() -> u64 {
    10
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_upstream_timeout(),
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            store: StoreConfig::default(),
            session: SessionConfig::default(),
            upstream: UpstreamConfig::default(),
        }
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &str) -> Result<DashboardConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path))?;
    let config: DashboardConfig =
        toml::from_str(&contents).with_context(|| format!("Failed to parse {}", path))?;
    Ok(config)
}

/// Secrets loaded from the environment.
///
/// * `TUNEDECK_CLIENT_ID` / `TUNEDECK_CLIENT_SECRET` - OAuth client credentials
/// * `TUNEDECK_REDIRECT_URI` - callback URL registered with the provider
/// * `TUNEDECK_ENCRYPTION_KEY` - base64 32-byte key for tokens at rest
/// * `TUNEDECK_COOKIE_KEY` - base64 key material (>= 32 bytes) for the
///   private session cookie
#[derive(Clone)]
pub struct Secrets {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub encryption_key: String,
    pub cookie_key: String,
}

impl Secrets {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            client_id: require_env("TUNEDECK_CLIENT_ID")?,
            client_secret: require_env("TUNEDECK_CLIENT_SECRET")?,
            redirect_uri: require_env("TUNEDECK_REDIRECT_URI")?,
            encryption_key: require_env("TUNEDECK_ENCRYPTION_KEY")?,
            cookie_key: require_env("TUNEDECK_COOKIE_KEY")?,
        })
    }
}

fn require_env(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("Missing environment variable {}", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DashboardConfig::default();
        assert_eq!(config.server.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.store.db_path, "tunedeck.db");
        assert_eq!(config.session.cookie_name, "tunedeck_session");
        assert_eq!(config.session.ttl_minutes, 7 * 24 * 60);
        assert_eq!(config.upstream.timeout_seconds, 10);
    }

    #[test]
    fn test_config_deserialization() {
        let toml = r#"
            [server]
            bind_addr = "0.0.0.0:9000"

            [store]
            db_path = "/var/lib/tunedeck/identities.db"

            [session]
            cookie_name = "td_sess"
            ttl_minutes = 60
            cleanup_interval_seconds = 30

            [upstream]
            timeout_seconds = 5
        "#;

        let config: DashboardConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.server.bind_addr, "0.0.0.0:9000");
        assert_eq!(config.store.db_path, "/var/lib/tunedeck/identities.db");
        assert_eq!(config.session.cookie_name, "td_sess");
        assert_eq!(config.session.ttl_minutes, 60);
        assert_eq!(config.session.cleanup_interval_seconds, 30);
        assert_eq!(config.upstream.timeout_seconds, 5);
    }

    #[test]
    fn test_partial_config() {
        // Missing sections fall back to defaults
        let toml = r#"
            [session]
            ttl_minutes = 15
        "#;

        let config: DashboardConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.session.ttl_minutes, 15);
        assert_eq!(config.session.cookie_name, "tunedeck_session"); // Default
        assert_eq!(config.server.bind_addr, "127.0.0.1:8080"); // Default
        assert_eq!(config.upstream.timeout_seconds, 10); // Default
    }
}
