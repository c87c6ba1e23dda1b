use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;
use tunedeck::api::{self, AppState};
use tunedeck::config::{load_config, DashboardConfig, Secrets};
use tunedeck::identity::{IdentityStore, SqliteIdentityStore};
use tunedeck::provider::{MusicProvider, SpotifyProvider};
use tunedeck::session::{run_session_sweeper, SessionRegistry};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tunedeck=info".into()),
        )
        .init();

    info!("tunedeck starting...");

    let config = load_configuration()?;
    let secrets = Secrets::from_env().context("Loading TUNEDECK_* environment")?;

    let store: Arc<dyn IdentityStore> = Arc::new(
        SqliteIdentityStore::open(&config.store.db_path, &secrets.encryption_key)
            .context("Opening identity store")?,
    );
    info!(path = %config.store.db_path, "Identity store ready");

    let sessions = SessionRegistry::new(chrono::Duration::minutes(config.session.ttl_minutes));
    tokio::spawn(run_session_sweeper(
        sessions.clone(),
        config.session.cleanup_interval_seconds,
    ));

    let provider: Arc<dyn MusicProvider> = Arc::new(
        SpotifyProvider::new(
            &secrets.client_id,
            &secrets.client_secret,
            &secrets.redirect_uri,
            std::time::Duration::from_secs(config.upstream.timeout_seconds),
        )
        .context("Building provider client")?,
    );

    let state = AppState {
        store,
        sessions,
        provider,
        cookie_key: api::cookie_key_from_base64(&secrets.cookie_key)
            .context("Deriving cookie key")?,
        cookie_name: config.session.cookie_name.clone(),
        session_ttl_minutes: config.session.ttl_minutes,
    };

    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Binding {}", config.server.bind_addr))?;
    info!(addr = %config.server.bind_addr, "tunedeck listening");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

/// Load the TOML config named by `TUNEDECK_CONFIG` (default
/// `tunedeck.toml`); a missing file means defaults.
fn load_configuration() -> Result<DashboardConfig> {
    let path = std::env::var("TUNEDECK_CONFIG").unwrap_or_else(|_| "tunedeck.toml".to_string());

    if std::path::Path::new(&path).exists() {
        info!(path = %path, "Loading configuration");
        load_config(&path)
    } else {
        info!(path = %path, "No config file, using defaults");
        Ok(DashboardConfig::default())
    }
}
