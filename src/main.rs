//! Wallet Gateway server
//!
//! ```text
//! ┌──────────┐    ┌──────────────┐    ┌──────────────┐    ┌────────────┐
//! │  Config  │───▶│ Session Gate │───▶│ Transfer/Auth│───▶│   Store    │
//! │  (YAML)  │    │ (JWT+Redis)  │    │   services   │    │ (Postgres) │
//! └──────────┘    └──────────────┘    └──────────────┘    └────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use wallet_gateway::config::{AppConfig, StorageBackend};
use wallet_gateway::db::Database;
use wallet_gateway::gateway::{self, state::AppState};
use wallet_gateway::logging::init_logging;
use wallet_gateway::store::{MemoryStore, PgStore, Store};
use wallet_gateway::user_auth::{
    MemorySessionStore, RedisSessionStore, RegistrationPolicy, SessionGate, SessionStore,
    TokenManager, UserAuthService,
};

#[derive(Parser, Debug)]
#[command(
    name = "wallet_gateway",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_ID"), ")"),
    about = "Wallet transfer HTTP gateway"
)]
struct Cli {
    /// Config profile, loaded from config/<env>.yaml
    #[arg(short, long, default_value = "dev")]
    env: String,

    /// Override gateway.port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(&cli.env)?;
    if let Some(port) = cli.port {
        config.gateway.port = port;
    }

    let _guard = init_logging(&config);
    tracing::info!(
        env = %cli.env,
        storage = ?config.storage,
        build = env!("BUILD_ID"),
        "Starting wallet gateway"
    );

    let store: Arc<dyn Store> = match config.storage {
        StorageBackend::Postgres => {
            let url = config
                .postgres_url
                .as_deref()
                .context("postgres_url is required for postgres storage")?;
            let db = Database::connect(url)
                .await
                .context("Failed to connect to PostgreSQL")?;
            db.migrate().await.context("Failed to apply migrations")?;
            Arc::new(PgStore::new(db.pool().clone()))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let session_timeout = config.jwt.session_timeout();
    let sessions: Arc<dyn SessionStore> = match &config.redis_url {
        Some(url) => Arc::new(
            RedisSessionStore::connect(url, session_timeout)
                .await
                .context("Failed to connect to Redis")?,
        ),
        None => {
            tracing::warn!("No redis_url configured; sessions are kept in-process");
            let local = Arc::new(MemorySessionStore::new(session_timeout));
            let sweeper = local.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(Duration::from_secs(60));
                loop {
                    ticker.tick().await;
                    let purged = sweeper.purge_expired();
                    if purged > 0 {
                        tracing::debug!(purged, "Expired sessions purged");
                    }
                }
            });
            local
        }
    };

    let tokens = TokenManager::new(&config.jwt.secret, config.jwt.access_lifetime());
    let user_auth = Arc::new(UserAuthService::new(
        store.clone(),
        tokens.clone(),
        sessions.clone(),
        RegistrationPolicy {
            initial_balance: config.wallet.initial_balance,
            password_min_len: config.password_min_len,
        },
    ));
    let gate = Arc::new(SessionGate::new(tokens, sessions));

    let state = Arc::new(AppState::new(
        store,
        user_auth,
        gate,
        config.wallet.recent_transactions_limit,
    ));

    gateway::run_server(&config.gateway.host, config.gateway.port, state).await
}
