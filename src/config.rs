use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

use crate::money::Money;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub storage: StorageBackend,
    /// Required when `storage: postgres`
    #[serde(default)]
    pub postgres_url: Option<String>,
    /// Sessions stay in-process when unset
    #[serde(default)]
    pub redis_url: Option<String>,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
    #[serde(default = "default_password_min_len")]
    pub password_min_len: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    Memory,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtConfig {
    pub secret: String,
    #[serde(default = "default_access_expiration_hours")]
    pub access_expiration_hours: i64,
    /// Idle timeout of the sliding session
    #[serde(default = "default_session_timeout_minutes")]
    pub session_timeout_minutes: u64,
}

impl JwtConfig {
    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_minutes * 60)
    }

    pub fn access_lifetime(&self) -> chrono::Duration {
        chrono::Duration::hours(self.access_expiration_hours)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WalletConfig {
    /// Balance seeded into every new wallet, e.g. "1000.00"
    pub initial_balance: Money,
    pub recent_transactions_limit: u32,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            initial_balance: Money::from_major(1000),
            recent_transactions_limit: 50,
        }
    }
}

fn default_password_min_len() -> usize {
    8
}

fn default_access_expiration_hours() -> i64 {
    24
}

fn default_session_timeout_minutes() -> u64 {
    15
}

impl AppConfig {
    /// Load `config/<env>.yaml`, then apply environment overrides.
    pub fn load(env: &str) -> Result<Self> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path))?;
        let mut config = Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config yaml: {}", config_path))?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// `DATABASE_URL`, `REDIS_URL`, `JWT_SECRET`, `SESSION_TIMEOUT_MINUTES`,
    /// `GATEWAY_PORT`
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            self.postgres_url = Some(url);
        }
        if let Some(url) = lookup("REDIS_URL") {
            self.redis_url = Some(url);
        }
        if let Some(secret) = lookup("JWT_SECRET") {
            self.jwt.secret = secret;
        }
        if let Some(minutes) = lookup("SESSION_TIMEOUT_MINUTES") {
            self.jwt.session_timeout_minutes = minutes
                .parse()
                .with_context(|| format!("Invalid SESSION_TIMEOUT_MINUTES: {minutes}"))?;
        }
        if let Some(port) = lookup("GATEWAY_PORT") {
            self.gateway.port = port
                .parse()
                .with_context(|| format!("Invalid GATEWAY_PORT: {port}"))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.jwt.secret.trim().is_empty() {
            bail!("jwt.secret must not be empty (set JWT_SECRET)");
        }
        if self.jwt.session_timeout_minutes == 0 {
            bail!("jwt.session_timeout_minutes must be positive");
        }
        if self.wallet.initial_balance.is_negative() {
            bail!("wallet.initial_balance must not be negative");
        }
        if self.storage == StorageBackend::Postgres && self.postgres_url.is_none() {
            bail!("postgres_url is required for postgres storage (set DATABASE_URL)");
        }
        Ok(())
    }
}
