use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::domains::auth::UserDirectory;
use crate::domains::contracts::{PollingConfig, StoreConfig};
use crate::kernel::StorageConfig;

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub token_expire_hours: i64,
    pub users: UserDirectory,
    pub mineru: MineruConfig,
    pub polling: PollingConfig,
    pub store: StoreConfig,
    pub storage: StorageConfig,
    pub http: HttpConfig,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone)]
pub struct MineruConfig {
    pub api_url: String,
    pub api_token: String,
    pub model_version: String,
    pub callback_url: Option<String>,
    pub seed: Option<String>,
    pub uid: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Empty means any origin
    pub allowed_origins: Vec<String>,
    /// Per-IP requests per second, 0 disables rate limiting
    pub rate_limit_per_second: u64,
    pub rate_limit_burst: u32,
    pub max_upload_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            rate_limit_per_second: 10,
            rate_limit_burst: 20,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(anyhow::anyhow!("Invalid log format: {}", s)),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let port: u16 = or("PORT", "8080")
            .parse()
            .context("PORT must be a valid number")?;
        let jwt_secret = var("JWT_SECRET").context("JWT_SECRET must be set")?;

        let users = UserDirectory::parse(&var("AUTH_USERS").unwrap_or_default())
            .context("AUTH_USERS must be a comma list of user:password:tenant")?;

        let mineru = MineruConfig {
            api_url: or("MINERU_API_URL", "https://mineru.net/api/v4"),
            api_token: var("MINERU_API_TOKEN").context("MINERU_API_TOKEN must be set")?,
            model_version: or("MINERU_MODEL_VERSION", "vlm"),
            callback_url: var("MINERU_CALLBACK_URL"),
            seed: var("MINERU_SEED"),
            uid: var("MINERU_UID"),
        };

        let polling = PollingConfig {
            interval: Duration::from_secs(
                or("MINERU_POLL_INTERVAL_SECS", "5")
                    .parse()
                    .context("MINERU_POLL_INTERVAL_SECS must be a valid number")?,
            ),
            max_attempts: or("MINERU_POLL_MAX_ATTEMPTS", "60")
                .parse()
                .context("MINERU_POLL_MAX_ATTEMPTS must be a valid number")?,
        };

        let store = StoreConfig::from_signed(
            or("MAX_CONTRACTS", "100")
                .parse()
                .context("MAX_CONTRACTS must be a valid number")?,
        );

        let url_expire_days: u64 = or("STORAGE_URL_EXPIRE_DAYS", "7")
            .parse()
            .context("STORAGE_URL_EXPIRE_DAYS must be a valid number")?;
        let storage = StorageConfig {
            root: PathBuf::from(or("STORAGE_ROOT", "./data/uploads")),
            public_url: var("STORAGE_PUBLIC_URL")
                .unwrap_or_else(|| format!("http://localhost:{}/files", port)),
            signing_key: var("STORAGE_SIGNING_KEY").unwrap_or_else(|| jwt_secret.clone()),
            url_ttl: Duration::from_secs(url_expire_days * 24 * 60 * 60),
        };

        let http = HttpConfig {
            allowed_origins: var("ALLOWED_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            rate_limit_per_second: or("RATE_LIMIT_PER_SECOND", "10")
                .parse()
                .context("RATE_LIMIT_PER_SECOND must be a valid number")?,
            rate_limit_burst: or("RATE_LIMIT_BURST", "20")
                .parse()
                .context("RATE_LIMIT_BURST must be a valid number")?,
            max_upload_bytes: match var("MAX_UPLOAD_BYTES") {
                Some(v) => v.parse().context("MAX_UPLOAD_BYTES must be a valid number")?,
                None => DEFAULT_MAX_UPLOAD_BYTES,
            },
        };

        Ok(Self {
            port,
            jwt_secret,
            jwt_issuer: or("JWT_ISSUER", "contractdiff"),
            token_expire_hours: or("TOKEN_EXPIRE_HOURS", "24")
                .parse()
                .context("TOKEN_EXPIRE_HOURS must be a valid number")?,
            users,
            mineru,
            polling,
            store,
            storage,
            http,
            log_format: or("LOG_FORMAT", "text").parse()?,
        })
    }
}
