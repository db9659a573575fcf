use std::env;

use anyhow::{Context, Result};

/// Runtime configuration, sourced from the environment. Every value has a
/// default suitable for local development; production deployments are
/// expected to override at least `SECRET_KEY` and `OPENAI_API_KEY`.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Signing key for access tokens (`SECRET_KEY`).
    pub secret_key: String,
    /// Token signing algorithm, HS256/HS384/HS512 (`TOKEN_ALGORITHM`).
    pub token_algorithm: String,
    /// Access token lifetime in minutes (`ACCESS_TOKEN_EXPIRE_MINUTES`).
    pub access_token_expire_minutes: i64,
    /// Path of the sqlite database file (`DATABASE_PATH`).
    pub database_path: String,
    /// Model used when an agent payload omits one (`DEFAULT_MODEL`).
    pub default_model: String,
    /// API key forwarded to the LLM provider (`OPENAI_API_KEY`).
    pub openai_api_key: String,
    /// Allowed CORS origins, comma-separated; `*` allows any (`CORS_ORIGINS`).
    pub cors_origins: Vec<String>,
    /// Listen address (`BIND_ADDR`).
    pub bind_addr: String,
    /// Seed the admin account and default tools at startup (`SEED_DB` set).
    pub seed_db: bool,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let access_token_expire_minutes = get("ACCESS_TOKEN_EXPIRE_MINUTES", "1440")
            .parse::<i64>()
            .context("ACCESS_TOKEN_EXPIRE_MINUTES must be an integer")?;

        let cors_origins = get("CORS_ORIGINS", "*")
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Self {
            secret_key: get("SECRET_KEY", "evolve_secret_key_change_in_production"),
            token_algorithm: get("TOKEN_ALGORITHM", "HS256"),
            access_token_expire_minutes,
            database_path: get("DATABASE_PATH", "evolve.db"),
            default_model: get("DEFAULT_MODEL", "gpt-3.5-turbo"),
            openai_api_key: get("OPENAI_API_KEY", ""),
            cors_origins,
            bind_addr: get("BIND_ADDR", "127.0.0.1:8000"),
            seed_db: lookup("SEED_DB").is_some(),
        })
    }

    pub fn allow_any_origin(&self) -> bool {
        self.cors_origins.iter().any(|origin| origin == "*")
    }
}
