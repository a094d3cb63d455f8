use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Duration;

/// Server settings read from `PANTRY_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    pub token_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let jwt_secret = var("PANTRY_JWT_SECRET", "dev-secret-change-me");
        let db_path = PathBuf::from(var("PANTRY_DB_PATH", "pantry.db"));
        let host = var("PANTRY_HOST", "0.0.0.0");
        let port: u16 = var("PANTRY_PORT", "3000")
            .parse()
            .context("PANTRY_PORT must be a port number")?;
        let ttl_days: i64 = var("PANTRY_TOKEN_TTL_DAYS", "30")
            .parse()
            .context("PANTRY_TOKEN_TTL_DAYS must be a whole number of days")?;
        if ttl_days <= 0 {
            anyhow::bail!("PANTRY_TOKEN_TTL_DAYS must be at least 1, got {}", ttl_days);
        }
        let token_ttl = Duration::try_days(ttl_days)
            .with_context(|| format!("PANTRY_TOKEN_TTL_DAYS {} is out of range", ttl_days))?;

        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", host, port))?;

        Ok(Self {
            jwt_secret,
            db_path,
            addr,
            token_ttl,
        })
    }
}
