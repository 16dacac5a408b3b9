use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// `None` runs the service on the in-memory store.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub session_ttl_hours: i64,
    pub media_root: PathBuf,
    pub page_size: usize,
    pub index_cache_ttl_secs: u64,
    pub index_cache_capacity: u64,
    pub login_url: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".into());
        let port = parse_var("PORT", 8080)?;
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());
        if database_url.is_none() {
            warn!("DATABASE_URL not set, data will live in process memory only");
        }
        let jwt_secret =
            std::env::var("JWT_SECRET").map_err(|_| anyhow::anyhow!("JWT_SECRET must be set"))?;
        let media_root = std::env::var("MEDIA_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("media"));
        let page_size: usize = parse_var("PAGE_SIZE", 10)?;
        if page_size == 0 {
            anyhow::bail!("invalid PAGE_SIZE: must be positive");
        }

        Ok(Self {
            host,
            port,
            database_url,
            database_max_connections: parse_var("DATABASE_MAX_CONNECTIONS", 20)?,
            jwt_secret,
            session_ttl_hours: parse_var("SESSION_TTL_HOURS", 24)?,
            media_root,
            page_size,
            index_cache_ttl_secs: parse_var("INDEX_CACHE_TTL_SECS", 20)?,
            index_cache_capacity: parse_var("INDEX_CACHE_CAPACITY", 1000)?,
            login_url: std::env::var("LOGIN_URL").unwrap_or_else(|_| "/auth/login/".into()),
        })
    }
}

fn parse_var<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {}: {}", key, e)),
        Err(_) => Ok(default),
    }
}
