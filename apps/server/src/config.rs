use std::{net::SocketAddr, time::Duration};

use anyhow::Context;

pub struct Config {
    pub listen_addr: SocketAddr,
    pub db_path: String,
    pub cors_allow: Vec<String>,
    pub request_timeout: Duration,
    pub cache_ttl: Duration,
    pub refresh_interval: Duration,
    pub health_window: usize,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_number<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let listen_addr: SocketAddr = env_or("ADV_LISTEN_ADDR", "0.0.0.0:8080")
            .parse()
            .context("Invalid ADV_LISTEN_ADDR")?;
        let db_path = env_or("ADV_DB_PATH", "./db/advisory.db");
        let cors_allow = env_or("ADV_CORS_ALLOW_ORIGINS", "*")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            listen_addr,
            db_path,
            cors_allow,
            request_timeout: Duration::from_millis(env_number("ADV_REQUEST_TIMEOUT_MS", 30_000)),
            cache_ttl: Duration::from_secs(env_number("ADV_CACHE_TTL_SECS", 15 * 60)),
            refresh_interval: Duration::from_secs(env_number("ADV_REFRESH_INTERVAL_SECS", 30).max(1)),
            health_window: env_number("ADV_HEALTH_WINDOW", 50).max(1),
        })
    }
}
