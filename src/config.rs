use dotenv::dotenv;
use once_cell::sync::Lazy;
use std::env;

#[derive(Debug)]
pub struct Config {
    pub log_level: String,
    pub rate_ttl_secs: u64,
    pub rate_fetch_timeout_ms: u64,
}

impl Config {
    fn from_env() -> Self {
        dotenv().ok();

        Self {
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            rate_ttl_secs: env::var("RATE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3600),
            rate_fetch_timeout_ms: env::var("RATE_FETCH_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5000),
        }
    }
}

// Global static accessible everywhere
pub static CONFIG: Lazy<Config> = Lazy::new(Config::from_env);
