use std::{env, fmt::Display, str::FromStr};

use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub media_root: String,
    pub secure_cookies: bool,
    pub request_timeout_secs: u64,
    pub page_size: i64,
}

impl Config {
    pub fn load() -> Self {
        Self {
            database_url: try_load("DATABASE_URL", "sqlite:data/foodgram.db"),
            bind_addr: try_load("BIND_ADDR", "0.0.0.0:3000"),
            media_root: try_load("MEDIA_ROOT", "data/media"),
            secure_cookies: try_load("SECURE_COOKIES", "false"),
            request_timeout_secs: try_load("REQUEST_TIMEOUT_SECS", "30"),
            page_size: try_load("PAGE_SIZE", "6"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            bind_addr: "127.0.0.1:3000".to_string(),
            media_root: "data/media".to_string(),
            secure_cookies: false,
            request_timeout_secs: 30,
            page_size: 6,
        }
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse().unwrap_or_else(|e| {
        warn!("Invalid {key} value {raw:?}: {e}, using default: {default}");
        default
            .parse()
            .unwrap_or_else(|_| panic!("default for {key} must parse"))
    })
}
