use std::{env, fmt::Display, str::FromStr};

use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub delivery_fee_cents: i64,
    pub keepalive_secs: u64,
    pub menu_path: Option<String>,
    pub menu_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            delivery_fee_cents: 500,
            keepalive_secs: 30,
            menu_path: None,
            menu_url: None,
        }
    }
}

impl Config {
    pub fn load() -> Self {
        Self {
            port: try_load("RUST_PORT", "8080"),
            delivery_fee_cents: try_load("DELIVERY_FEE_CENTS", "500"),
            keepalive_secs: try_load("WS_KEEPALIVE_SECS", "30"),
            menu_path: var("MENU_PATH").ok(),
            menu_url: var("MENU_URL").ok(),
        }
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}
