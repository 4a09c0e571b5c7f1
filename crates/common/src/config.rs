use std::time::Duration;

use crate::{Error, Result};

/// Host settings loaded from environment variables at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // Candle feed
    pub candle_feed_path: String,
    pub candle_window: usize,

    // Strategy config file path
    pub strategy_config_path: String,

    // Scheduling
    pub cycle_interval: Duration,
    pub run_once: bool,

    // Learning
    pub auto_learn: bool,
}

impl Config {
    /// Load all configuration from environment variables.
    /// Loads `.env` if present. Fails on a missing required variable or an
    /// unparseable optional one.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        let cycle_interval_secs: u64 = parsed_env("CYCLE_INTERVAL_SECS", 60)?;
        if cycle_interval_secs == 0 {
            return Err(Error::Config(
                "CYCLE_INTERVAL_SECS must be greater than zero".to_string(),
            ));
        }

        Ok(Config {
            candle_feed_path: required_env("CANDLE_FEED_PATH")?,
            candle_window: parsed_env("CANDLE_WINDOW", 200)?,
            strategy_config_path: optional_env("STRATEGY_CONFIG_PATH")
                .unwrap_or_else(|| "config/strategy.toml".to_string()),
            cycle_interval: Duration::from_secs(cycle_interval_secs),
            run_once: flag_env("RUN_ONCE", false)?,
            auto_learn: flag_env("AUTO_LEARN", true)?,
        })
    }
}

fn required_env(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        Error::Config(format!(
            "Required environment variable '{key}' is not set. Check your .env file."
        ))
    })
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn parsed_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{key} has an invalid value: '{raw}'"))),
        None => Ok(default),
    }
}

fn flag_env(key: &str, default: bool) -> Result<bool> {
    match optional_env(key) {
        Some(raw) => parse_flag(&raw)
            .ok_or_else(|| Error::Config(format!("{key} must be true or false, got: '{raw}'"))),
        None => Ok(default),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
