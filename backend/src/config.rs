use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be a number, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub data_file: String,
    /// Zero saves on every write
    pub save_debounce: Duration,
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub cors_origins: Vec<String>,
    /// Photos travel as data URLs, so the default is generous
    pub max_body_bytes: usize,
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn number_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: var_or("HOST", "127.0.0.1"),
            port: number_or("PORT", 3000)?,
            data_file: var_or("DATA_FILE", "data.json"),
            save_debounce: Duration::from_millis(number_or("SAVE_DEBOUNCE_MS", 1000)?),
            jwt_secret: var_or("JWT_SECRET", "development-secret-key-change-in-production"),
            jwt_expiration_hours: number_or("JWT_EXPIRATION_HOURS", 24)?,
            cors_origins: var_or("CORS_ORIGINS", "http://localhost")
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
            max_body_bytes: number_or("MAX_BODY_BYTES", 10 * 1024 * 1024)?,
        })
    }
}
