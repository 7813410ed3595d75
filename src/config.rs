//! Application configuration management.
//!
//! Configuration is loaded from environment variables with the `envy` crate,
//! after an optional `.env` file has been applied by `dotenvy`.

use std::time::Duration;

use serde::Deserialize;

use crate::auth::rate_limit::{DEFAULT_CAPACITY, DEFAULT_WINDOW};

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `RATE_LIMIT_CAPACITY` (optional): requests per key per window, defaults to 100
/// - `RATE_LIMIT_WINDOW_SECS` (optional): window length in seconds, defaults to 60
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_rate_limit_capacity")]
    pub rate_limit_capacity: u32,

    #[serde(default = "default_rate_limit_window_secs")]
    pub rate_limit_window_secs: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Env(#[from] envy::Error),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

fn default_port() -> u16 {
    3000
}

fn default_rate_limit_capacity() -> u32 {
    DEFAULT_CAPACITY
}

fn default_rate_limit_window_secs() -> u64 {
    DEFAULT_WINDOW.as_secs()
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL)
    /// - Environment variable values cannot be parsed into expected types
    /// - The rate limit capacity or window is zero
    pub fn from_env() -> Result<Self, ConfigError> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        Self::from_vars(std::env::vars())
    }

    fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config = envy::from_iter::<_, Config>(vars)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_limit_capacity == 0 {
            return Err(ConfigError::Zero("RATE_LIMIT_CAPACITY"));
        }
        if self.rate_limit_window_secs == 0 {
            return Err(ConfigError::Zero("RATE_LIMIT_WINDOW_SECS"));
        }
        Ok(())
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }
}
