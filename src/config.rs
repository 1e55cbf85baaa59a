//! Runtime configuration from the environment (and `.env`).

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;
use thiserror::Error;

use crate::health::{DEFAULT_RETRY_DELAY, DEFAULT_TRIES};
use crate::net::DEFAULT_TIMEOUT;

const DEFAULT_API_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_STATE_DIR: &str = ".eco";
const DEFAULT_HEALTH_INTERVAL: Duration = Duration::from_secs(30);

/// A configuration value that could not be used.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A numeric variable did not parse.
    #[error("{var} must be a non-negative integer, got {value:?}")]
    InvalidNumber {
        /// Variable name.
        var: &'static str,
        /// Raw value.
        value: String,
    },

    /// The API base URL did not parse.
    #[error("ECO_API_BASE_URL is not a valid URL ({value:?}): {message}")]
    InvalidUrl {
        /// Raw value.
        value: String,
        /// Parser message.
        message: String,
    },
}

/// Settings for one run of the client.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL relative request paths resolve against.
    pub api_base_url: Url,
    /// Directory holding durable storage.
    pub state_dir: PathBuf,
    /// Per-request timeout.
    pub fetch_timeout: Duration,
    /// Attempts per health retry run.
    pub health_tries: u32,
    /// Pause between health attempts.
    pub health_retry_delay: Duration,
    /// Pause between background health runs.
    pub health_interval: Duration,
    /// Cassette to record HTTP interactions into.
    pub record_path: Option<PathBuf>,
    /// Cassette to replay HTTP interactions from.
    pub replay_path: Option<PathBuf>,
}

impl Config {
    /// Loads `.env` if present, then reads `ECO_*` variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an unusable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is normal.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Builds a config from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an unusable value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());

        let base = get("ECO_API_BASE_URL").unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let api_base_url = Url::parse(&base)
            .map_err(|e| ConfigError::InvalidUrl { value: base.clone(), message: e.to_string() })?;

        let millis = |var: &'static str, default: Duration| -> Result<Duration, ConfigError> {
            get(var).map_or(Ok(default), |value| {
                value
                    .trim()
                    .parse::<u64>()
                    .map(Duration::from_millis)
                    .map_err(|_| ConfigError::InvalidNumber { var, value })
            })
        };

        let health_tries = get("ECO_HEALTH_TRIES").map_or(Ok(DEFAULT_TRIES), |value| {
            value
                .trim()
                .parse::<u32>()
                .map_err(|_| ConfigError::InvalidNumber { var: "ECO_HEALTH_TRIES", value })
        })?;

        Ok(Self {
            api_base_url,
            state_dir: get("ECO_STATE_DIR")
                .map_or_else(|| PathBuf::from(DEFAULT_STATE_DIR), PathBuf::from),
            fetch_timeout: millis("ECO_FETCH_TIMEOUT_MS", DEFAULT_TIMEOUT)?,
            health_tries,
            health_retry_delay: millis("ECO_HEALTH_DELAY_MS", DEFAULT_RETRY_DELAY)?,
            health_interval: millis("ECO_HEALTH_INTERVAL_MS", DEFAULT_HEALTH_INTERVAL)?,
            record_path: get("ECO_RECORD").map(PathBuf::from),
            replay_path: get("ECO_REPLAY").map(PathBuf::from),
        })
    }

    /// Path of the durable storage file.
    #[must_use]
    pub fn durable_store_path(&self) -> PathBuf {
        self.state_dir.join("storage.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        Config::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn defaults_match_client_behaviour() {
        let config = config(&[]).unwrap();
        assert_eq!(config.api_base_url.as_str(), "http://localhost:3000/");
        assert_eq!(config.fetch_timeout, Duration::from_millis(5000));
        assert_eq!(config.health_tries, 2);
        assert_eq!(config.health_retry_delay, Duration::from_millis(800));
        assert_eq!(config.durable_store_path(), PathBuf::from(".eco/storage.json"));
        assert!(config.record_path.is_none());
    }

    #[test]
    fn overrides_are_read() {
        let config = config(&[
            ("ECO_API_BASE_URL", "https://eco.example"),
            ("ECO_FETCH_TIMEOUT_MS", "1500"),
            ("ECO_HEALTH_TRIES", "4"),
            ("ECO_REPLAY", "health.cassette.yaml"),
        ])
        .unwrap();
        assert_eq!(config.api_base_url.host_str(), Some("eco.example"));
        assert_eq!(config.fetch_timeout, Duration::from_millis(1500));
        assert_eq!(config.health_tries, 4);
        assert_eq!(config.replay_path, Some(PathBuf::from("health.cassette.yaml")));
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(matches!(
            config(&[("ECO_FETCH_TIMEOUT_MS", "soon")]),
            Err(ConfigError::InvalidNumber { var: "ECO_FETCH_TIMEOUT_MS", .. })
        ));
        assert!(matches!(
            config(&[("ECO_API_BASE_URL", "::")]),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }
}
