use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

const DEFAULT_FOOTBALL_DATA_URL: &str = "https://api.football-data.org/v4";
const DEFAULT_DATABASE_URL: &str = "sqlite:../data/football.db";

/// Process configuration, read once at start-up and handed to the pieces that need it.
#[derive(Debug, Clone)]
pub struct Config {
    pub football_data_url: String,
    pub football_data_token: Option<String>,
    pub database_url: String,
    pub port: u16,
    pub throttle: ThrottleConfig,
}

/// Spacing and retry settings for outbound football-data.org calls.
#[derive(Debug, Clone, Copy)]
pub struct ThrottleConfig {
    /// Minimum gap between the starts of two throttled calls.
    pub min_interval: Duration,
    /// Extra wait before the first throttled call of an import run.
    pub warmup: Duration,
    /// Total attempts for a request answered with 429.
    pub max_attempts: u32,
    /// Base of the exponential backoff between 429 retries.
    pub retry_backoff: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_millis(7000),
            warmup: Duration::from_millis(6000),
            max_attempts: 3,
            retry_backoff: Duration::from_millis(5000),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key/value source; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ThrottleConfig::default();

        let football_data_url = lookup("FOOTBALL_DATA_URL")
            .unwrap_or_else(|| DEFAULT_FOOTBALL_DATA_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let football_data_token = lookup("FOOTBALL_DATA_TOKEN").filter(|t| !t.trim().is_empty());

        let throttle = ThrottleConfig {
            min_interval: parse_millis(&lookup, "FOOTBALL_DATA_MIN_INTERVAL_MS", defaults.min_interval)?,
            warmup: parse_millis(&lookup, "FOOTBALL_DATA_WARMUP_MS", defaults.warmup)?,
            max_attempts: parse_or(&lookup, "FOOTBALL_DATA_MAX_ATTEMPTS", defaults.max_attempts)?.max(1),
            retry_backoff: parse_millis(&lookup, "FOOTBALL_DATA_RETRY_BACKOFF_MS", defaults.retry_backoff)?,
        };

        Ok(Self {
            football_data_url,
            football_data_token,
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            port: parse_or(&lookup, "PORT", 3000)?,
            throttle,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| Error::Config {
            key: key.to_string(),
            value: raw,
        }),
        None => Ok(default),
    }
}

fn parse_millis<F>(lookup: &F, key: &str, default: Duration) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let millis = parse_or(lookup, key, default.as_millis() as u64)?;
    Ok(Duration::from_millis(millis))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_apply_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.football_data_url, DEFAULT_FOOTBALL_DATA_URL);
        assert!(config.football_data_token.is_none());
        assert_eq!(config.port, 3000);
        assert_eq!(config.throttle.min_interval, Duration::from_millis(7000));
        assert_eq!(config.throttle.warmup, Duration::from_millis(6000));
        assert_eq!(config.throttle.max_attempts, 3);
    }

    #[test]
    fn test_overrides_and_trailing_slash() {
        let config = config_from(&[
            ("FOOTBALL_DATA_URL", "http://localhost:9000/v4/"),
            ("FOOTBALL_DATA_TOKEN", "abc"),
            ("FOOTBALL_DATA_MIN_INTERVAL_MS", "250"),
            ("PORT", "8080"),
        ])
        .unwrap();
        assert_eq!(config.football_data_url, "http://localhost:9000/v4");
        assert_eq!(config.football_data_token.as_deref(), Some("abc"));
        assert_eq!(config.throttle.min_interval, Duration::from_millis(250));
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_blank_token_is_treated_as_missing() {
        let config = config_from(&[("FOOTBALL_DATA_TOKEN", "  ")]).unwrap();
        assert!(config.football_data_token.is_none());
    }

    #[test]
    fn test_bad_number_names_the_variable() {
        let err = config_from(&[("FOOTBALL_DATA_WARMUP_MS", "soon")]).unwrap_err();
        assert!(err.to_string().contains("FOOTBALL_DATA_WARMUP_MS"));
    }
}
