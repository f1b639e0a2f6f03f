use std::{str::FromStr, time::Duration};

use hive_client::Session;
use thiserror::Error;

const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/api";
const DEFAULT_PAGE_LIMIT: u32 = 9;
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub api_url: String,
    pub api_token: Option<String>,
    pub page_limit: u32,
    pub request_timeout: Duration,
}

impl Config {
    /// Reads `HIVE_*` variables. Call `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_url = lookup("HIVE_API_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_token = lookup("HIVE_API_TOKEN").filter(|v| !v.trim().is_empty());
        let page_limit: u32 = parse(&lookup, "HIVE_PAGE_LIMIT", DEFAULT_PAGE_LIMIT)?;
        if page_limit == 0 {
            return Err(ConfigError::Invalid {
                key: "HIVE_PAGE_LIMIT",
                value: "0".to_string(),
            });
        }
        let timeout_secs: u64 = parse(&lookup, "HIVE_REQUEST_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        Ok(Self {
            api_url,
            api_token,
            page_limit,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn session(&self) -> Session {
        let session = Session::new(&self.api_url).with_timeout(self.request_timeout);
        match &self.api_token {
            Some(token) => session.with_token(token),
            None => session,
        }
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}
