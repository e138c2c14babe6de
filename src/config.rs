use crate::error::{MaError, Result};
use std::time::Duration;

pub const URL_ENV: &str = "MUSIC_ASSISTANT_URL";
pub const TOKEN_ENV: &str = "MUSIC_ASSISTANT_TOKEN";
pub const TIMEOUT_ENV: &str = "MUSIC_ASSISTANT_REQUEST_TIMEOUT_SECS";
pub const RETRIES_ENV: &str = "MUSIC_ASSISTANT_CONNECT_RETRIES";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_CONNECT_RETRIES: u32 = 3;

/// Connection settings for the Music Assistant server
#[derive(Debug, Clone)]
pub struct Config {
    /// Server URL as configured (http, https, ws or wss)
    pub url: String,
    /// Bearer token, required by servers with schema 28 and later
    pub token: Option<String>,
    /// Upper bound on a single request/response round trip
    pub request_timeout: Duration,
    /// Reconnection attempts before a `ConnectionError` is surfaced
    pub connect_retries: u32,
}

impl Config {
    pub fn new(url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            url: url.into(),
            token,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_retries: DEFAULT_CONNECT_RETRIES,
        }
    }

    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let url = lookup(URL_ENV)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                MaError::Config(format!(
                    "{} is not set. Point it at your Music Assistant server, e.g. http://192.168.1.10:8095",
                    URL_ENV
                ))
            })?;

        let token = lookup(TOKEN_ENV)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let mut config = Self::new(url, token);

        if let Some(raw) = lookup(TIMEOUT_ENV) {
            let secs: u64 = raw
                .trim()
                .parse()
                .map_err(|_| MaError::Config(format!("{} must be a whole number of seconds", TIMEOUT_ENV)))?;
            if secs == 0 {
                return Err(MaError::Config(format!("{} must be greater than zero", TIMEOUT_ENV)));
            }
            config.request_timeout = Duration::from_secs(secs);
        }

        if let Some(raw) = lookup(RETRIES_ENV) {
            config.connect_retries = raw
                .trim()
                .parse()
                .map_err(|_| MaError::Config(format!("{} must be a non-negative integer", RETRIES_ENV)))?;
        }

        Ok(config)
    }

    /// WebSocket endpoint derived from the configured URL
    pub fn ws_url(&self) -> String {
        let url = self.url.trim_end_matches('/');
        let url = if let Some(rest) = url.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = url.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else if url.starts_with("ws://") || url.starts_with("wss://") {
            url.to_string()
        } else {
            format!("ws://{}", url)
        };

        if url.ends_with("/ws") {
            url
        } else {
            format!("{}/ws", url)
        }
    }
}
