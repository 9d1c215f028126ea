//! Configuration management

use crate::error::{ApiError, Result};
use reqwest::Url;
use std::path::PathBuf;
use std::time::Duration;

/// Default backend location (Django dev server)
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Default session cookie age in seconds (Django default: one day)
pub const DEFAULT_SESSION_COOKIE_AGE: u64 = 86_400;

/// Console configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the backend API
    pub api_url: Url,

    /// Max session age before the console forces a logout
    pub session_cookie_age: Duration,

    /// Per-request timeout (None = reqwest default)
    pub request_timeout: Option<Duration>,

    /// Where the session is persisted between runs
    pub session_file: PathBuf,
}

impl Config {
    /// Config pointing at `api_url` with defaults everywhere else
    pub fn new(api_url: &str) -> Result<Self> {
        Ok(Self {
            api_url: parse_base_url(api_url)?,
            session_cookie_age: Duration::from_secs(DEFAULT_SESSION_COOKIE_AGE),
            request_timeout: None,
            session_file: default_session_file(),
        })
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("LANGATE_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let mut config = Self::new(&api_url)?;

        if let Some(age) = lookup("LANGATE_SESSION_COOKIE_AGE") {
            let secs: u64 = age.trim().parse().map_err(|_| {
                ApiError::Config(format!("LANGATE_SESSION_COOKIE_AGE is not a number: {}", age))
            })?;
            config.session_cookie_age = Duration::from_secs(secs);
        }

        if let Some(timeout) = lookup("LANGATE_REQUEST_TIMEOUT") {
            let secs: u64 = timeout.trim().parse().map_err(|_| {
                ApiError::Config(format!("LANGATE_REQUEST_TIMEOUT is not a number: {}", timeout))
            })?;
            config.request_timeout = Some(Duration::from_secs(secs));
        }

        if let Some(path) = lookup("LANGATE_SESSION_FILE") {
            config.session_file = PathBuf::from(path);
        }

        Ok(config)
    }

    /// Absolute URL for an API path such as `/user/me/`
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.api_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::Config(format!("invalid endpoint {}: {}", path, e)))
    }
}

/// Parse a base URL, making sure it ends with `/` so joins keep its path
fn parse_base_url(raw: &str) -> Result<Url> {
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{}/", raw)
    };
    Url::parse(&normalized).map_err(|e| ApiError::Config(format!("invalid LANGATE_API_URL {}: {}", raw, e)))
}

fn default_session_file() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("langate")
        .join("session.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.api_url.as_str(), "http://localhost:8000/");
        assert_eq!(config.session_cookie_age, Duration::from_secs(86_400));
        assert!(config.request_timeout.is_none());
        assert!(config.session_file.ends_with("langate/session.json"));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("LANGATE_API_URL", "https://gate.lan/api"),
            ("LANGATE_SESSION_COOKIE_AGE", "3600"),
            ("LANGATE_REQUEST_TIMEOUT", "5"),
            ("LANGATE_SESSION_FILE", "/tmp/s.json"),
        ]))
        .unwrap();

        assert_eq!(config.session_cookie_age, Duration::from_secs(3600));
        assert_eq!(config.request_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.session_file, PathBuf::from("/tmp/s.json"));
        // Base path is kept when joining
        assert_eq!(
            config.endpoint("/user/me/").unwrap().as_str(),
            "https://gate.lan/api/user/me/"
        );
    }

    #[test]
    fn test_invalid_values() {
        assert!(Config::from_lookup(lookup(&[("LANGATE_SESSION_COOKIE_AGE", "soon")])).is_err());
        assert!(Config::from_lookup(lookup(&[("LANGATE_API_URL", "not a url")])).is_err());
    }
}
