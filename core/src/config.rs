//! Client configuration.
//!
//! A `ClientConfig` is built once and handed to `PdfClient` and the
//! transport; nothing mutates it afterwards.

use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::environment::{BackendLocation, DEFAULT_BACKEND_PORT};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

pub const ENV_API_URL: &str = "PDFCASE_API_URL";
pub const ENV_HOSTNAME: &str = "PDFCASE_HOSTNAME";
pub const ENV_BACKEND_PORT: &str = "PDFCASE_BACKEND_PORT";
pub const ENV_TIMEOUT_SECS: &str = "PDFCASE_TIMEOUT_SECS";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a port number, got {value:?}")]
    InvalidPort { var: &'static str, value: String },
    #[error("{var} must be a whole number of seconds, got {value:?}")]
    InvalidTimeout { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    /// Sent with every request, after the body's own content type.
    pub default_headers: Vec<(String, String)>,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
            default_headers: vec![("accept".to_string(), "application/json".to_string())],
        }
    }

    /// Configuration for a page served from `hostname`.
    pub fn for_host(hostname: &str, location: &BackendLocation) -> Self {
        Self::new(&location.resolve(hostname))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.default_headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Read the process environment. See `from_lookup`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from `PDFCASE_*` variables.
    ///
    /// `PDFCASE_API_URL` wins outright. Otherwise the base URL is resolved
    /// from `PDFCASE_HOSTNAME` (default `localhost`) and
    /// `PDFCASE_BACKEND_PORT`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = match lookup(ENV_API_URL).filter(|url| !url.is_empty()) {
            Some(url) => url,
            None => {
                let hostname = lookup(ENV_HOSTNAME).unwrap_or_else(|| "localhost".to_string());
                let port = match lookup(ENV_BACKEND_PORT) {
                    Some(value) => value.parse::<u16>().map_err(|_| ConfigError::InvalidPort {
                        var: ENV_BACKEND_PORT,
                        value: value.clone(),
                    })?,
                    None => DEFAULT_BACKEND_PORT,
                };
                BackendLocation::with_port(port).resolve(&hostname)
            }
        };

        let timeout = match lookup(ENV_TIMEOUT_SECS) {
            Some(value) => {
                let secs = value
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidTimeout {
                        var: ENV_TIMEOUT_SECS,
                        value: value.clone(),
                    })?;
                Duration::from_secs(secs)
            }
            None => DEFAULT_TIMEOUT,
        };

        Ok(Self::new(&base_url).with_timeout(timeout))
    }
}
