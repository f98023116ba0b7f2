//! Connection settings for the datastore client

use std::time::Duration;

use crate::error::{Error, Result};

/// Default per-request timeout.
///
/// Kept low so that tests injecting network failures (partitions, dead
/// servers) fail fast instead of hanging.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

const KEY_ENDPOINT: &str = "key";
const HEALTH_ENDPOINT: &str = "health";

/// Configuration options for the datastore client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Host name or IP address of the datastore service
    pub host: String,
    /// TCP port of the datastore service
    pub port: u16,
    /// Deadline for a whole request: connect, headers and body (default: 2s)
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8080,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Configuration for `host:port` with the default timeout
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Override the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check that the settings can produce a working client
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::InvalidConfig("host must not be empty".to_string()));
        }
        if self.timeout.is_zero() {
            return Err(Error::InvalidConfig("timeout must be greater than zero".to_string()));
        }
        Ok(())
    }

    /// `http://host:port`, with IPv6 literals bracketed
    pub fn base_url(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("http://[{}]:{}", self.host, self.port)
        } else {
            format!("http://{}:{}", self.host, self.port)
        }
    }

    /// URL addressing a single key. The key is inserted as-is.
    pub fn key_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.base_url(), KEY_ENDPOINT, key)
    }

    /// URL of the health endpoint
    pub fn health_url(&self) -> String {
        format!("{}/{}", self.base_url(), HEALTH_ENDPOINT)
    }
}
