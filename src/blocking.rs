//! Blocking facade over [`crate::Client`]
//!
//! Each call parks the current thread until the request completes. The
//! client owns a single-worker tokio runtime that drives the connection pool.
//!
//! Do not call these methods from inside an async context: use the async
//! [`crate::Client`] there instead. The same holds for dropping the last
//! clone of a client, which shuts its runtime down and panics if that
//! happens on a tokio worker thread. Move it into
//! `tokio::task::spawn_blocking` to drop it from async code.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::{Builder, Runtime};

use crate::config::ClientConfig;
use crate::error::{Error, Result};

/// Blocking HTTP client for the datastore service
///
/// # Example
///
/// ```rust,no_run
/// use datastore_client::blocking::Client;
///
/// fn main() -> Result<(), datastore_client::Error> {
///     let client = Client::new("127.0.0.1", 8080)?;
///     client.upsert("foo", "bar")?;
///     assert_eq!(client.get("foo")?, "bar");
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: crate::Client,
    runtime: Arc<Runtime>,
}

impl Client {
    /// Create a client for `host:port` with the default 2 second timeout
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self> {
        Self::with_config(ClientConfig::new(host, port))
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let inner = crate::Client::with_config(config)?;
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("datastore-client")
            .enable_all()
            .build()
            .map_err(Error::Runtime)?;

        Ok(Self {
            inner,
            runtime: Arc::new(runtime),
        })
    }

    /// Target host
    pub fn host(&self) -> &str {
        self.inner.host()
    }

    /// Target port
    pub fn port(&self) -> u16 {
        self.inner.port()
    }

    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        self.inner.timeout()
    }

    /// Full client configuration
    pub fn config(&self) -> &ClientConfig {
        self.inner.config()
    }

    /// See [`crate::Client::exists`]
    pub fn exists(&self, key: &str) -> Result<bool> {
        self.runtime.block_on(self.inner.exists(key))
    }

    /// See [`crate::Client::get`]
    pub fn get(&self, key: &str) -> Result<String> {
        self.runtime.block_on(self.inner.get(key))
    }

    /// See [`crate::Client::upsert`]
    pub fn upsert(&self, key: &str, value: &str) -> Result<()> {
        self.runtime.block_on(self.inner.upsert(key, value))
    }

    /// See [`crate::Client::wait_for_healthy`]
    pub fn wait_for_healthy(&self, retries: u32, delay_ms: u64) -> Result<()> {
        self.runtime.block_on(self.inner.wait_for_healthy(retries, delay_ms))
    }
}
