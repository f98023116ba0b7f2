//! HTTP client implementation for the datastore service

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{header, Method, Request, Response, StatusCode, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client as HttpClient;
use hyper_util::rt::TokioExecutor;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{Error, Result};

const TEXT_CONTENT_TYPE: &str = "text/plain";

/// Body the health endpoint returns once the service is ready
pub const HEALTHY_VALUE: &str = "healthy";

/// Async HTTP client for the datastore service
///
/// Cheap to clone; clones share the connection pool.
///
/// # Example
///
/// ```rust,no_run
/// use datastore_client::Client;
///
/// #[tokio::main]
/// async fn main() -> Result<(), datastore_client::Error> {
///     let client = Client::new("127.0.0.1", 8080)?;
///     client.wait_for_healthy(10, 500).await?;
///
///     client.upsert("foo", "bar").await?;
///     assert!(client.exists("foo").await?);
///     assert_eq!(client.get("foo").await?, "bar");
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Client {
    config: Arc<ClientConfig>,
    http_client: HttpClient<HttpConnector, Full<Bytes>>,
}

impl Client {
    /// Create a client for `host:port` with the default 2 second timeout
    ///
    /// No network I/O happens here.
    ///
    /// # Errors
    /// Returns an error if the host is empty
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self> {
        Self::with_config(ClientConfig::new(host, port))
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(config.timeout));
        connector.set_nodelay(true);

        let http_client = HttpClient::builder(TokioExecutor::new()).build(connector);

        Ok(Self {
            config: Arc::new(config),
            http_client,
        })
    }

    /// Target host
    pub fn host(&self) -> &str {
        &self.config.host
    }

    /// Target port
    pub fn port(&self) -> u16 {
        self.config.port
    }

    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    /// Full client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Check whether a key is present
    ///
    /// 200 means present, 404 means absent; any other status is an error.
    pub async fn exists(&self, key: &str) -> Result<bool> {
        let url = self.config.key_url(key);
        let deadline = self.deadline();
        let context = format!("An error occurred requesting data for key '{}'", key);

        let response = self
            .send(Method::GET, &url, None, deadline, &context)
            .await?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(unexpected_status(&url, status)),
        }
    }

    /// Fetch the value stored under a key
    ///
    /// A missing key surfaces as [`Error::UnexpectedStatus`] with status 404,
    /// a body that is not UTF-8 as [`Error::InvalidUtf8`].
    pub async fn get(&self, key: &str) -> Result<String> {
        let url = self.config.key_url(key);
        let deadline = self.deadline();
        let context = format!("An error occurred requesting data for key '{}'", key);

        let response = self
            .send(Method::GET, &url, None, deadline, &context)
            .await?;

        if response.status() != StatusCode::OK {
            return Err(unexpected_status(&url, response.status()));
        }

        let body = self.read_body(response, &url, deadline, &context).await?;
        String::from_utf8(body.to_vec()).map_err(|e| Error::InvalidUtf8 { url, source: e })
    }

    /// Store `value` under `key`, replacing any previous value
    ///
    /// Neither key nor value is escaped.
    pub async fn upsert(&self, key: &str, value: &str) -> Result<()> {
        let url = self.config.key_url(key);
        let deadline = self.deadline();
        let context = format!(
            "An error occurred requesting to upsert data '{}' to key '{}'",
            value, key
        );

        let response = self
            .send(
                Method::POST,
                &url,
                Some(Bytes::copy_from_slice(value.as_bytes())),
                deadline,
                &context,
            )
            .await?;

        match response.status() {
            StatusCode::OK => Ok(()),
            status => Err(unexpected_status(&url, status)),
        }
    }

    /// Poll the health endpoint until it answers 200, then check its body
    ///
    /// Makes at most `retries` attempts, sleeping `delay_ms` milliseconds
    /// between failed ones. A body other than `healthy` is reported once and
    /// not retried.
    ///
    /// # Errors
    /// - [`Error::InvalidConfig`] if `retries` is zero
    /// - [`Error::Unhealthy`] if every attempt failed
    /// - [`Error::BodyRead`] or [`Error::HealthMismatch`] for a bad 200 response
    pub async fn wait_for_healthy(&self, retries: u32, delay_ms: u64) -> Result<()> {
        if retries == 0 {
            return Err(Error::InvalidConfig(
                "retries must be at least 1".to_string(),
            ));
        }

        let url = self.config.health_url();
        let delay = Duration::from_millis(delay_ms);
        let mut attempt = 1;

        let (response, deadline) = loop {
            match self.probe_health(&url).await {
                Ok(ok) => break ok,
                Err(e) if attempt >= retries => {
                    warn!("Datastore at {} still unhealthy after {} attempt(s): {}", url, retries, e);
                    return Err(Error::Unhealthy {
                        url,
                        retries,
                        delay_ms,
                        source: Box::new(e),
                    });
                }
                Err(e) => {
                    debug!("Health check {}/{} against {} failed: {}", attempt, retries, url, e);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        };

        let context = format!("An error occurred reading the health response from '{}'", url);
        let body = self.read_body(response, &url, deadline, &context).await?;
        let body = String::from_utf8_lossy(&body);

        if body != HEALTHY_VALUE {
            return Err(Error::HealthMismatch {
                url,
                expected: HEALTHY_VALUE,
                actual: body.into_owned(),
            });
        }

        info!("Datastore at {} is healthy after {} attempt(s)", url, attempt);
        Ok(())
    }

    /// One health attempt: transport success and a 200 status
    async fn probe_health(&self, url: &str) -> Result<(Response<Incoming>, Instant)> {
        let deadline = self.deadline();
        let context = format!(
            "An HTTP error occurred when sending GET request to endpoint '{}'",
            url
        );

        let response = self.send(Method::GET, url, None, deadline, &context).await?;
        if response.status() != StatusCode::OK {
            return Err(unexpected_status(url, response.status()));
        }
        Ok((response, deadline))
    }

    fn deadline(&self) -> Instant {
        Instant::now() + self.config.timeout
    }

    /// Internal request method
    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<Bytes>,
        deadline: Instant,
        context: &str,
    ) -> Result<Response<Incoming>> {
        let uri: Uri = url.parse().map_err(|e| Error::InvalidUrl {
            url: url.to_string(),
            source: e,
        })?;

        let mut builder = Request::builder().method(method.clone()).uri(uri);
        let req = match body {
            Some(body) => {
                builder = builder.header(header::CONTENT_TYPE, TEXT_CONTENT_TYPE);
                builder.body(Full::new(body))
            }
            None => builder.body(Full::new(Bytes::new())),
        };
        let req = req.map_err(|e| {
            Error::InvalidConfig(format!("Failed to build request for '{}': {}", url, e))
        })?;

        debug!("Sending request: {} {}", method, url);

        let response = tokio::time::timeout_at(deadline, self.http_client.request(req))
            .await
            .map_err(|e| self.timeout_error(context, url, e))?
            .map_err(|e| Error::Transport {
                context: context.to_string(),
                source: e,
            })?;

        debug!("{} {} -> {}", method, url, response.status());
        Ok(response)
    }

    /// Read the whole response body before `deadline`
    async fn read_body(
        &self,
        response: Response<Incoming>,
        url: &str,
        deadline: Instant,
        context: &str,
    ) -> Result<Bytes> {
        let collected = tokio::time::timeout_at(deadline, response.into_body().collect())
            .await
            .map_err(|e| self.timeout_error(context, url, e))?
            .map_err(|e| Error::BodyRead {
                url: url.to_string(),
                source: e,
            })?;
        Ok(collected.to_bytes())
    }

    fn timeout_error(&self, context: &str, url: &str, elapsed: tokio::time::error::Elapsed) -> Error {
        Error::Timeout {
            context: context.to_string(),
            url: url.to_string(),
            timeout: self.config.timeout,
            source: elapsed,
        }
    }
}

fn unexpected_status(url: &str, status: StatusCode) -> Error {
    Error::UnexpectedStatus {
        url: url.to_string(),
        status: status.as_u16(),
    }
}
