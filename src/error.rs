//! Error types for the datastore client

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when talking to the datastore service
#[derive(Error, Debug)]
pub enum Error {
    /// Client settings or call arguments are unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The blocking runtime could not be started
    #[error("Failed to start client runtime: {0}")]
    Runtime(#[source] io::Error),

    /// Key or host produced a URL that is not a valid URI
    #[error("Invalid request URL '{url}': {source}")]
    InvalidUrl {
        /// The URL as built by the client
        url: String,
        /// Parse failure
        #[source]
        source: http::uri::InvalidUri,
    },

    /// Connection refused, DNS failure or a broken connection
    #[error("{context}: {source}")]
    Transport {
        /// What the client was doing, including key/value where relevant
        context: String,
        /// Underlying transport failure
        #[source]
        source: hyper_util::client::legacy::Error,
    },

    /// No complete response within the request timeout
    #[error("{context}: request to '{url}' timed out after {}ms", .timeout.as_millis())]
    Timeout {
        /// What the client was doing, including key/value where relevant
        context: String,
        /// Target URL
        url: String,
        /// Configured request timeout
        timeout: Duration,
        /// Elapsed deadline
        #[source]
        source: tokio::time::error::Elapsed,
    },

    /// The server answered with a status outside the expected set
    #[error("Got an unexpected HTTP status code {status} from '{url}'")]
    UnexpectedStatus {
        /// Target URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// Status was fine but the body could not be read
    #[error("Failed to read response body from '{url}': {source}")]
    BodyRead {
        /// Target URL
        url: String,
        /// Underlying body error
        #[source]
        source: hyper::Error,
    },

    /// Status was fine but the body is not valid UTF-8
    #[error("Response body from '{url}' is not valid UTF-8: {source}")]
    InvalidUtf8 {
        /// Target URL
        url: String,
        /// Decoding failure; the raw bytes are kept
        #[source]
        source: std::string::FromUtf8Error,
    },

    /// Health endpoint answered 200 with something other than the healthy marker
    #[error("Expected response body text '{expected}' from endpoint '{url}' but got '{actual}' instead")]
    HealthMismatch {
        /// Health endpoint URL
        url: String,
        /// Expected body text
        expected: &'static str,
        /// Body text actually received
        actual: String,
    },

    /// Every health probe failed
    #[error(
        "The HTTP endpoint '{url}' didn't return a success code, even after {retries} retries \
         with {delay_ms} milliseconds in between retries: {source}"
    )]
    Unhealthy {
        /// Health endpoint URL
        url: String,
        /// Number of attempts made
        retries: u32,
        /// Delay between attempts in milliseconds
        delay_ms: u64,
        /// Failure of the last attempt
        #[source]
        source: Box<Error>,
    },
}

/// Broad category of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad settings, bad arguments or runtime startup failure
    Config,
    /// The request could not be built
    InvalidRequest,
    /// Connection, DNS or timeout failure
    Transport,
    /// Status code outside the expected set
    UnexpectedStatus,
    /// Response body could not be read or decoded
    BodyRead,
    /// Health endpoint body did not match
    HealthMismatch,
    /// Health probes exhausted
    Unhealthy,
}

impl Error {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidConfig(_) | Error::Runtime(_) => ErrorKind::Config,
            Error::InvalidUrl { .. } => ErrorKind::InvalidRequest,
            Error::Transport { .. } | Error::Timeout { .. } => ErrorKind::Transport,
            Error::UnexpectedStatus { .. } => ErrorKind::UnexpectedStatus,
            Error::BodyRead { .. } | Error::InvalidUtf8 { .. } => ErrorKind::BodyRead,
            Error::HealthMismatch { .. } => ErrorKind::HealthMismatch,
            Error::Unhealthy { .. } => ErrorKind::Unhealthy,
        }
    }

    /// HTTP status behind this error, looking through exhausted health checks
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::UnexpectedStatus { status, .. } => Some(*status),
            Error::Unhealthy { source, .. } => source.status(),
            _ => None,
        }
    }

    /// True when the request hit its deadline
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::Timeout { .. } => true,
            Error::Unhealthy { source, .. } => source.is_timeout(),
            _ => false,
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;
