//! HTTP client for the datastore key-value service
//!
//! Wraps the service's small HTTP API:
//!
//! | Operation | Request | Success |
//! |---|---|---|
//! | [`Client::exists`] | `GET /key/{key}` | 200 → `true`, 404 → `false` |
//! | [`Client::get`] | `GET /key/{key}` | 200, body is the value |
//! | [`Client::upsert`] | `POST /key/{key}` (`text/plain`) | 200 |
//! | [`Client::wait_for_healthy`] | `GET /health`, retried | 200 with body `healthy` |
//!
//! Every request shares one timeout, 2 seconds by default. Status codes
//! outside the table map to [`Error::UnexpectedStatus`]; see [`ErrorKind`]
//! for the full taxonomy.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use datastore_client::Client;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), datastore_client::Error> {
//!     let client = Client::new("127.0.0.1", 8080)?;
//!     client.wait_for_healthy(5, 200).await?;
//!
//!     client.upsert("greeting", "hello").await?;
//!     println!("{}", client.get("greeting").await?);
//!     Ok(())
//! }
//! ```
//!
//! Synchronous callers use [`blocking::Client`], which has the same methods.

#![warn(missing_docs, rust_2018_idioms)]

pub mod blocking;
pub mod client;
pub mod config;
pub mod error;

pub use client::{Client, HEALTHY_VALUE};
pub use config::{ClientConfig, DEFAULT_TIMEOUT};
pub use error::{Error, ErrorKind, Result};
