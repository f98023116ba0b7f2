//! Basic usage example for the datastore client
//!
//! Run with: DATASTORE_HOST=127.0.0.1 DATASTORE_PORT=8080 cargo run --example basic_usage

use datastore_client::Client;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    let host = std::env::var("DATASTORE_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("DATASTORE_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    let client = Client::new(host, port)?;

    info!("Waiting for {}:{} to become healthy...", client.host(), client.port());
    client.wait_for_healthy(10, 500).await?;

    info!("Storing key 'example:hello'...");
    client.upsert("example:hello", "Hello, datastore!").await?;

    let value = client.get("example:hello").await?;
    info!("Retrieved: {}", value);

    let present = client.exists("example:missing").await?;
    info!("'example:missing' exists: {}", present);

    info!("Example completed successfully!");
    Ok(())
}
