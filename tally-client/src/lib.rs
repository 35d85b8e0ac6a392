//! Client for the tally counter service.
//!
//! # Example
//!
//! ```no_run
//! use tally_client::Client;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::new("http://localhost:8080")?;
//! let next = client.next("orders").await?;
//! println!("claimed {next}");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;

pub use error::{ClientError, Result};

use reqwest::StatusCode;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A client for one tally server (or a load-balanced pool of them).
#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    http: reqwest::Client,
}

impl Client {
    /// Create a client for a server base URL, e.g. `http://localhost:8080`.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ClientError::InvalidUrl(base_url));
        }

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Claim the next number in a namespace.
    ///
    /// The namespace is the path under `/pub/`, e.g. `"orders"` or
    /// `"orders/eu"`.
    pub async fn next(&self, namespace: &str) -> Result<u64> {
        let url = format!(
            "{}/pub/{}",
            self.base_url,
            namespace.trim_start_matches('/')
        );
        let response = self.http.get(&url).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(ClientError::UnexpectedStatus(status));
        }

        let body = response.text().await?;
        body.trim().parse().map_err(ClientError::Parse)
    }

    /// Whether the server reports itself healthy.
    pub async fn healthy(&self) -> Result<bool> {
        let url = format!("{}/.healthcheck", self.base_url);
        let response = self.http.get(&url).send().await?;
        Ok(response.status() == StatusCode::OK)
    }
}
