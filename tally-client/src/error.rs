//! Client error types.

use reqwest::StatusCode;
use thiserror::Error;

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors returned by the tally client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The base URL is not http(s).
    #[error("invalid base URL (want http:// or https://): {0}")]
    InvalidUrl(String),

    /// Transport-level failure.
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with something other than 200.
    #[error("unexpected status: {0}")]
    UnexpectedStatus(StatusCode),

    /// The response body was not a decimal number.
    #[error("parse response body: {0}")]
    Parse(#[from] std::num::ParseIntError),
}
