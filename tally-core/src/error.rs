//! Error types for the tally engine.
//!
//! The variants map onto the error taxonomy the HTTP edge exposes: validation
//! problems become 400s, probe-window exhaustion becomes a retryable 400,
//! store corruption and I/O become 500s. [`TallyError::NumberNotIncremented`]
//! never reaches a client; it is the internal "lost the race for this
//! candidate" signal.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for tally operations.
pub type Result<T> = std::result::Result<T, TallyError>;

/// The main error type for tally operations.
#[derive(Debug, Error)]
pub enum TallyError {
    /// A candidate value was not strictly greater than the stored value.
    #[error("the number was not incremented")]
    NumberNotIncremented,

    /// The probe window was exhausted without claiming a number.
    #[error("exhausted max number increments")]
    MaxIncrementRange,

    /// A skip response carried no target value.
    #[error("nil skip value")]
    SkipNilValue,

    /// A stored or submitted value did not parse as an unsigned 64-bit integer.
    #[error("parse counter value: {0}")]
    ParseValue(#[from] std::num::ParseIntError),

    /// A claim cache key was not of the form `<candidate>:<namespace>`.
    #[error("malformed claim key: {0}")]
    ClaimKey(String),

    /// Failed to decode a claim response from the cache.
    #[error("decode claim response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The claim cache could not produce an answer.
    #[error("claim cache: {0}")]
    Cache(String),

    /// Backing store error (SQLite).
    #[error("store: {0}")]
    Store(#[from] rusqlite::Error),

    /// Filesystem error against a store path.
    #[error("io at {path:?}: {source}")]
    Io {
        /// The path the operation touched.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Invalid or missing configuration.
    #[error("config: {0}")]
    Config(String),
}

impl TallyError {
    /// Whether this error is the internal lost-the-race signal from
    /// [`LocalStore::incr`](crate::store::local::LocalStore::incr).
    pub fn is_not_incremented(&self) -> bool {
        matches!(self, TallyError::NumberNotIncremented)
    }
}
