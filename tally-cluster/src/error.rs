//! Error types for claim cache operations.

use thiserror::Error;

/// Result type for cluster operations.
pub type Result<T> = std::result::Result<T, ClusterError>;

/// Errors that can occur resolving a claim through the cache.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// The elected owner could not be reached.
    #[error("peer fetch {url}: {cause}")]
    PeerFetch {
        /// The URL that was queried.
        url: String,
        /// The underlying transport error.
        cause: String,
    },

    /// The elected owner answered with a non-success status.
    #[error("peer {url} returned status {status}")]
    PeerStatus {
        /// The URL that was queried.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The loader failed while populating an entry.
    #[error("loader: {0}")]
    Loader(#[from] tally_core::TallyError),
}
