//! The tally server: HTTP edge and claim coordinator.
//!
//! Request flow: HTTP handler → [`coordinator`] → (local store, remote store,
//! claim cache) → HTTP response. The coordinator is the only per-request
//! state; the stores and the cache are shared and concurrency-safe, so there
//! is no per-namespace lock anywhere; serialization is delegated entirely to
//! the claim cache owner of each probed key.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod coordinator;

pub use api::server::ApiServer;
pub use api::state::AppState;

/// Cache group name; appears as the path segment of the peer protocol.
pub const GROUP_NAME: &str = "tally";
