//! Distributed claim cache for the tally counter service.
//!
//! Uniqueness across the cluster hinges on one serialization point: every
//! composite key `"<candidate>:<namespace>"` hashes to exactly one owner node,
//! and that owner's answer, computed once by the loader and cached, is
//! authoritative for everyone. This crate provides the pieces:
//!
//! - [`HashRing`]: consistent hashing with virtual replicas
//! - [`PeerPool`]: the atomically swappable pool membership
//! - [`ClaimCache`]: the LRU-cached, singleflight-guarded claim group
//! - [`IncrLoader`]: the loader evaluated by the owner on a cache miss
//! - [`PeerTransport`]: the HTTP client tunnelling claim contexts to owners

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod error;
pub mod loader;
pub mod pool;
pub mod ring;
pub mod transport;

pub use cache::{ClaimCache, ClaimLoader};
pub use error::{ClusterError, Result};
pub use loader::IncrLoader;
pub use pool::PeerPool;
pub use ring::HashRing;
pub use transport::{HeaderNames, PeerTransport};
