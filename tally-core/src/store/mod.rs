//! Storage backends.
//!
//! Two tiers back the claim engine: a per-node [`local::LocalStore`] holding
//! the largest value the node has observed per namespace, and a cluster-wide
//! [`remote::RemoteStore`] capability holding the durable append-only log.

pub mod local;
pub mod memory;
pub mod remote;
pub mod sqlite;

use crate::error::Result;

/// Hook invoked during graceful shutdown, in registration order.
pub trait Shutdown: Send + Sync {
    /// Release resources. Errors are logged, never fatal.
    fn shutdown(&self) -> Result<()>;
}
