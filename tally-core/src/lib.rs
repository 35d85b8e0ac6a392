//! Core building blocks for the tally counter service.
//!
//! tally issues monotonically increasing, non-repeating 64-bit integers per
//! namespace, coordinated across a pool of peer nodes. This crate holds the
//! pieces that are independent of any transport:
//!
//! - **Stores**: the per-node [`LocalStore`] fast path and the cluster-wide
//!   [`RemoteStore`] capability with its driver registry
//! - **Contexts**: the claim request context and the wire-exact response
//!   encoding exchanged through the claim cache
//! - **Configuration**: the TOML schema the server binary loads at startup

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod store;

pub use config::Config;
pub use context::{ClaimContext, ClaimKind, ClaimResponse, ResponseBody};
pub use error::{Result, TallyError};
pub use store::local::LocalStore;
pub use store::remote::{RemoteStore, RemoteStoreRegistry};
pub use store::Shutdown;
