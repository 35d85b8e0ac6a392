//! Shared application state for the HTTP handlers.

use std::sync::Arc;
use tally_cluster::transport::normalize_base_path;
use tally_cluster::{ClaimCache, HeaderNames};
use tally_core::store::remote::RemoteStore;
use tally_core::{Config, LocalStore};

/// Everything a handler needs, shared across connections.
pub struct AppState {
    /// Opaque identifier of this node, unique per process.
    pub server_id: String,
    /// The node-local fast store.
    pub local: Arc<LocalStore>,
    /// The cluster-wide durable store.
    pub remote: Arc<dyn RemoteStore>,
    /// The claim cache.
    pub cache: Arc<ClaimCache>,
    /// Context header names for the peer protocol.
    pub headers: HeaderNames,
    /// Base path the peer protocol is mounted under.
    pub base_path: String,
    /// Healthcheck path.
    pub healthcheck_path: String,
    /// Public namespace prefix (no trailing slash).
    pub public_prefix: String,
    /// Host allow-list; empty accepts any host.
    pub domains: Vec<String>,
    /// Whether the node is ready to serve. True once the local store opened.
    pub can_serve: bool,
}

impl AppState {
    /// Assemble state from the node's components and configuration.
    pub fn new(
        server_id: impl Into<String>,
        local: Arc<LocalStore>,
        remote: Arc<dyn RemoteStore>,
        cache: Arc<ClaimCache>,
        config: &Config,
    ) -> Self {
        Self {
            server_id: server_id.into(),
            local,
            remote,
            cache,
            headers: HeaderNames::from(&config.cache.header),
            base_path: normalize_base_path(&config.cache.base_path),
            healthcheck_path: config.server.urls.healthcheck.clone(),
            public_prefix: config
                .server
                .api
                .public_prefix
                .trim_end_matches('/')
                .to_string(),
            domains: config.server.api.domains.clone(),
            can_serve: true,
        }
    }
}
