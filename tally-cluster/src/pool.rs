//! Pool membership and owner election.

use crate::ring::HashRing;
use parking_lot::RwLock;
use std::sync::Arc;

/// Replica counts below this skew the ring distribution noticeably.
pub const MIN_REPLICAS: usize = 30;

/// The set of peers sharing the claim cache, including this node.
///
/// Membership is rebuilt atomically on updates; readers may briefly observe
/// the previous ring, which is safe because consistent hashing is stable
/// under small perturbations.
pub struct PeerPool {
    self_url: String,
    replicas: usize,
    ring: RwLock<Arc<HashRing>>,
}

impl PeerPool {
    /// Create a pool with no peers; every key is owned locally until
    /// [`PeerPool::set_peers`] is called.
    pub fn new(self_url: impl Into<String>, replicas: usize) -> Self {
        if replicas < MIN_REPLICAS {
            tracing::warn!(
                replicas,
                "pool replicas set low, should be about 50 or above"
            );
        }
        Self {
            self_url: self_url.into(),
            replicas,
            ring: RwLock::new(Arc::new(HashRing::new(replicas, Vec::new()))),
        }
    }

    /// This node's reachable URL.
    pub fn self_url(&self) -> &str {
        &self.self_url
    }

    /// Replace the membership list, rebuilding the ring atomically.
    pub fn set_peers(&self, peers: Vec<String>) {
        let ring = Arc::new(HashRing::new(self.replicas, peers));
        *self.ring.write() = ring;
    }

    /// Current membership list.
    pub fn peers(&self) -> Vec<String> {
        self.ring.read().nodes().to_vec()
    }

    /// The peer owning a key, or `None` when this node owns it (which
    /// includes the empty pool).
    pub fn owner_of(&self, key: &str) -> Option<String> {
        let ring = Arc::clone(&self.ring.read());
        match ring.node_for(key) {
            Some(node) if node != self.self_url => Some(node.to_string()),
            _ => None,
        }
    }
}
