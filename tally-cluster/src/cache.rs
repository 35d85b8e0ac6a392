//! The claim cache: LRU entries, owner election, and the load path.

use crate::error::{ClusterError, Result};
use crate::pool::PeerPool;
use crate::transport::PeerTransport;
use lru::LruCache;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tally_core::ClaimContext;

/// Default entry capacity before LRU eviction kicks in.
pub const DEFAULT_CAPACITY: usize = 1 << 20;

/// Populates a cache entry on miss. Evaluated only on the owner node, at most
/// once per live entry.
pub trait ClaimLoader: Send + Sync {
    /// Produce the response string for a key under the given context.
    fn load(&self, ctx: &ClaimContext, key: &str) -> tally_core::Result<String>;
}

/// The consistent-hash partitioned claim cache.
///
/// `get` resolves the owner of a key through the pool. Keys owned by a peer
/// are fetched over HTTP with the context tunnelled in headers; keys owned
/// locally go through the load path below.
///
/// The load path guarantees two properties the whole engine rests on:
///
/// - **once per entry**: concurrent misses for the same key collapse onto a
///   single loader run (per-key singleflight)
/// - **first writer wins**: an entry, once populated, is returned verbatim to
///   every later querier until eviction; a loser's freshly computed value is
///   discarded in favor of the entry that beat it in
pub struct ClaimCache {
    name: String,
    pool: Arc<PeerPool>,
    transport: PeerTransport,
    loader: Arc<dyn ClaimLoader>,
    entries: Mutex<LruCache<String, String>>,
    inflight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ClaimCache {
    /// Create a cache group.
    pub fn new(
        name: impl Into<String>,
        pool: Arc<PeerPool>,
        transport: PeerTransport,
        loader: Arc<dyn ClaimLoader>,
        capacity: usize,
    ) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .unwrap_or_else(|| NonZeroUsize::new(DEFAULT_CAPACITY).expect("nonzero"));
        Self {
            name: name.into(),
            pool,
            transport,
            loader,
            entries: Mutex::new(LruCache::new(capacity)),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// The group name, used as the path segment of the peer protocol.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolve a key to its authoritative response string.
    pub async fn get(&self, ctx: &ClaimContext, key: &str) -> Result<String> {
        if let Some(owner) = self.pool.owner_of(key) {
            match self.transport.fetch(&owner, &self.name, key, ctx).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    tracing::warn!(
                        owner = %owner,
                        key = %key,
                        error = %e,
                        "peer fetch failed, falling back to local load"
                    );
                }
            }
        }
        self.load_local(ctx, key).await
    }

    /// The owner-side load path: cache hit, or run the loader exactly once
    /// and publish its answer.
    ///
    /// Also invoked directly by the peer-protocol handler, which has already
    /// been elected owner by the querier's ring.
    pub async fn load_local(&self, ctx: &ClaimContext, key: &str) -> Result<String> {
        if let Some(hit) = self.entries.lock().get(key) {
            return Ok(hit.clone());
        }

        let gate = {
            let mut inflight = self.inflight.lock();
            Arc::clone(
                inflight
                    .entry(key.to_string())
                    .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
            )
        };
        let _guard = gate.lock().await;

        // A concurrent loader may have published while we waited on the gate.
        if let Some(hit) = self.entries.lock().get(key) {
            self.forget_inflight(key, &gate);
            return Ok(hit.clone());
        }

        let loaded = self.loader.load(ctx, key);
        let published = loaded.map(|value| {
            let mut entries = self.entries.lock();
            if let Some(existing) = entries.get(key) {
                // Lost the populate race; the earlier entry is authoritative.
                existing.clone()
            } else {
                entries.put(key.to_string(), value.clone());
                value
            }
        });
        self.forget_inflight(key, &gate);
        published.map_err(ClusterError::Loader)
    }

    /// Drop every cached entry. Owners will re-run the loader on the next
    /// probe of each key.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn forget_inflight(&self, key: &str, gate: &Arc<tokio::sync::Mutex<()>>) {
        let mut inflight = self.inflight.lock();
        if let Some(current) = inflight.get(key) {
            if Arc::ptr_eq(current, gate) {
                inflight.remove(key);
            }
        }
    }
}
