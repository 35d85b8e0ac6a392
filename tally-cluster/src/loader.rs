//! The claim loader: what the owner computes when a key misses the cache.
//!
//! The first context to reach the owner for `"<candidate>:<namespace>"` gets
//! its identity baked into the entry. Whoever later decodes the entry and
//! finds their own context in it has claimed the candidate; everyone else
//! advances. Remote-kind probes additionally consult the durable store and
//! are answered with a skip grant when the cluster has already moved past the
//! candidate.

use crate::cache::ClaimLoader;
use tally_core::context::{encode_local, encode_remote};
use tally_core::store::local::LocalStore;
use tally_core::store::remote::RemoteStore;
use tally_core::{ClaimContext, ClaimKind, Result, TallyError};
use std::sync::Arc;

/// Split a claim key into `(candidate, namespace)` at the first `:`.
pub fn split_claim_key(key: &str) -> Result<(&str, &str)> {
    key.split_once(':')
        .filter(|(candidate, ns)| !candidate.is_empty() && !ns.is_empty())
        .ok_or_else(|| TallyError::ClaimKey(key.to_string()))
}

/// Loader wiring the claim protocol to the two stores.
pub struct IncrLoader {
    local: Arc<LocalStore>,
    remote: Arc<dyn RemoteStore>,
}

impl IncrLoader {
    /// Build a loader over the node's stores.
    pub fn new(local: Arc<LocalStore>, remote: Arc<dyn RemoteStore>) -> Self {
        Self { local, remote }
    }

    /// Answer a local-increment conflict with a skip grant.
    ///
    /// The candidate is at or below what this node has already seen for the
    /// namespace, so it must never be issued again (the entry guarding it may
    /// have been evicted). Echo the context with a jump past the stored
    /// value: the requester's claim test succeeds, it takes the skip, and the
    /// entry tombstones the candidate for every later querier. Nothing was
    /// issued, so neither store is written.
    fn conflict_skip(&self, ctx: &ClaimContext, candidate: &str, ns: &str) -> Result<String> {
        let stored = self.local.get(ns).unwrap_or_default();
        let stored: u64 = stored.parse()?;
        Ok(encode_remote(ctx, candidate, stored.saturating_add(1)))
    }
}

impl ClaimLoader for IncrLoader {
    fn load(&self, ctx: &ClaimContext, key: &str) -> Result<String> {
        let (candidate, ns) = split_claim_key(key)?;

        if ctx.kind == ClaimKind::Remote {
            if let Some(value) = self.remote.get(ns)? {
                let rem: u64 = value.parse()?;
                let cand: u64 = candidate.parse()?;
                if rem > cand {
                    // The durable log is already past this candidate. Answer
                    // with the jump and touch neither store: writing the
                    // stale candidate locally would hand concurrent requests
                    // on this node a low starting value on the fast path.
                    return Ok(encode_remote(ctx, candidate, rem.saturating_add(1)));
                }
            }
        }

        match self.local.incr(ns, candidate) {
            Ok(()) => {}
            Err(TallyError::NumberNotIncremented) => {
                return self.conflict_skip(ctx, candidate, ns);
            }
            Err(e) => return Err(e),
        }
        self.remote.set(ns, candidate)?;
        Ok(encode_local(ctx, candidate))
    }
}
