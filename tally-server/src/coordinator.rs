//! The per-request claim state machine.
//!
//! A request walks candidates upward through the claim cache until one of
//! them echoes its own context back: `Start → Probe → (advance | Skip |
//! Claim) → Done | Fail`. Mismatched echoes advance by one; skip grants
//! restart the window at the granted value; a full window without a claim
//! fails with [`TallyError::MaxIncrementRange`].
//!
//! Kind selection per probe: `remote` when the namespace is known to the
//! cluster but this node holds no local value (a joining or recovered node
//! must catch up through the durable log), and on the final probe of a
//! window (a request that has been unlucky for the whole window consults the
//! durable log once before giving up). Everything else probes `local`.
//!
//! Dropping the request future cancels the walk between probes; partial
//! loader writes are idempotent monotonic increments, so stores stay
//! consistent.

use crate::api::state::AppState;
use tally_cluster::ClusterError;
use tally_core::{ClaimContext, ClaimKind, ClaimResponse, Result, TallyError};

/// Candidates probed per window before giving up.
pub const MAX_PROBES: u64 = 10_000;

/// Issue the next number for a namespace.
pub async fn next_number(state: &AppState, ns: &str) -> Result<u64> {
    let local_bytes = state.local.get(ns);

    let mut has_key = false;
    if local_bytes.is_none() {
        has_key = state.remote.has_key(ns);
        if !has_key {
            // Pull the full key list before concluding the namespace is new;
            // old namespaces may predate this node's membership snapshot.
            state.remote.keys()?;
            has_key = state.remote.has_key(ns);
        }
    }

    let mut idx: u64 = 0;
    if let Some(bytes) = &local_bytes {
        idx = bytes.parse()?;
        has_key = true;
    }

    'window: loop {
        let max = idx.saturating_add(MAX_PROBES);
        while idx < max {
            let kind = if (has_key && local_bytes.is_none()) || idx + 1 == max {
                ClaimKind::Remote
            } else {
                ClaimKind::Local
            };
            let ctx = ClaimContext::new(&state.server_id, kind);
            let key = format!("{idx}:{ns}");

            let raw = state
                .cache
                .get(&ctx, &key)
                .await
                .map_err(flatten_cluster_error)?;
            let resp = ClaimResponse::decode(&raw)?;

            if resp.body().matches(&ctx, idx) {
                if resp.is_skip() {
                    // Owner says the cluster is already past this candidate.
                    idx = resp.skip_to()?;
                    continue 'window;
                }
                return Ok(idx);
            }

            // Someone else owns this candidate.
            idx += 1;
        }
        return Err(TallyError::MaxIncrementRange);
    }
}

/// Keep loader error kinds intact; transport problems become opaque cache
/// errors (the edge maps both to 500).
fn flatten_cluster_error(e: ClusterError) -> TallyError {
    match e {
        ClusterError::Loader(inner) => inner,
        other => TallyError::Cache(other.to_string()),
    }
}
