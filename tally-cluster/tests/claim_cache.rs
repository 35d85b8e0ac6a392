//! Claim cache semantics with the real loader and stores, single node.

use std::sync::Arc;
use tally_cluster::{ClaimCache, HeaderNames, IncrLoader, PeerPool, PeerTransport};
use tally_core::config::LocalStoreConfig;
use tally_core::store::memory::MemoryRemoteStore;
use tally_core::{ClaimContext, ClaimKind, ClaimResponse, LocalStore, RemoteStore};
use tempfile::TempDir;

struct Fixture {
    cache: ClaimCache,
    local: Arc<LocalStore>,
    remote: Arc<MemoryRemoteStore>,
    _dir: TempDir,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().expect("temp dir");
    let config = LocalStoreConfig {
        dsn: Some(format!("file://{}/local.db", dir.path().display())),
        ..LocalStoreConfig::default()
    };
    let local = Arc::new(LocalStore::open(&config).expect("open local"));
    let remote = Arc::new(MemoryRemoteStore::new());
    let loader = Arc::new(IncrLoader::new(
        Arc::clone(&local),
        Arc::clone(&remote) as Arc<_>,
    ));
    let pool = Arc::new(PeerPool::new("http://localhost:8080", 50));
    let transport = PeerTransport::new("/_tally/", HeaderNames::default());
    let cache = ClaimCache::new("tally", pool, transport, loader, 1024);
    Fixture {
        cache,
        local,
        remote,
        _dir: dir,
    }
}

fn ctx(id: &str, kind: ClaimKind) -> ClaimContext {
    ClaimContext::new(id, kind)
}

#[tokio::test]
async fn first_writer_wins_until_eviction() {
    let fx = fixture();

    let first = ctx("srv-1", ClaimKind::Local);
    let raw = fx.cache.load_local(&first, "0:pub/x").await.expect("load");
    let resp = ClaimResponse::decode(&raw).expect("decode");
    assert!(resp.body().matches(&first, 0), "first prober claims");

    // A different context probing the same key gets the first writer's bytes
    // back and fails its claim test.
    let second = ctx("srv-2", ClaimKind::Local);
    let raw2 = fx.cache.load_local(&second, "0:pub/x").await.expect("load");
    assert_eq!(raw, raw2);
    let resp2 = ClaimResponse::decode(&raw2).expect("decode");
    assert!(!resp2.body().matches(&second, 0));
}

#[tokio::test]
async fn evicted_candidate_is_tombstoned_with_a_skip() {
    let fx = fixture();

    let winner = ctx("srv-1", ClaimKind::Local);
    fx.cache.load_local(&winner, "0:pub/x").await.expect("load");
    assert_eq!(fx.local.get("pub/x").as_deref(), Some("0"));

    fx.cache.clear();
    assert!(fx.cache.is_empty());

    // The re-populated entry must not let anyone re-claim 0: the loader
    // answers the new context with a skip past the stored value.
    let late = ctx("srv-1", ClaimKind::Local);
    let raw = fx.cache.load_local(&late, "0:pub/x").await.expect("load");
    let resp = ClaimResponse::decode(&raw).expect("decode");
    assert!(resp.body().matches(&late, 0));
    assert_eq!(resp.skip_to().expect("skip"), 1);
}

#[tokio::test]
async fn remote_probe_skips_past_durable_max() {
    let fx = fixture();
    fx.remote.set("pub/x", "99").expect("seed");

    let c = ctx("srv-2", ClaimKind::Remote);
    let raw = fx.cache.load_local(&c, "0:pub/x").await.expect("load");
    let resp = ClaimResponse::decode(&raw).expect("decode");
    assert!(resp.body().matches(&c, 0));
    assert_eq!(resp.skip_to().expect("skip"), 100);

    // The skip is advisory; the stale candidate never lands in either store.
    assert_eq!(fx.local.get("pub/x"), None);
    assert_eq!(fx.remote.get("pub/x").expect("get").as_deref(), Some("99"));
}

#[tokio::test]
async fn concurrent_probes_collapse_onto_one_entry() {
    let fx = Arc::new(fixture());

    let mut handles = Vec::new();
    for i in 0..16 {
        let fx = Arc::clone(&fx);
        handles.push(tokio::spawn(async move {
            let c = ctx(&format!("srv-{i}"), ClaimKind::Local);
            fx.cache.load_local(&c, "7:pub/y").await.expect("load")
        }));
    }

    let mut bodies = Vec::new();
    for handle in handles {
        bodies.push(handle.await.expect("join"));
    }

    // Every prober saw the same bytes, so exactly one of them claims.
    bodies.sort();
    bodies.dedup();
    assert_eq!(bodies.len(), 1, "entry was populated more than once");

    let winner = ClaimResponse::decode(&bodies[0]).expect("decode");
    assert_eq!(winner.body().number, "7");
    assert_eq!(fx.cache.len(), 1);
}

#[tokio::test]
async fn loader_errors_are_not_cached() {
    let fx = fixture();
    fx.local.set("pub/x", "garbage").expect("seed");

    let c = ctx("srv-1", ClaimKind::Local);
    let err = fx.cache.load_local(&c, "5:pub/x").await;
    assert!(err.is_err());
    assert!(fx.cache.is_empty(), "failed load must not populate the cache");

    // Once the corruption is repaired the same key loads cleanly.
    fx.local.set("pub/x", "4").expect("repair");
    let raw = fx.cache.load_local(&c, "5:pub/x").await.expect("load");
    let resp = ClaimResponse::decode(&raw).expect("decode");
    assert!(resp.body().matches(&c, 5));
}
