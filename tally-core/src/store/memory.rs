//! In-memory remote store driver, for tests and single-node development.

use crate::config::RemoteDriverConfig;
use crate::error::Result;
use crate::store::remote::RemoteStore;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Registry builder for the `memory` driver.
pub fn build(_config: &RemoteDriverConfig) -> Result<Arc<dyn RemoteStore>> {
    Ok(Arc::new(MemoryRemoteStore::new()))
}

/// Append-only remote store held entirely in process memory.
///
/// Matches the durable drivers' semantics, including the detail that
/// `has_key` only reflects namespaces seen by the last `keys` refresh.
#[derive(Default)]
pub struct MemoryRemoteStore {
    rows: RwLock<HashMap<String, Vec<u64>>>,
    known: RwLock<HashSet<String>>,
}

impl MemoryRemoteStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RemoteStore for MemoryRemoteStore {
    fn get(&self, ns: &str) -> Result<Option<String>> {
        let rows = self.rows.read();
        Ok(rows
            .get(ns)
            .and_then(|values| values.iter().max())
            .map(|max| max.to_string()))
    }

    fn set(&self, ns: &str, value: &str) -> Result<()> {
        let parsed: u64 = value.parse()?;
        self.rows
            .write()
            .entry(ns.to_string())
            .or_default()
            .push(parsed);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let out: Vec<String> = self.rows.read().keys().cloned().collect();
        let mut known = self.known.write();
        for ns in &out {
            known.insert(ns.clone());
        }
        Ok(out)
    }

    fn has_key(&self, ns: &str) -> bool {
        self.known.read().contains(ns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_wins() {
        let store = MemoryRemoteStore::new();
        store.set("pub/a", "4").expect("set");
        store.set("pub/a", "1").expect("set");
        assert_eq!(store.get("pub/a").expect("get").as_deref(), Some("4"));
    }

    #[test]
    fn has_key_requires_refresh() {
        let store = MemoryRemoteStore::new();
        store.set("pub/a", "0").expect("set");
        assert!(!store.has_key("pub/a"));
        store.keys().expect("keys");
        assert!(store.has_key("pub/a"));
    }

    #[test]
    fn non_numeric_value_is_rejected() {
        let store = MemoryRemoteStore::new();
        assert!(store.set("pub/a", "zero").is_err());
    }
}
