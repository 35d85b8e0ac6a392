//! The cluster-wide durable store capability and its driver registry.

use crate::config::{DatastoreConfig, RemoteDriverConfig};
use crate::error::{Result, TallyError};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Cluster-wide durable log of issued values, keyed by namespace.
///
/// Implementations log every claim; the maximum is computed at read time, so
/// `set` is append-only and never moves a value backwards. Writes from
/// different nodes interleave freely; durability is the backing store's
/// responsibility.
pub trait RemoteStore: Send + Sync {
    /// The largest acknowledged value for a namespace, or `None` when the
    /// namespace has never been written.
    fn get(&self, ns: &str) -> Result<Option<String>>;

    /// Append a claimed value for a namespace.
    fn set(&self, ns: &str, value: &str) -> Result<()>;

    /// Enumerate known namespaces, refreshing the membership set behind
    /// [`RemoteStore::has_key`]. May be expensive; called only when a
    /// namespace is not known locally.
    fn keys(&self) -> Result<Vec<String>>;

    /// Cheap membership check against the set last refreshed by
    /// [`RemoteStore::keys`].
    fn has_key(&self, ns: &str) -> bool;
}

/// Constructor for one remote store driver.
pub type RemoteStoreBuilder = fn(&RemoteDriverConfig) -> Result<Arc<dyn RemoteStore>>;

/// Explicit driver registry, built at startup from configuration.
///
/// Driver selection follows `datastore.use_remote_db`; when unset, the sole
/// registered driver wins, or the first in lexical order when several are
/// registered.
pub struct RemoteStoreRegistry {
    builders: BTreeMap<String, RemoteStoreBuilder>,
}

impl RemoteStoreRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            builders: BTreeMap::new(),
        }
    }

    /// A registry with the bundled drivers (`memory`, `sqlite`) registered.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register("memory", crate::store::memory::build);
        registry.register("sqlite", crate::store::sqlite::build);
        registry
    }

    /// Register a driver under an identifier, replacing any existing one.
    pub fn register(&mut self, name: impl Into<String>, builder: RemoteStoreBuilder) {
        self.builders.insert(name.into(), builder);
    }

    /// Registered driver identifiers, in lexical order.
    pub fn names(&self) -> Vec<&str> {
        self.builders.keys().map(String::as_str).collect()
    }

    /// Select and construct the configured driver.
    pub fn build(&self, config: &DatastoreConfig) -> Result<(String, Arc<dyn RemoteStore>)> {
        let name = match config.use_remote_db.as_deref().filter(|s| !s.is_empty()) {
            Some(name) => name.to_string(),
            None => match self.builders.len() {
                0 => return Err(TallyError::Config("no remote store registered".into())),
                _ => self
                    .builders
                    .keys()
                    .next()
                    .expect("non-empty registry")
                    .clone(),
            },
        };

        let builder = self.builders.get(&name).ok_or_else(|| {
            TallyError::Config(format!("no remote store registered by the name: {name}"))
        })?;

        let driver_config = config.remote.get(&name).cloned().unwrap_or_default();
        let store = builder(&driver_config)?;
        Ok((name, store))
    }
}

impl Default for RemoteStoreRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn builtin_registry_lists_drivers() {
        let registry = RemoteStoreRegistry::with_builtin();
        assert_eq!(registry.names(), vec!["memory", "sqlite"]);
    }

    #[test]
    fn unset_selection_takes_first_lexical() {
        let registry = RemoteStoreRegistry::with_builtin();
        let config = Config::parse("").expect("parse");
        let (name, _store) = registry.build(&config.datastore).expect("build");
        assert_eq!(name, "memory");
    }

    #[test]
    fn explicit_selection_wins() {
        let registry = RemoteStoreRegistry::with_builtin();
        let dir = tempfile::TempDir::new().expect("temp dir");
        let raw = format!(
            r#"
            [datastore]
            use_remote_db = "sqlite"
            [datastore.remote.sqlite]
            dsn = "file://{}/remote.db"
            "#,
            dir.path().display()
        );
        let config = Config::parse(&raw).expect("parse");
        let (name, _store) = registry.build(&config.datastore).expect("build");
        assert_eq!(name, "sqlite");
    }

    #[test]
    fn unknown_selection_is_rejected() {
        let registry = RemoteStoreRegistry::with_builtin();
        let config = Config::parse("[datastore]\nuse_remote_db = \"mysql\"").expect("parse");
        assert!(registry.build(&config.datastore).is_err());
    }

    #[test]
    fn empty_registry_is_rejected() {
        let registry = RemoteStoreRegistry::new();
        let config = Config::parse("").expect("parse");
        assert!(registry.build(&config.datastore).is_err());
    }
}
