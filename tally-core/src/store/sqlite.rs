//! SQLite-backed remote store driver.
//!
//! Reference implementation of the [`RemoteStore`] capability: an append-only
//! `keys` table where the effective value of a namespace is `MAX(value)`.
//! Deployments that want a network database swap this driver for one speaking
//! to their SQL backend; the schema is the contract.

use crate::config::{parse_file_dsn, RemoteDriverConfig};
use crate::error::{Result, TallyError};
use crate::store::remote::RemoteStore;
use parking_lot::{Mutex, RwLock};
use rusqlite::{Connection, OptionalExtension};
use std::collections::HashSet;
use std::sync::Arc;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS keys (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    namespace TEXT NOT NULL,
    value     INTEGER NOT NULL,
    created   TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS ns_idx ON keys (namespace);
";

/// Registry builder for the `sqlite` driver.
pub fn build(config: &RemoteDriverConfig) -> Result<Arc<dyn RemoteStore>> {
    Ok(Arc::new(SqliteRemoteStore::open(config)?))
}

/// Append-only remote store backed by a SQLite file.
pub struct SqliteRemoteStore {
    conn: Mutex<Connection>,
    known: RwLock<HashSet<String>>,
}

impl SqliteRemoteStore {
    /// Open the store at the configured `file://` DSN.
    pub fn open(config: &RemoteDriverConfig) -> Result<Self> {
        let dsn = config
            .dsn
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| TallyError::Config("remote sqlite driver needs a dsn".into()))?;
        let path = parse_file_dsn(dsn)?;

        let conn = Connection::open(&path)?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
            known: RwLock::new(HashSet::new()),
        })
    }
}

impl RemoteStore for SqliteRemoteStore {
    fn get(&self, ns: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        let max = conn
            .query_row(
                "SELECT MAX(value) FROM keys WHERE namespace = ?1",
                [ns],
                |row| row.get::<_, Option<i64>>(0),
            )
            .optional()?
            .flatten();
        Ok(max.map(|v| v.to_string()))
    }

    fn set(&self, ns: &str, value: &str) -> Result<()> {
        let parsed: u64 = value.parse()?;
        let stored = i64::try_from(parsed)
            .map_err(|_| TallyError::Config(format!("value out of range: {value}")))?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO keys (namespace, value, created) VALUES (?1, ?2, datetime('now'))",
            rusqlite::params![ns, stored],
        )?;
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let out = {
            let conn = self.conn.lock();
            let mut stmt = conn.prepare("SELECT DISTINCT namespace FROM keys")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            rows.collect::<std::result::Result<Vec<_>, _>>()?
        };

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
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> SqliteRemoteStore {
        let config = RemoteDriverConfig {
            dsn: Some(format!("file://{}/remote.db", dir.path().display())),
        };
        SqliteRemoteStore::open(&config).expect("open store")
    }

    #[test]
    fn missing_dsn_is_rejected() {
        assert!(SqliteRemoteStore::open(&RemoteDriverConfig::default()).is_err());
    }

    #[test]
    fn get_returns_running_max() {
        let dir = TempDir::new().expect("temp dir");
        let store = store(&dir);
        assert_eq!(store.get("pub/a").expect("get"), None);

        store.set("pub/a", "3").expect("set");
        store.set("pub/a", "9").expect("set");
        store.set("pub/a", "5").expect("set");
        assert_eq!(store.get("pub/a").expect("get").as_deref(), Some("9"));
    }

    #[test]
    fn has_key_requires_refresh() {
        let dir = TempDir::new().expect("temp dir");
        let store = store(&dir);
        store.set("pub/a", "0").expect("set");

        // Membership is only as fresh as the last keys() call.
        assert!(!store.has_key("pub/a"));
        let keys = store.keys().expect("keys");
        assert_eq!(keys, vec!["pub/a".to_string()]);
        assert!(store.has_key("pub/a"));
        assert!(!store.has_key("pub/b"));
    }

    #[test]
    fn namespaces_are_independent() {
        let dir = TempDir::new().expect("temp dir");
        let store = store(&dir);
        store.set("pub/a", "7").expect("set");
        store.set("pub/b", "2").expect("set");
        assert_eq!(store.get("pub/a").expect("get").as_deref(), Some("7"));
        assert_eq!(store.get("pub/b").expect("get").as_deref(), Some("2"));
    }
}
