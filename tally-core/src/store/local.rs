//! Per-node persistent namespace → value map.
//!
//! The local store is the fast path: when this node has handled a namespace
//! before, the coordinator starts probing at the last observed value instead
//! of from zero. Backed by a single SQLite table; writes within one node are
//! totally ordered by the connection lock.

use crate::config::{parse_file_dsn, LocalStoreConfig};
use crate::error::{Result, TallyError};
use crate::store::Shutdown;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension};
use std::path::PathBuf;

const BUSY_TIMEOUT_MS: u64 = 5_000;

/// Node-local persistent key/value store.
pub struct LocalStore {
    conn: Mutex<Connection>,
    table: String,
    path: PathBuf,
    cleanup_on_shutdown: bool,
}

impl LocalStore {
    /// Open (and create if needed) the backing database.
    ///
    /// An empty DSN picks a fresh file under the system temp directory, which
    /// suits single-node development setups.
    pub fn open(config: &LocalStoreConfig) -> Result<Self> {
        let path = match config.dsn.as_deref() {
            Some(dsn) if !dsn.is_empty() => parse_file_dsn(dsn)?,
            _ => {
                let dir = std::env::temp_dir().join(format!("tally-{}", crate::clock::unix_nanos()));
                std::fs::create_dir_all(&dir).map_err(|source| TallyError::Io {
                    path: dir.clone(),
                    source,
                })?;
                dir.join("default.db")
            }
        };

        let table = validate_table_name(&config.bucket)?;
        let conn = Connection::open(&path)?;
        conn.busy_timeout(std::time::Duration::from_millis(BUSY_TIMEOUT_MS))?;
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                namespace TEXT PRIMARY KEY,
                value     TEXT NOT NULL
            );"
        ))?;

        Ok(Self {
            conn: Mutex::new(conn),
            table,
            path,
            cleanup_on_shutdown: config.cleanup_db_file,
        })
    }

    /// Path of the backing database file.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// The stored value for a namespace. Absence and read failures both come
    /// back as `None`; failures are logged.
    pub fn get(&self, ns: &str) -> Option<String> {
        let conn = self.conn.lock();
        match self.query(&conn, ns) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(namespace = %ns, error = %e, "local store read failed");
                None
            }
        }
    }

    /// Store a value for a namespace, replacing any previous one.
    pub fn set(&self, ns: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock();
        self.put(&conn, ns, value)
    }

    /// Store `value` iff it parses as a u64 strictly greater than the current
    /// value (or nothing is stored yet).
    ///
    /// # Errors
    ///
    /// [`TallyError::NumberNotIncremented`] when the candidate is not larger;
    /// [`TallyError::ParseValue`] when either side is not a number.
    pub fn incr(&self, ns: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock();
        match self.query(&conn, ns)? {
            None => self.put(&conn, ns, value),
            Some(current) => {
                let candidate: u64 = value.parse()?;
                let stored: u64 = current.parse()?;
                if candidate > stored {
                    self.put(&conn, ns, value)
                } else {
                    Err(TallyError::NumberNotIncremented)
                }
            }
        }
    }

    fn query(&self, conn: &Connection, ns: &str) -> Result<Option<String>> {
        let value = conn
            .query_row(
                &format!("SELECT value FROM {} WHERE namespace = ?1", self.table),
                [ns],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn put(&self, conn: &Connection, ns: &str, value: &str) -> Result<()> {
        conn.execute(
            &format!(
                "INSERT INTO {} (namespace, value) VALUES (?1, ?2)
                 ON CONFLICT(namespace) DO UPDATE SET value = excluded.value",
                self.table
            ),
            [ns, value],
        )?;
        Ok(())
    }
}

impl Shutdown for LocalStore {
    fn shutdown(&self) -> Result<()> {
        if self.cleanup_on_shutdown {
            std::fs::remove_file(&self.path).map_err(|source| TallyError::Io {
                path: self.path.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

fn validate_table_name(name: &str) -> Result<String> {
    let mut chars = name.chars();
    let head_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !head_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(TallyError::Config(format!(
            "bucket must be a bare identifier: {name:?}"
        )));
    }
    Ok(name.to_string())
}
