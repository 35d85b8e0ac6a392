//! TOML configuration for the tally server.
//!
//! Everything has a workable default; an empty file yields a single-node
//! server on `:8080` with a temp-dir local store. Unknown keys are tolerated
//! by the parser and simply ignored.

use crate::error::{Result, TallyError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default HTTP listen port string.
pub const DEFAULT_HTTP_PORT: &str = ":8080";
/// Default healthcheck path.
pub const DEFAULT_HEALTHCHECK_URL: &str = "/.healthcheck";
/// Default public namespace prefix.
pub const DEFAULT_PUBLIC_PREFIX: &str = "/pub";
/// Default virtual replicas per pool member on the hash ring.
pub const DEFAULT_REPLICAS: usize = 50;
/// Default base path for the inter-node cache protocol.
pub const DEFAULT_BASE_PATH: &str = "/_tally/";
/// Default context header carrying the server ID.
pub const DEFAULT_HEADER_ID: &str = "Grp-Ctx-I";
/// Default context header carrying the timestamp.
pub const DEFAULT_HEADER_TS: &str = "Grp-Ctx-T";
/// Default context header carrying the probe kind.
pub const DEFAULT_HEADER_KIND: &str = "Grp-Ctx-K";
/// Default local store table name.
pub const DEFAULT_BUCKET_NAME: &str = "tally";

/// Top-level configuration, decoded from a TOML file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Deployment environment label (informational).
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Dump the effective configuration at startup.
    #[serde(default)]
    pub show_config: bool,

    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Claim cache and pool settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Local and remote store settings.
    #[serde(default)]
    pub datastore: DatastoreConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Listen ports.
    #[serde(default)]
    pub ports: PortsConfig,
    /// Router paths.
    #[serde(default)]
    pub urls: UrlsConfig,
    /// Public API settings.
    #[serde(default)]
    pub api: ApiConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ports: PortsConfig::default(),
            urls: UrlsConfig::default(),
            api: ApiConfig::default(),
        }
    }
}

/// Listen port settings, in `":<port>"` or `"<host>:<port>"` form.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PortsConfig {
    /// HTTP listen address.
    #[serde(default = "default_http_port")]
    pub http: String,
}

impl Default for PortsConfig {
    fn default() -> Self {
        Self {
            http: default_http_port(),
        }
    }
}

/// Router path settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UrlsConfig {
    /// Healthcheck path.
    #[serde(default = "default_healthcheck_url")]
    pub healthcheck: String,
}

impl Default for UrlsConfig {
    fn default() -> Self {
        Self {
            healthcheck: default_healthcheck_url(),
        }
    }
}

/// Public API settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Path prefix under which namespaces are served.
    #[serde(default = "default_public_prefix")]
    pub public_prefix: String,
    /// Host allow-list. Empty means any host is accepted.
    #[serde(default)]
    pub domains: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            public_prefix: default_public_prefix(),
            domains: Vec::new(),
        }
    }
}

/// Claim cache and peer pool settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// This node's reachable URL. Falls back to localhost when empty.
    #[serde(default, rename = "self")]
    pub self_url: Option<String>,
    /// All pool member URLs, including this node.
    #[serde(default)]
    pub pool: Vec<String>,
    /// Virtual replicas per pool member on the hash ring.
    #[serde(default = "default_replicas")]
    pub replicas: usize,
    /// Base path for the inter-node cache protocol.
    #[serde(default = "default_base_path")]
    pub base_path: String,
    /// Context header names.
    #[serde(default)]
    pub header: HeaderConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            self_url: None,
            pool: Vec::new(),
            replicas: default_replicas(),
            base_path: default_base_path(),
            header: HeaderConfig::default(),
        }
    }
}

/// Names of the context headers tunnelling claim contexts between peers.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HeaderConfig {
    /// Header carrying the server ID.
    #[serde(default = "default_header_id")]
    pub id: String,
    /// Header carrying the timestamp.
    #[serde(default = "default_header_ts")]
    pub ts: String,
    /// Header carrying the probe kind.
    #[serde(default = "default_header_kind")]
    pub kind: String,
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            id: default_header_id(),
            ts: default_header_ts(),
            kind: default_header_kind(),
        }
    }
}

/// Store settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DatastoreConfig {
    /// Which registered remote store driver to activate. Empty selects the
    /// sole registered driver, or the first in lexical order.
    #[serde(default)]
    pub use_remote_db: Option<String>,
    /// Local store settings.
    #[serde(default)]
    pub local: LocalStoreConfig,
    /// Per-driver remote store settings, keyed by driver identifier.
    #[serde(default)]
    pub remote: BTreeMap<String, RemoteDriverConfig>,
}

/// Local store settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LocalStoreConfig {
    /// `file://` DSN of the backing database. Empty picks a temp directory.
    #[serde(default)]
    pub dsn: Option<String>,
    /// Table name values are kept under.
    #[serde(default = "default_bucket_name")]
    pub bucket: String,
    /// Remove the backing file on shutdown.
    #[serde(default)]
    pub cleanup_db_file: bool,
}

impl Default for LocalStoreConfig {
    fn default() -> Self {
        Self {
            dsn: None,
            bucket: default_bucket_name(),
            cleanup_db_file: false,
        }
    }
}

/// Settings for one remote store driver.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RemoteDriverConfig {
    /// Driver connection string.
    #[serde(default)]
    pub dsn: Option<String>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| TallyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| TallyError::Config(format!("toml: {e}")))
    }
}

/// Parse a `file://` DSN into a filesystem path.
pub fn parse_file_dsn(dsn: &str) -> Result<PathBuf> {
    let path = dsn
        .strip_prefix("file://")
        .ok_or_else(|| TallyError::Config(format!("dsn must use the file:// scheme: {dsn}")))?;
    if path.is_empty() {
        return Err(TallyError::Config(format!("dsn has no path: {dsn}")));
    }
    Ok(PathBuf::from(path))
}

fn default_environment() -> String {
    "dev".to_string()
}

fn default_http_port() -> String {
    DEFAULT_HTTP_PORT.to_string()
}

fn default_healthcheck_url() -> String {
    DEFAULT_HEALTHCHECK_URL.to_string()
}

fn default_public_prefix() -> String {
    DEFAULT_PUBLIC_PREFIX.to_string()
}

fn default_replicas() -> usize {
    DEFAULT_REPLICAS
}

fn default_base_path() -> String {
    DEFAULT_BASE_PATH.to_string()
}

fn default_header_id() -> String {
    DEFAULT_HEADER_ID.to_string()
}

fn default_header_ts() -> String {
    DEFAULT_HEADER_TS.to_string()
}

fn default_header_kind() -> String {
    DEFAULT_HEADER_KIND.to_string()
}

fn default_bucket_name() -> String {
    DEFAULT_BUCKET_NAME.to_string()
}
