//! HTTP transport tunnelling claim contexts between peers.
//!
//! The peer protocol is one GET per probe:
//!
//! ```text
//! GET {base_path}{group}/{key}
//! Grp-Ctx-I: <server-id>
//! Grp-Ctx-T: <timestamp>
//! Grp-Ctx-K: local | remote
//! ```
//!
//! The response body is the claim response JSON, verbatim. Keys are ASCII
//! with no URL-special characters (the public edge validates namespaces), so
//! they travel as the raw remainder of the path.

use crate::error::{ClusterError, Result};
use std::time::Duration;
use tally_core::config::HeaderConfig;
use tally_core::ClaimContext;

const PEER_TIMEOUT: Duration = Duration::from_secs(10);

/// Names of the three context headers.
#[derive(Debug, Clone)]
pub struct HeaderNames {
    /// Header carrying the server ID.
    pub id: String,
    /// Header carrying the timestamp.
    pub ts: String,
    /// Header carrying the probe kind.
    pub kind: String,
}

impl From<&HeaderConfig> for HeaderNames {
    fn from(config: &HeaderConfig) -> Self {
        Self {
            id: config.id.clone(),
            ts: config.ts.clone(),
            kind: config.kind.clone(),
        }
    }
}

impl Default for HeaderNames {
    fn default() -> Self {
        Self::from(&HeaderConfig::default())
    }
}

/// HTTP client side of the peer protocol.
pub struct PeerTransport {
    http: reqwest::Client,
    base_path: String,
    headers: HeaderNames,
}

impl PeerTransport {
    /// Build a transport for a given base path and header names.
    pub fn new(base_path: &str, headers: HeaderNames) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(PEER_TIMEOUT)
                .build()
                .expect("default reqwest client"),
            base_path: normalize_base_path(base_path),
            headers,
        }
    }

    /// The normalized base path, with leading and trailing slash.
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Fetch a key from its owner, tunnelling the context as headers.
    pub async fn fetch(
        &self,
        owner: &str,
        group: &str,
        key: &str,
        ctx: &ClaimContext,
    ) -> Result<String> {
        let url = self.url_for(owner, group, key);
        let response = self
            .http
            .get(&url)
            .header(self.headers.id.as_str(), ctx.server_id.as_str())
            .header(self.headers.ts.as_str(), ctx.timestamp.as_str())
            .header(self.headers.kind.as_str(), ctx.kind.as_str())
            .send()
            .await
            .map_err(|e| ClusterError::PeerFetch {
                url: url.clone(),
                cause: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClusterError::PeerStatus {
                url,
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| ClusterError::PeerFetch {
            url,
            cause: e.to_string(),
        })
    }

    fn url_for(&self, owner: &str, group: &str, key: &str) -> String {
        format!(
            "{}{}{}/{}",
            owner.trim_end_matches('/'),
            self.base_path,
            group,
            key
        )
    }
}

/// Force a leading and trailing slash onto a configured base path.
pub fn normalize_base_path(base_path: &str) -> String {
    let trimmed = base_path.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_path_is_normalized() {
        assert_eq!(normalize_base_path("/_tally/"), "/_tally/");
        assert_eq!(normalize_base_path("_tally"), "/_tally/");
        assert_eq!(normalize_base_path("/_tally"), "/_tally/");
        assert_eq!(normalize_base_path("/"), "/");
    }

    #[test]
    fn peer_urls_keep_keys_verbatim() {
        let transport = PeerTransport::new("/_tally/", HeaderNames::default());
        let url = transport.url_for("http://b:8080", "tally", "12:pub/a/b");
        assert_eq!(url, "http://b:8080/_tally/tally/12:pub/a/b");
    }

    #[test]
    fn header_names_come_from_config() {
        let names = HeaderNames::default();
        assert_eq!(names.id, "Grp-Ctx-I");
        assert_eq!(names.ts, "Grp-Ctx-T");
        assert_eq!(names.kind, "Grp-Ctx-K");
    }
}
