//! Claim contexts and the wire format exchanged through the claim cache.
//!
//! Every probe carries a [`ClaimContext`] identifying the requesting node and
//! the instant of the attempt. The cache owner bakes the first context it sees
//! for a key into the cached response; all later queriers of that key get the
//! same bytes back. A prober claims a candidate exactly when the echoed
//! context is its own.
//!
//! The response encoding is deliberately fixed byte-for-byte so that nodes on
//! different versions interoperate:
//!
//! ```text
//! {"id":"<server-id>","ts":"<nanos>","#":"<number>"}
//! {"id":"<server-id>","ts":"<nanos>","#":"<number>",">":"<skip-to>"}
//! ```
//!
//! Numbers travel as strings because JSON has no u64.

use crate::error::{Result, TallyError};
use serde::Deserialize;
use std::fmt;

/// Whether a probe consults only the claim cache (`local`) or also the durable
/// remote store (`remote`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimKind {
    /// Fast path: trust the cache and the node's own store.
    Local,
    /// Catch-up path: the loader reads the remote max and may answer with a
    /// skip past already-issued values.
    Remote,
}

impl ClaimKind {
    /// Header value for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            ClaimKind::Local => "local",
            ClaimKind::Remote => "remote",
        }
    }

    /// Parse a header value. Anything other than `local`/`remote` is rejected.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "local" => Some(ClaimKind::Local),
            "remote" => Some(ClaimKind::Remote),
            _ => None,
        }
    }
}

impl fmt::Display for ClaimKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The request context submitted with a probe.
///
/// Tunnelled as transport headers when the probed key is owned by a peer, and
/// reconstructed by the owner before it invokes the loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimContext {
    /// Opaque identifier of the requesting node, unique per process.
    pub server_id: String,
    /// Strictly increasing nanosecond timestamp of the attempt, as a decimal
    /// string.
    pub timestamp: String,
    /// Probe kind.
    pub kind: ClaimKind,
}

impl ClaimContext {
    /// Build a context for a fresh probe, stamped with the current time.
    pub fn new(server_id: impl Into<String>, kind: ClaimKind) -> Self {
        Self {
            server_id: server_id.into(),
            timestamp: crate::clock::unix_nanos().to_string(),
            kind,
        }
    }

    /// Rebuild a context from transport header values.
    pub fn from_parts(
        server_id: impl Into<String>,
        timestamp: impl Into<String>,
        kind: ClaimKind,
    ) -> Self {
        Self {
            server_id: server_id.into(),
            timestamp: timestamp.into(),
            kind,
        }
    }
}

/// The common body of every claim response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseBody {
    /// Server ID of the context that populated the cache entry.
    pub id: String,
    /// Timestamp of the context that populated the cache entry.
    pub ts: String,
    /// The candidate number the entry was populated for, as a decimal string.
    pub number: String,
}

impl ResponseBody {
    /// The claim test: a prober owns the candidate exactly when the response
    /// echoes its own context and the probed number.
    pub fn matches(&self, ctx: &ClaimContext, candidate: u64) -> bool {
        self.id == ctx.server_id
            && self.ts == ctx.timestamp
            && self.number == candidate.to_string()
    }
}

/// A decoded claim response.
///
/// The shape is decided by content: a response carrying the `">"` member is a
/// skip grant, everything else is a plain claim echo. The transport kind
/// header only discriminates *request* contexts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimResponse {
    /// Plain echo of the populating context.
    Local(ResponseBody),
    /// Echo plus an owner-granted jump past already-issued values.
    Remote {
        /// The populating context and candidate.
        body: ResponseBody,
        /// First candidate worth probing next, as a decimal string.
        skip_to: Option<String>,
    },
}

#[derive(Deserialize)]
struct WireResponse {
    id: String,
    ts: String,
    #[serde(rename = "#")]
    number: String,
    #[serde(rename = ">", default)]
    skip: Option<String>,
}

impl ClaimResponse {
    /// Decode a response string from the cache.
    pub fn decode(raw: &str) -> Result<Self> {
        let wire: WireResponse = serde_json::from_str(raw)?;
        let body = ResponseBody {
            id: wire.id,
            ts: wire.ts,
            number: wire.number,
        };
        Ok(match wire.skip {
            None => ClaimResponse::Local(body),
            skip @ Some(_) => ClaimResponse::Remote { body, skip_to: skip },
        })
    }

    /// The common body, regardless of shape.
    pub fn body(&self) -> &ResponseBody {
        match self {
            ClaimResponse::Local(body) => body,
            ClaimResponse::Remote { body, .. } => body,
        }
    }

    /// Whether this response grants a skip.
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            ClaimResponse::Remote {
                skip_to: Some(_),
                ..
            }
        )
    }

    /// Parse the skip target. Fails with [`TallyError::SkipNilValue`] when the
    /// response carries none.
    pub fn skip_to(&self) -> Result<u64> {
        match self {
            ClaimResponse::Remote {
                skip_to: Some(skip),
                ..
            } => Ok(skip.parse()?),
            _ => Err(TallyError::SkipNilValue),
        }
    }
}

/// Encode the plain response shape: `{"id":"…","ts":"…","#":"N"}`.
pub fn encode_local(ctx: &ClaimContext, number: &str) -> String {
    format!(
        "{{\"id\":\"{}\",\"ts\":\"{}\",\"#\":\"{}\"}}",
        ctx.server_id, ctx.timestamp, number
    )
}

/// Encode the skip response shape: `{"id":"…","ts":"…","#":"N",">":"K"}`.
pub fn encode_remote(ctx: &ClaimContext, number: &str, skip_to: u64) -> String {
    format!(
        "{{\"id\":\"{}\",\"ts\":\"{}\",\"#\":\"{}\",\">\":\"{}\"}}",
        ctx.server_id, ctx.timestamp, number, skip_to
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(kind: ClaimKind) -> ClaimContext {
        ClaimContext::from_parts("srv-1", "1234567890", kind)
    }

    #[test]
    fn local_encoding_is_byte_exact() {
        let out = encode_local(&ctx(ClaimKind::Local), "42");
        assert_eq!(out, r##"{"id":"srv-1","ts":"1234567890","#":"42"}"##);
    }

    #[test]
    fn remote_encoding_is_byte_exact() {
        let out = encode_remote(&ctx(ClaimKind::Remote), "42", 100);
        assert_eq!(
            out,
            r##"{"id":"srv-1","ts":"1234567890","#":"42",">":"100"}"##
        );
    }

    #[test]
    fn decode_round_trips_local() {
        let c = ctx(ClaimKind::Local);
        let resp = ClaimResponse::decode(&encode_local(&c, "7")).expect("decode");
        assert_eq!(
            resp,
            ClaimResponse::Local(ResponseBody {
                id: "srv-1".into(),
                ts: "1234567890".into(),
                number: "7".into(),
            })
        );
        assert!(!resp.is_skip());
        assert!(resp.skip_to().is_err());
    }

    #[test]
    fn decode_round_trips_skip() {
        let c = ctx(ClaimKind::Remote);
        let resp = ClaimResponse::decode(&encode_remote(&c, "7", 12)).expect("decode");
        assert!(resp.is_skip());
        assert_eq!(resp.skip_to().expect("skip"), 12);
        assert_eq!(resp.body().number, "7");
    }

    #[test]
    fn claim_test_requires_full_echo() {
        let c = ctx(ClaimKind::Local);
        let body = ResponseBody {
            id: "srv-1".into(),
            ts: "1234567890".into(),
            number: "7".into(),
        };
        assert!(body.matches(&c, 7));
        assert!(!body.matches(&c, 8));

        let other = ClaimContext::from_parts("srv-2", "1234567890", ClaimKind::Local);
        assert!(!body.matches(&other, 7));

        let later = ClaimContext::from_parts("srv-1", "1234567891", ClaimKind::Local);
        assert!(!body.matches(&later, 7));
    }

    #[test]
    fn kind_parses_only_known_values() {
        assert_eq!(ClaimKind::parse("local"), Some(ClaimKind::Local));
        assert_eq!(ClaimKind::parse("remote"), Some(ClaimKind::Remote));
        assert_eq!(ClaimKind::parse("LOCAL"), None);
        assert_eq!(ClaimKind::parse(""), None);
    }

    #[test]
    fn fresh_contexts_get_distinct_timestamps() {
        let a = ClaimContext::new("srv-1", ClaimKind::Local);
        let b = ClaimContext::new("srv-1", ClaimKind::Local);
        assert_ne!(a.timestamp, b.timestamp);
    }
}
