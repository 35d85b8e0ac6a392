//! Consistent-hash ring with virtual replicas.
//!
//! Each pool member is projected onto the ring as `replicas` virtual nodes; a
//! key belongs to the member owning the first token at or after the key's
//! hash, wrapping around. Small membership changes move only the keys in the
//! affected arcs, which is what keeps ownership stable while the pool is
//! being updated.

use siphasher::sip::SipHasher24;
use std::hash::{Hash, Hasher};

/// Hash arbitrary bytes to a ring token using SipHash-2-4.
pub fn hash_bytes(data: &[u8]) -> u64 {
    let mut hasher = SipHasher24::new();
    data.hash(&mut hasher);
    hasher.finish()
}

/// An immutable consistent-hash ring over a set of node URLs.
#[derive(Debug, Clone)]
pub struct HashRing {
    nodes: Vec<String>,
    // (token, index into nodes), sorted by token
    tokens: Vec<(u64, usize)>,
}

impl HashRing {
    /// Build a ring with `replicas` virtual nodes per member.
    pub fn new(replicas: usize, nodes: Vec<String>) -> Self {
        let mut tokens = Vec::with_capacity(replicas * nodes.len());
        for (idx, node) in nodes.iter().enumerate() {
            for replica in 0..replicas {
                tokens.push((hash_bytes(format!("{replica}{node}").as_bytes()), idx));
            }
        }
        tokens.sort_unstable();
        Self { nodes, tokens }
    }

    /// Whether the ring has any members.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// The members this ring was built over.
    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    /// The member owning a key, or `None` on an empty ring.
    pub fn node_for(&self, key: &str) -> Option<&str> {
        if self.tokens.is_empty() {
            return None;
        }
        let token = hash_bytes(key.as_bytes());
        let pos = self
            .tokens
            .partition_point(|&(t, _)| t < token)
            // wrap past the last token back to the start
            % self.tokens.len();
        let (_, idx) = self.tokens[pos];
        Some(self.nodes[idx].as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_ring_owns_nothing() {
        let ring = HashRing::new(50, Vec::new());
        assert!(ring.is_empty());
        assert_eq!(ring.node_for("0:pub/a"), None);
    }

    #[test]
    fn single_node_owns_everything() {
        let ring = HashRing::new(50, vec!["http://a:8080".to_string()]);
        for i in 0..100 {
            let key = format!("{i}:pub/x");
            assert_eq!(ring.node_for(&key), Some("http://a:8080"));
        }
    }

    #[test]
    fn ownership_is_deterministic() {
        let nodes = vec![
            "http://a:8080".to_string(),
            "http://b:8080".to_string(),
            "http://c:8080".to_string(),
        ];
        let ring1 = HashRing::new(50, nodes.clone());
        let ring2 = HashRing::new(50, nodes);
        for i in 0..500 {
            let key = format!("{i}:pub/x");
            assert_eq!(ring1.node_for(&key), ring2.node_for(&key));
        }
    }

    #[test]
    fn every_node_owns_some_keys() {
        let nodes = vec![
            "http://a:8080".to_string(),
            "http://b:8080".to_string(),
            "http://c:8080".to_string(),
        ];
        let ring = HashRing::new(50, nodes.clone());

        let mut seen = std::collections::HashSet::new();
        for i in 0..1000 {
            let key = format!("{i}:pub/x");
            seen.insert(ring.node_for(&key).expect("owner").to_string());
        }
        assert_eq!(seen.len(), nodes.len(), "distribution is badly skewed");
    }

    #[test]
    fn membership_change_keeps_most_ownership() {
        let mut nodes = vec![
            "http://a:8080".to_string(),
            "http://b:8080".to_string(),
            "http://c:8080".to_string(),
        ];
        let before = HashRing::new(50, nodes.clone());
        nodes.push("http://d:8080".to_string());
        let after = HashRing::new(50, nodes);

        let mut moved = 0;
        const KEYS: usize = 1000;
        for i in 0..KEYS {
            let key = format!("{i}:pub/x");
            if before.node_for(&key) != after.node_for(&key) {
                moved += 1;
            }
        }
        // Adding one node to three should move roughly a quarter of the keys.
        assert!(moved < KEYS / 2, "too many keys moved: {moved}/{KEYS}");
    }
}
