//! Content fingerprints of a graph.
//!
//! The fingerprint covers every node's kind, identifier and fields in
//! listing order, plus the root. Advisory comments are excluded, so two
//! graphs with equal fingerprints serialize identically.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::graph::node::{Fields, Kind};
use crate::graph::Graph;
use crate::id::Identifier;

/// A 32-byte SHA-256 content hash.
pub type ContentHash = [u8; 32];

#[derive(Serialize)]
struct Entry<'a> {
    kind: Kind,
    id: &'a Identifier,
    fields: &'a Fields,
}

/// Compute the SHA-256 content hash of any serializable value.
pub fn content_hash<T: Serialize>(value: &T) -> ContentHash {
    let mut hasher = Sha256::new();
    // Serializing plain data into a Vec cannot fail.
    if let Ok(json) = serde_json::to_vec(value) {
        hasher.update(&json);
    }
    hasher.finalize().into()
}

/// Fingerprint of the graph's structural content.
pub fn fingerprint(graph: &Graph) -> ContentHash {
    let entries: Vec<Entry<'_>> = graph
        .nodes()
        .map(|n| Entry {
            kind: n.kind,
            id: &n.id,
            fields: &n.fields,
        })
        .collect();
    content_hash(&(graph.root(), entries))
}

/// Format a content hash as a hex string.
pub fn hash_hex(hash: &ContentHash) -> String {
    hash.iter().map(|b| format!("{b:02x}")).collect()
}
