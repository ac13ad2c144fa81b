//! Edge types - directed references between records
//!
//! A node is addressed by `(kind, id)`. Every edge `from -> to` stored in the
//! graph has a mirrored entry on `to`, so both directions are queryable:
//! - `Outgoing`: what a record references
//! - `Incoming`: what references a record

use crate::kind::RecordKind;
use serde::{Deserialize, Serialize};

/// Address of a node in the reference graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeKey {
    pub kind: RecordKind,
    pub id: String,
}

impl NodeKey {
    pub fn new(kind: RecordKind, id: impl Into<String>) -> Self {
        Self { kind, id: id.into() }
    }
}

impl std::fmt::Display for NodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind.code(), self.id)
    }
}

/// Traversal direction along references
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Follow references made by the node
    Outgoing,
    /// Follow references made to the node
    Incoming,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Outgoing => "outgoing",
            Direction::Incoming => "incoming",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A directed reference from one record to another
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub from: NodeKey,
    pub to: NodeKey,
}

impl Edge {
    pub fn new(from: NodeKey, to: NodeKey) -> Self {
        Self { from, to }
    }
}

impl std::fmt::Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let edge = Edge::new(
            NodeKey::new(RecordKind::Source, "S1"),
            NodeKey::new(RecordKind::Document, "D-ncbi-1"),
        );
        assert_eq!(edge.to_string(), "S:S1 -> D:D-ncbi-1");
        assert_eq!(NodeKey::new(RecordKind::Unit, "Ug_x").to_string(), "U:Ug_x");
        assert_eq!(Direction::Incoming.to_string(), "incoming");
    }
}
