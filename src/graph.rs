//! Reference Graph - bidirectional index of record references
//!
//! Nodes are keyed by `(kind, id)` and hold ordered reference lists in both
//! directions, grouped by the kind at the other end. A node exists either
//! because a live record has that identifier, or as a placeholder because
//! some live record references an identifier with no record behind it.
//!
//! Rule evidence cannot be classified while scanning (Source and Text-source
//! ids share a namespace), so it waits in a pending bucket until
//! [`ReferenceGraph::resolve_pending`] runs.

use crate::edge::{Direction, Edge, NodeKey};
use crate::identifier::compute_id;
use crate::kind::RecordKind;
use crate::record::Record;
use crate::references::extract;
use crate::Result;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;

type Adjacency = IndexMap<RecordKind, Vec<String>>;

#[derive(Debug, Clone, Default, PartialEq)]
struct Node {
    refs: Adjacency,
    ref_by: Adjacency,
    is_record: bool,
}

impl Node {
    fn is_orphan(&self) -> bool {
        !self.is_record && self.refs.is_empty() && self.ref_by.is_empty()
    }

    fn adjacency(&self, direction: Direction) -> &Adjacency {
        match direction {
            Direction::Outgoing => &self.refs,
            Direction::Incoming => &self.ref_by,
        }
    }
}

/// Remove the last occurrence of `id` from `map[kind]`, dropping the list once empty
fn remove_one(map: &mut Adjacency, kind: RecordKind, id: &str) {
    if let Some(list) = map.get_mut(&kind) {
        if let Some(pos) = list.iter().rposition(|x| x == id) {
            list.remove(pos);
        }
        if list.is_empty() {
            map.shift_remove(&kind);
        }
    }
}

fn rename_in(map: &mut Adjacency, kind: RecordKind, old: &str, new: &str) {
    if let Some(list) = map.get_mut(&kind) {
        for id in list.iter_mut().filter(|id| id.as_str() == old) {
            *id = new.to_string();
        }
    }
}

/// Elements of `a` left over after removing one occurrence per element of `b`
fn multiset_difference(a: &[String], b: &[String]) -> Vec<String> {
    let mut budget: HashMap<&str, usize> = HashMap::new();
    for id in b {
        *budget.entry(id.as_str()).or_default() += 1;
    }
    a.iter()
        .filter(|id| match budget.get_mut(id.as_str()) {
            Some(n) if *n > 0 => {
                *n -= 1;
                false
            }
            _ => true,
        })
        .cloned()
        .collect()
}

/// In-memory bidirectional reference index
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceGraph {
    nodes: HashMap<RecordKind, HashMap<String, Node>>,
    /// Evidence id -> rules citing it, waiting for classification
    pending: IndexMap<String, Vec<NodeKey>>,
}

impl ReferenceGraph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a whole corpus: one extraction pass, then evidence resolution
    pub fn build<'a>(records: impl IntoIterator<Item = &'a Record>) -> Result<Self> {
        let mut graph = Self::new();
        for record in records {
            let id = compute_id(record)?;
            graph.add(record.kind(), &id, record);
        }
        graph.resolve_pending();
        Ok(graph)
    }

    /// Insert the edges of a new record.
    ///
    /// Evidence goes to the pending bucket; call [`Self::resolve_pending`]
    /// afterwards.
    pub fn add(&mut self, kind: RecordKind, id: &str, record: &Record) {
        self.entry(kind, id).is_record = true;
        let refs = extract(record);
        for (target_kind, target_id) in &refs.direct {
            self.link(kind, id, *target_kind, target_id);
        }
        for evidence in refs.evidence {
            self.pending
                .entry(evidence)
                .or_default()
                .push(NodeKey::new(kind, id));
        }
    }

    /// Turn pending evidence into Source or Text-source edges.
    ///
    /// Entries whose id names neither a live Source nor a live Text-source
    /// stay pending until such a record appears.
    pub fn resolve_pending(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        for (evidence, rules) in pending {
            match self.classify_evidence(&evidence) {
                Some(target_kind) => {
                    for rule in &rules {
                        self.link(rule.kind, &rule.id, target_kind, &evidence);
                    }
                }
                None => {
                    self.pending.insert(evidence, rules);
                }
            }
        }
    }

    fn classify_evidence(&self, id: &str) -> Option<RecordKind> {
        RecordKind::all()
            .iter()
            .copied()
            .filter(RecordKind::is_evidence)
            .find(|kind| self.is_record(*kind, id))
    }

    /// Drop a record's outgoing edges and their mirrors.
    ///
    /// Incoming edges stay: the node turns into a placeholder so that the
    /// records still pointing at it can be found. Unknown nodes are ignored.
    ///
    /// Evidence is the exception: a Source or Text-source only got its rule
    /// edges by classification, so they go back to the pending bucket and a
    /// later record with the same id is classified afresh.
    pub fn remove(&mut self, kind: RecordKind, id: &str) {
        self.purge_pending(kind, id);
        let Some(node) = self.node_mut(kind, id) else {
            return;
        };
        let refs = std::mem::take(&mut node.refs);
        node.is_record = false;
        let citing = if kind.is_evidence() {
            std::mem::take(&mut node.ref_by)
        } else {
            Adjacency::new()
        };
        for (target_kind, target_ids) in refs {
            for target_id in target_ids {
                self.unlink_reverse(kind, id, target_kind, &target_id);
            }
        }
        for (rule_kind, rule_ids) in citing {
            for rule_id in rule_ids {
                if let Some(rule) = self.node_mut(rule_kind, &rule_id) {
                    remove_one(&mut rule.refs, kind, id);
                }
                self.pending
                    .entry(id.to_string())
                    .or_default()
                    .push(NodeKey::new(rule_kind, rule_id));
            }
        }
        self.prune(kind, id);
    }

    /// Bring a record's outgoing edges in line with its new content.
    ///
    /// Only the difference between old and new references touches the
    /// neighbors, so re-applying an unchanged record leaves every list as it
    /// was. Evidence is classified right away.
    pub fn replace_outgoing(&mut self, kind: RecordKind, id: &str, record: &Record) {
        let refs = extract(record);
        let mut wanted = Adjacency::new();
        for (target_kind, target_id) in refs.direct {
            wanted.entry(target_kind).or_default().push(target_id);
        }
        let mut unresolved = Vec::new();
        for evidence in refs.evidence {
            match self.classify_evidence(&evidence) {
                Some(target_kind) => wanted.entry(target_kind).or_default().push(evidence),
                None => unresolved.push(evidence),
            }
        }

        self.purge_pending(kind, id);
        let old = self
            .node_mut(kind, id)
            .map(|node| std::mem::take(&mut node.refs))
            .unwrap_or_default();

        for (target_kind, old_ids) in &old {
            let new_ids = wanted.get(target_kind).map(Vec::as_slice).unwrap_or(&[]);
            for removed in multiset_difference(old_ids, new_ids) {
                self.unlink_reverse(kind, id, *target_kind, &removed);
            }
        }
        for (target_kind, new_ids) in &wanted {
            let old_ids = old.get(target_kind).map(Vec::as_slice).unwrap_or(&[]);
            for added in multiset_difference(new_ids, old_ids) {
                self.entry(*target_kind, &added)
                    .ref_by
                    .entry(kind)
                    .or_default()
                    .push(id.to_string());
            }
        }

        let node = self.entry(kind, id);
        node.is_record = true;
        node.refs = wanted;
        for evidence in unresolved {
            self.pending
                .entry(evidence)
                .or_default()
                .push(NodeKey::new(kind, id));
        }
    }

    /// Move a node to a new identifier, renaming it inside every neighbor's
    /// lists. A placeholder already sitting at the new key is merged in.
    pub fn rename_node(&mut self, kind: RecordKind, old: &str, new: &str) {
        if old == new {
            return;
        }
        let Some(mut node) = self.nodes.get_mut(&kind).and_then(|m| m.remove(old)) else {
            return;
        };
        rename_in(&mut node.refs, kind, old, new);
        rename_in(&mut node.ref_by, kind, old, new);
        for (target_kind, target_ids) in &node.refs {
            for target_id in target_ids {
                if let Some(target) = self.node_mut(*target_kind, target_id) {
                    rename_in(&mut target.ref_by, kind, old, new);
                }
            }
        }
        for (source_kind, source_ids) in &node.ref_by {
            for source_id in source_ids {
                if let Some(source) = self.node_mut(*source_kind, source_id) {
                    rename_in(&mut source.refs, kind, old, new);
                }
            }
        }
        for rule in self.pending.values_mut().flatten() {
            if rule.kind == kind && rule.id == old {
                rule.id = new.to_string();
            }
        }

        let slot = self.entry(kind, new);
        slot.is_record |= node.is_record;
        for (k, ids) in node.refs {
            slot.refs.entry(k).or_default().extend(ids);
        }
        for (k, ids) in node.ref_by {
            slot.ref_by.entry(k).or_default().extend(ids);
        }
    }

    /// Identifiers referenced by `(kind, id)` with kind `target`, in order
    pub fn references(&self, kind: RecordKind, id: &str, target: RecordKind) -> &[String] {
        self.list(kind, id, Direction::Outgoing, target)
    }

    /// Identifiers of kind `source` referencing `(kind, id)`, in order
    pub fn referenced_by(&self, kind: RecordKind, id: &str, source: RecordKind) -> &[String] {
        self.list(kind, id, Direction::Incoming, source)
    }

    /// Neighbor list in either direction
    pub fn list(&self, kind: RecordKind, id: &str, direction: Direction, other: RecordKind) -> &[String] {
        self.node(kind, id)
            .and_then(|n| n.adjacency(direction).get(&other))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All neighbors in one direction, grouped by kind in first-seen order
    pub fn neighbors(&self, kind: RecordKind, id: &str, direction: Direction) -> Vec<NodeKey> {
        self.node(kind, id)
            .map(|n| {
                n.adjacency(direction)
                    .iter()
                    .flat_map(|(k, ids)| ids.iter().map(|other| NodeKey::new(*k, other.as_str())))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether a live record backs this node
    pub fn is_record(&self, kind: RecordKind, id: &str) -> bool {
        self.node(kind, id).is_some_and(|n| n.is_record)
    }

    /// Whether the node exists, as record or placeholder
    pub fn contains(&self, kind: RecordKind, id: &str) -> bool {
        self.node(kind, id).is_some()
    }

    /// Evidence ids that match no Source or Text-source, with their rules
    pub fn pending_evidence(&self) -> impl Iterator<Item = (&str, &[NodeKey])> {
        self.pending.iter().map(|(id, rules)| (id.as_str(), rules.as_slice()))
    }

    /// Placeholder nodes: referenced identifiers without a live record
    pub fn dangling(&self) -> Vec<NodeKey> {
        let mut keys: Vec<NodeKey> = self
            .nodes
            .iter()
            .flat_map(|(kind, nodes)| {
                nodes
                    .iter()
                    .filter(|(_, n)| !n.is_record)
                    .map(|(id, _)| NodeKey::new(*kind, id.as_str()))
            })
            .collect();
        keys.sort();
        keys
    }

    /// All forward edges
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.nodes.iter().flat_map(|(kind, nodes)| {
            nodes.iter().flat_map(move |(id, node)| {
                node.refs.iter().flat_map(move |(target_kind, target_ids)| {
                    target_ids.iter().map(move |target_id| {
                        Edge::new(NodeKey::new(*kind, id.as_str()), NodeKey::new(*target_kind, target_id.as_str()))
                    })
                })
            })
        })
    }

    /// Check that forward and reverse lists mirror each other as multisets.
    ///
    /// Returns the edges present in only one direction (reverse-only edges
    /// are reported in forward orientation).
    pub fn verify(&self) -> std::result::Result<(), Vec<Edge>> {
        let mut balance: HashMap<Edge, i64> = HashMap::new();
        for edge in self.edges() {
            *balance.entry(edge).or_default() += 1;
        }
        for (kind, nodes) in &self.nodes {
            for (id, node) in nodes {
                for (source_kind, source_ids) in &node.ref_by {
                    for source_id in source_ids {
                        let edge = Edge::new(
                            NodeKey::new(*source_kind, source_id.as_str()),
                            NodeKey::new(*kind, id.as_str()),
                        );
                        *balance.entry(edge).or_default() -= 1;
                    }
                }
            }
        }
        let mut broken: Vec<Edge> = balance
            .into_iter()
            .filter(|(_, n)| *n != 0)
            .map(|(edge, _)| edge)
            .collect();
        if broken.is_empty() {
            Ok(())
        } else {
            broken.sort_by(|a, b| (&a.from, &a.to).cmp(&(&b.from, &b.to)));
            Err(broken)
        }
    }

    /// Get statistics about the graph
    pub fn stats(&self) -> GraphStats {
        let all = self.nodes.values().flat_map(|m| m.values());
        let (records, placeholders) = all.fold((0, 0), |(r, p), n| {
            if n.is_record { (r + 1, p) } else { (r, p + 1) }
        });
        GraphStats {
            records,
            placeholders,
            edges: self.edges().count(),
            pending: self.pending.values().map(Vec::len).sum(),
        }
    }

    fn node(&self, kind: RecordKind, id: &str) -> Option<&Node> {
        self.nodes.get(&kind).and_then(|m| m.get(id))
    }

    fn node_mut(&mut self, kind: RecordKind, id: &str) -> Option<&mut Node> {
        self.nodes.get_mut(&kind).and_then(|m| m.get_mut(id))
    }

    fn entry(&mut self, kind: RecordKind, id: &str) -> &mut Node {
        self.nodes
            .entry(kind)
            .or_default()
            .entry(id.to_string())
            .or_default()
    }

    fn link(&mut self, kind: RecordKind, id: &str, target_kind: RecordKind, target_id: &str) {
        self.entry(kind, id)
            .refs
            .entry(target_kind)
            .or_default()
            .push(target_id.to_string());
        self.entry(target_kind, target_id)
            .ref_by
            .entry(kind)
            .or_default()
            .push(id.to_string());
    }

    /// Remove the mirror of `kind:id -> target` and prune the target if it
    /// was a placeholder kept alive only by this edge
    fn unlink_reverse(&mut self, kind: RecordKind, id: &str, target_kind: RecordKind, target_id: &str) {
        if let Some(target) = self.node_mut(target_kind, target_id) {
            remove_one(&mut target.ref_by, kind, id);
        }
        self.prune(target_kind, target_id);
    }

    fn prune(&mut self, kind: RecordKind, id: &str) {
        if let Some(nodes) = self.nodes.get_mut(&kind) {
            if nodes.get(id).is_some_and(Node::is_orphan) {
                nodes.remove(id);
            }
            if nodes.is_empty() {
                self.nodes.remove(&kind);
            }
        }
    }

    fn purge_pending(&mut self, kind: RecordKind, id: &str) {
        for rules in self.pending.values_mut() {
            rules.retain(|rule| !(rule.kind == kind && rule.id == id));
        }
        self.pending.retain(|_, rules| !rules.is_empty());
    }
}

/// Statistics about a reference graph
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub records: usize,
    pub placeholders: usize,
    pub edges: usize,
    pub pending: usize,
}

impl std::fmt::Display for GraphStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Reference Graph Statistics:")?;
        writeln!(f, "  Nodes: {} (placeholders: {})", self.records + self.placeholders, self.placeholders)?;
        writeln!(f, "  Edges: {}", self.edges)?;
        writeln!(f, "  Pending evidence: {}", self.pending)
    }
}
