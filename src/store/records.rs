//! Record CRUD and the rename cascade

use super::persist;
use super::StoreOptions;
use crate::codec::{Codec, EgcCodec};
use crate::edge::{Direction, Edge, NodeKey};
use crate::graph::ReferenceGraph;
use crate::identifier::{self, compute_id, IdFields, IdLookup};
use crate::kind::RecordKind;
use crate::record::Record;
use crate::references::rewrite;
use crate::{Error, Result};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

struct Slot {
    record: Record,
    /// Verbatim text; re-encoded only when the record changes
    line: String,
}

/// One record touched by an update, before anything is applied
struct Change {
    pos: usize,
    kind: RecordKind,
    old_id: String,
    new_id: String,
    record: Record,
}

/// Result of a consistency check over the whole store
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct CheckReport {
    /// Edges present in one direction only; always empty unless there is a bug
    pub broken_edges: Vec<Edge>,
    /// Referenced identifiers without a record, with their referrers
    pub dangling: Vec<(NodeKey, Vec<NodeKey>)>,
    /// Rule evidence matching no Source or Text-source
    pub unresolved_evidence: Vec<(String, Vec<NodeKey>)>,
}

impl CheckReport {
    pub fn is_clean(&self) -> bool {
        self.broken_edges.is_empty() && self.dangling.is_empty() && self.unresolved_evidence.is_empty()
    }
}

/// In-memory EGC file: records in line order plus their reference graph
pub struct RecordStore {
    codec: Box<dyn Codec>,
    path: Option<PathBuf>,
    options: StoreOptions,
    /// `None` marks a tombstone
    slots: Vec<Option<Slot>>,
    ids: HashMap<String, usize>,
    by_kind: HashMap<RecordKind, Vec<usize>>,
    graph: ReferenceGraph,
    backed_up: bool,
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore {
    /// Empty store using the default codec
    pub fn new() -> Self {
        Self::with_codec(Box::new(EgcCodec::new()))
    }

    /// Empty store using a custom codec
    pub fn with_codec(codec: Box<dyn Codec>) -> Self {
        Self {
            codec,
            path: None,
            options: StoreOptions::default(),
            slots: Vec::new(),
            ids: HashMap::new(),
            by_kind: HashMap::new(),
            graph: ReferenceGraph::new(),
            backed_up: false,
        }
    }

    /// Decode lines with the default codec and index them
    pub fn from_lines<S: AsRef<str>>(lines: impl IntoIterator<Item = S>) -> Result<Self> {
        let mut store = Self::new();
        store.load(lines)?;
        Ok(store)
    }

    /// Load an EGC file; a missing file gives an empty store bound to `path`
    pub fn open(path: impl AsRef<Path>, options: StoreOptions) -> Result<Self> {
        let path = path.as_ref();
        let mut store = Self::new();
        if path.exists() {
            let content = fs::read_to_string(path)?;
            store.load(content.lines())?;
            tracing::info!(
                "Loaded {} records from {} ({} codec)",
                store.len(),
                path.display(),
                store.codec.name()
            );
        } else {
            tracing::info!("{} does not exist yet, starting empty", path.display());
        }
        store.path = Some(path.to_path_buf());
        store.options = options;
        Ok(store)
    }

    /// Decode and index `lines`; the store must be empty
    pub fn load<S: AsRef<str>>(&mut self, lines: impl IntoIterator<Item = S>) -> Result<()> {
        for (i, line) in lines.into_iter().enumerate() {
            let line = line.as_ref();
            let record = self.codec.decode(line).map_err(|e| Error::Decode {
                line: i + 1,
                message: e.to_string(),
            })?;
            let id = compute_id(&record)?;
            if self.ids.contains_key(&id) {
                return Err(Error::DuplicateIdentifier(id));
            }
            let pos = self.slots.len();
            self.ids.insert(id, pos);
            self.by_kind.entry(record.kind()).or_default().push(pos);
            self.slots.push(Some(Slot {
                record,
                line: line.to_string(),
            }));
        }
        self.graph = ReferenceGraph::build(self.slots.iter().flatten().map(|s| &s.record))?;
        Ok(())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn codec(&self) -> &dyn Codec {
        self.codec.as_ref()
    }

    pub fn graph(&self) -> &ReferenceGraph {
        &self.graph
    }

    /// Number of live records
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Number of deleted slots in this session
    pub fn tombstones(&self) -> usize {
        self.slots.iter().filter(|s| s.is_none()).count()
    }

    pub fn id_exists(&self, id: &str) -> bool {
        self.ids.contains_key(id)
    }

    fn slot(&self, id: &str) -> Result<(usize, &Slot)> {
        let pos = *self.ids.get(id).ok_or_else(|| Error::NotFound(id.to_string()))?;
        let slot = self.slots[pos]
            .as_ref()
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        Ok((pos, slot))
    }

    /// Get a live record by identifier
    pub fn read(&self, id: &str) -> Result<&Record> {
        self.slot(id).map(|(_, s)| &s.record)
    }

    /// Encoded line of a live record
    pub fn line(&self, id: &str) -> Result<&str> {
        self.slot(id).map(|(_, s)| s.line.as_str())
    }

    /// 1-based line number; stable for the whole session
    pub fn line_number(&self, id: &str) -> Result<usize> {
        self.slot(id).map(|(pos, _)| pos + 1)
    }

    pub fn kind_of(&self, id: &str) -> Option<RecordKind> {
        self.read(id).ok().map(Record::kind)
    }

    /// Live records with their line numbers, in file order
    pub fn records(&self) -> impl Iterator<Item = (usize, &Record)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(pos, s)| s.as_ref().map(|s| (pos + 1, &s.record)))
    }

    /// Live records of one kind, in file order
    pub fn records_of_kind(&self, kind: RecordKind) -> Vec<&Record> {
        self.by_kind
            .get(&kind)
            .map(|positions| {
                positions
                    .iter()
                    .filter_map(|pos| self.slots[*pos].as_ref().map(|s| &s.record))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Live lines, in file order
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().flatten().map(|s| s.line.as_str())
    }

    /// Line number and text of the record behind graph node `key`.
    ///
    /// `None` for placeholders, including ids held by a record of another kind.
    pub fn locate(&self, key: &NodeKey) -> Option<(usize, &str)> {
        let (pos, slot) = self.slot(&key.id).ok()?;
        (slot.record.kind() == key.kind).then_some((pos + 1, slot.line.as_str()))
    }

    /// Records of kind `target` referenced by record `id`
    pub fn refs(&self, id: &str, target: RecordKind) -> Result<Vec<&Record>> {
        let kind = self.read(id)?.kind();
        self.resolve_all(target, self.graph.references(kind, id, target))
    }

    /// Records of kind `source` referencing record `id`
    pub fn ref_by(&self, id: &str, source: RecordKind) -> Result<Vec<&Record>> {
        let kind = self.read(id)?.kind();
        self.resolve_all(source, self.graph.referenced_by(kind, id, source))
    }

    fn resolve_all(&self, kind: RecordKind, ids: &[String]) -> Result<Vec<&Record>> {
        ids.iter()
            .map(|other| match self.read(other) {
                Ok(record) if record.kind() == kind => Ok(record),
                _ => Err(Error::UnknownIdentifier(other.clone())),
            })
            .collect()
    }

    /// Encode a record handed over as a value. Content the codec cannot
    /// read back identically (stray separators, empty fields) is refused.
    fn encode_checked(&self, record: &Record) -> Result<String> {
        let line = self.codec.encode(record);
        if &self.codec.decode(&line)? != record {
            return Err(Error::MalformedRecord(format!(
                "{} record does not survive encoding: {:?}",
                record.kind(),
                line
            )));
        }
        Ok(line)
    }

    /// Add a new record at the end of the file
    pub fn create(&mut self, record: Record) -> Result<String> {
        let id = compute_id(&record)?;
        if self.ids.contains_key(&id) {
            return Err(Error::DuplicateIdentifier(id));
        }
        let line = self.encode_checked(&record)?;
        self.backup_once()?;

        let kind = record.kind();
        let pos = self.slots.len();
        self.graph.add(kind, &id, &record);
        self.graph.resolve_pending();
        self.slots.push(Some(Slot { record, line }));
        self.ids.insert(id.clone(), pos);
        self.by_kind.entry(kind).or_default().push(pos);

        self.autosave()?;
        Ok(id)
    }

    /// Decode `line` and create the record
    pub fn create_line(&mut self, line: &str) -> Result<String> {
        let record = self.codec.decode(line)?;
        self.create(record)
    }

    /// Replace record `old_id` with `record`, cascading identifier changes.
    ///
    /// Every check runs before the store is touched. Returns the record's
    /// identifier after the update.
    pub fn update(&mut self, old_id: &str, record: Record) -> Result<String> {
        let (pos, slot) = self.slot(old_id)?;
        let stored = slot.record.kind();
        if stored != record.kind() {
            return Err(Error::KindMismatch {
                id: old_id.to_string(),
                stored,
                given: record.kind(),
            });
        }
        if slot.record == record {
            return Ok(old_id.to_string());
        }
        let new_id = compute_id(&record)?;
        self.encode_checked(&record)?;
        let change = Change {
            pos,
            kind: stored,
            old_id: old_id.to_string(),
            new_id: new_id.clone(),
            record,
        };
        let changes = self.plan(change)?;
        self.backup_once()?;
        self.apply(changes);
        self.autosave()?;
        Ok(new_id)
    }

    /// Decode `line` and update record `old_id` with it
    pub fn update_line(&mut self, old_id: &str, line: &str) -> Result<String> {
        let record = self.codec.decode(line)?;
        self.update(old_id, record)
    }

    /// Work out every record touched by an update, without mutating.
    ///
    /// Referrers of a renamed record get their content rewritten; if that
    /// changes their own identifier they are renamed in turn. A record
    /// renamed twice means the cascade would not terminate.
    fn plan(&self, first: Change) -> Result<Vec<Change>> {
        let mut queue = VecDeque::new();
        let mut renamed: HashSet<usize> = HashSet::new();
        if first.old_id != first.new_id {
            queue.push_back((first.kind, first.old_id.clone(), first.new_id.clone()));
            renamed.insert(0);
        }
        let mut by_pos: HashMap<usize, usize> = HashMap::from([(first.pos, 0)]);
        let mut changes = vec![first];

        while let Some((kind, old, new)) = queue.pop_front() {
            let mut seen = HashSet::new();
            for referrer in self.graph.neighbors(kind, &old, Direction::Incoming) {
                if !seen.insert(referrer.clone()) {
                    continue;
                }
                let Some(&pos) = self.ids.get(&referrer.id) else {
                    continue;
                };
                let index = match by_pos.get(&pos) {
                    Some(&index) => index,
                    None => {
                        let (_, slot) = self.slot(&referrer.id)?;
                        changes.push(Change {
                            pos,
                            kind: referrer.kind,
                            old_id: referrer.id.clone(),
                            new_id: referrer.id.clone(),
                            record: slot.record.clone(),
                        });
                        by_pos.insert(pos, changes.len() - 1);
                        changes.len() - 1
                    }
                };
                // a record's own content is what the caller passed in
                if changes[index].old_id == old {
                    continue;
                }
                let change = &mut changes[index];
                change.record = rewrite(&change.record, kind, &old, &new)?;
                let next_id = compute_id(&change.record)?;
                if next_id != change.new_id {
                    if !renamed.insert(index) {
                        return Err(Error::RenameCycle(change.old_id.clone()));
                    }
                    queue.push_back((change.kind, change.new_id.clone(), next_id.clone()));
                    change.new_id = next_id;
                }
            }
        }

        self.check_renames(&changes)?;
        Ok(changes)
    }

    fn check_renames(&self, changes: &[Change]) -> Result<()> {
        let vacated: HashSet<&str> = changes
            .iter()
            .filter(|c| c.old_id != c.new_id)
            .map(|c| c.old_id.as_str())
            .collect();
        let mut claimed = HashSet::new();
        for change in changes.iter().filter(|c| c.old_id != c.new_id) {
            let taken = self.ids.contains_key(&change.new_id) && !vacated.contains(change.new_id.as_str());
            if taken || !claimed.insert(change.new_id.as_str()) {
                return Err(Error::DuplicateIdentifier(change.new_id.clone()));
            }
        }
        Ok(())
    }

    fn apply(&mut self, changes: Vec<Change>) {
        for change in changes.iter().filter(|c| c.old_id != c.new_id) {
            self.ids.remove(&change.old_id);
        }
        for change in changes.iter().filter(|c| c.old_id != c.new_id) {
            self.ids.insert(change.new_id.clone(), change.pos);
            self.graph.rename_node(change.kind, &change.old_id, &change.new_id);
        }
        for change in changes {
            self.graph.replace_outgoing(change.kind, &change.new_id, &change.record);
            let line = self.codec.encode(&change.record);
            self.slots[change.pos] = Some(Slot {
                record: change.record,
                line,
            });
        }
        self.graph.resolve_pending();
    }

    /// Tombstone a record. Records referencing it are left as they are.
    pub fn delete(&mut self, id: &str) -> Result<Record> {
        let (pos, _) = self.slot(id)?;
        self.backup_once()?;
        let slot = self.slots[pos]
            .take()
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        let kind = slot.record.kind();
        self.ids.remove(id);
        if let Some(positions) = self.by_kind.get_mut(&kind) {
            positions.retain(|p| *p != pos);
        }
        self.graph.remove(kind, id);
        self.autosave()?;
        Ok(slot.record)
    }

    /// Fresh identifier for a new record, checked against the live set
    pub fn generate_id(&self, kind: RecordKind, subtype: &str, fields: &IdFields<'_>) -> Result<String> {
        identifier::generate_id(self, kind, subtype, fields, None)
    }

    /// Mnemonic attribute identifier
    pub fn generate_attribute_id(&self, unit_id: &str, mode: &str) -> String {
        identifier::generate_attribute_id(self, unit_id, mode, None)
    }

    /// Mnemonic group identifier
    pub fn generate_group_id(&self, name: &str, group_type: &str) -> String {
        identifier::generate_group_id(self, name, group_type, None)
    }

    /// Mnemonic unit identifier
    pub fn generate_unit_id(&self, unit_type: &str, symbol: &str, description: &str, definition: &str) -> String {
        identifier::generate_unit_id(self, unit_type, symbol, description, definition, None)
    }

    /// Consistency report: broken mirrors, dangling references, unresolved evidence
    pub fn check(&self) -> CheckReport {
        let broken_edges = self.graph.verify().err().unwrap_or_default();
        let dangling = self
            .graph
            .dangling()
            .into_iter()
            .map(|key| {
                let referrers = self.graph.neighbors(key.kind, &key.id, Direction::Incoming);
                (key, referrers)
            })
            .collect();
        let unresolved_evidence = self
            .graph
            .pending_evidence()
            .map(|(id, rules)| (id.to_string(), rules.to_vec()))
            .collect();
        CheckReport {
            broken_edges,
            dangling,
            unresolved_evidence,
        }
    }

    /// Write all live lines back to the store's file
    pub fn save(&self) -> Result<()> {
        match &self.path {
            Some(path) => persist::write_lines(path, self.lines()),
            None => {
                tracing::debug!("In-memory store, nothing to save");
                Ok(())
            }
        }
    }

    fn autosave(&self) -> Result<()> {
        if self.options.autosave {
            self.save()?;
        }
        Ok(())
    }

    fn backup_once(&mut self) -> Result<()> {
        if self.options.backup && !self.backed_up {
            if let Some(path) = &self.path {
                persist::backup(path)?;
            }
            self.backed_up = true;
        }
        Ok(())
    }
}

impl IdLookup for RecordStore {
    fn id_exists(&self, id: &str) -> bool {
        self.ids.contains_key(id)
    }
}
