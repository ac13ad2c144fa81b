//! Context extraction
//!
//! Starting from one record, collects the records that give it meaning:
//! the document behind an evidence, the rules citing it, the groups and
//! attributes of those rules, the units behind the attributes, and so on.
//!
//! The walk is a preorder depth-first traversal driven by an explicit stack.
//! How a node is expanded depends on its kind and on how it was reached
//! ([`Expansion`]); [`Expansion::steps`] is the single dispatch table. A
//! global visited set guarantees every record is listed once, whatever the
//! cycles or diamonds in the graph.

use crate::edge::{Direction, NodeKey};
use crate::kind::RecordKind;
use crate::store::RecordStore;
use crate::{Error, Result};
use serde::Serialize;
use std::collections::HashSet;

/// Kinds of one class, in declaration order
fn kinds(class: fn(&RecordKind) -> bool) -> impl Iterator<Item = RecordKind> {
    RecordKind::all().iter().copied().filter(move |kind| class(kind))
}

/// How a node is expanded once listed
#[derive(Debug, Clone, PartialEq, Eq)]
enum Expansion {
    Document {
        climb_evidence: bool,
    },
    Evidence {
        follow_document: bool,
        climb_rules: bool,
    },
    Rule {
        follow_groups: bool,
        exclude_group: Option<String>,
        follow_attributes: bool,
        exclude_attribute: Option<String>,
        follow_evidence: bool,
    },
    Group {
        follow_groups: bool,
        climb_groups: bool,
        exclude_group: Option<String>,
        climb_rules: bool,
    },
    Attribute {
        follow_units: bool,
        exclude_unit: Option<String>,
        climb_rules: bool,
    },
    Unit {
        follow_units: bool,
        climb_units: bool,
        exclude_unit: Option<String>,
        follow_models: bool,
        climb_attributes: bool,
    },
    Model,
    /// Keep going in one direction through records of the same kind
    Walk {
        direction: Direction,
        with_models: bool,
    },
    /// Listed, not expanded
    Inline,
}

/// One fan-out of a node: neighbors of `target` kind in `direction`
struct Step {
    direction: Direction,
    target: RecordKind,
    exclude: Option<String>,
    expansion: Expansion,
}

impl Step {
    fn new(direction: Direction, target: RecordKind, expansion: Expansion) -> Self {
        Self {
            direction,
            target,
            exclude: None,
            expansion,
        }
    }

    fn excluding(mut self, id: Option<&str>) -> Self {
        self.exclude = id.map(str::to_string);
        self
    }
}

impl Expansion {
    /// Expansion of the starting record
    fn start(kind: RecordKind, id: &str) -> Self {
        match kind {
            RecordKind::Document => Expansion::Document { climb_evidence: true },
            RecordKind::Source | RecordKind::TextSource => Expansion::Evidence {
                follow_document: true,
                climb_rules: true,
            },
            RecordKind::Group => Expansion::Group {
                follow_groups: true,
                climb_groups: true,
                exclude_group: None,
                climb_rules: true,
            },
            RecordKind::Unit => Expansion::Unit {
                follow_units: true,
                climb_units: true,
                exclude_unit: Some(id.to_string()),
                follow_models: true,
                climb_attributes: true,
            },
            RecordKind::Attribute => Expansion::Attribute {
                follow_units: true,
                exclude_unit: None,
                climb_rules: true,
            },
            RecordKind::Model => Expansion::Model,
            RecordKind::ValidatingRule | RecordKind::ComparativeRule => Expansion::Rule {
                follow_groups: true,
                exclude_group: None,
                follow_attributes: true,
                exclude_attribute: None,
                follow_evidence: true,
            },
        }
    }

    /// Fan-out of a node of `kind` named `id`, in listing order
    fn steps(&self, kind: RecordKind, id: &str) -> Vec<Step> {
        use Direction::{Incoming, Outgoing};
        let mut steps = Vec::new();
        match self {
            Expansion::Document { climb_evidence } => {
                if *climb_evidence {
                    for target in kinds(RecordKind::is_evidence) {
                        steps.push(Step::new(
                            Incoming,
                            target,
                            Expansion::Evidence {
                                follow_document: false,
                                climb_rules: true,
                            },
                        ));
                    }
                }
            }
            Expansion::Evidence {
                follow_document,
                climb_rules,
            } => {
                if *follow_document {
                    steps.push(Step::new(
                        Outgoing,
                        RecordKind::Document,
                        Expansion::Document { climb_evidence: false },
                    ));
                }
                if *climb_rules {
                    for target in kinds(RecordKind::is_rule) {
                        steps.push(Step::new(
                            Incoming,
                            target,
                            Expansion::Rule {
                                follow_groups: true,
                                exclude_group: None,
                                follow_attributes: true,
                                exclude_attribute: None,
                                follow_evidence: false,
                            },
                        ));
                    }
                }
            }
            Expansion::Rule {
                follow_groups,
                exclude_group,
                follow_attributes,
                exclude_attribute,
                follow_evidence,
            } => {
                if *follow_groups {
                    steps.push(
                        Step::new(
                            Outgoing,
                            RecordKind::Group,
                            Expansion::Group {
                                follow_groups: true,
                                climb_groups: false,
                                exclude_group: exclude_group.clone(),
                                climb_rules: false,
                            },
                        )
                        .excluding(exclude_group.as_deref()),
                    );
                }
                if *follow_attributes {
                    steps.push(
                        Step::new(
                            Outgoing,
                            RecordKind::Attribute,
                            Expansion::Attribute {
                                follow_units: true,
                                exclude_unit: None,
                                climb_rules: false,
                            },
                        )
                        .excluding(exclude_attribute.as_deref()),
                    );
                }
                if *follow_evidence {
                    for target in kinds(RecordKind::is_evidence) {
                        steps.push(Step::new(
                            Outgoing,
                            target,
                            Expansion::Evidence {
                                follow_document: true,
                                climb_rules: false,
                            },
                        ));
                    }
                }
            }
            Expansion::Group {
                follow_groups,
                climb_groups,
                exclude_group,
                climb_rules,
            } => {
                let walk = |direction| Expansion::Walk {
                    direction,
                    with_models: false,
                };
                if *follow_groups {
                    steps.push(
                        Step::new(Outgoing, RecordKind::Group, walk(Outgoing))
                            .excluding(exclude_group.as_deref()),
                    );
                }
                if *climb_groups {
                    steps.push(
                        Step::new(Incoming, RecordKind::Group, walk(Incoming))
                            .excluding(exclude_group.as_deref()),
                    );
                }
                if *climb_rules {
                    for target in kinds(RecordKind::is_rule) {
                        steps.push(Step::new(
                            Incoming,
                            target,
                            Expansion::Rule {
                                follow_groups: true,
                                exclude_group: Some(id.to_string()),
                                follow_attributes: true,
                                exclude_attribute: None,
                                follow_evidence: true,
                            },
                        ));
                    }
                }
            }
            Expansion::Attribute {
                follow_units,
                exclude_unit,
                climb_rules,
            } => {
                if *follow_units {
                    steps.push(
                        Step::new(
                            Outgoing,
                            RecordKind::Unit,
                            Expansion::Unit {
                                follow_units: true,
                                climb_units: false,
                                exclude_unit: exclude_unit.clone(),
                                follow_models: true,
                                climb_attributes: false,
                            },
                        )
                        .excluding(exclude_unit.as_deref()),
                    );
                }
                if *climb_rules {
                    for target in kinds(RecordKind::is_rule) {
                        steps.push(Step::new(
                            Incoming,
                            target,
                            Expansion::Rule {
                                follow_groups: true,
                                exclude_group: None,
                                follow_attributes: true,
                                exclude_attribute: Some(id.to_string()),
                                follow_evidence: true,
                            },
                        ));
                    }
                }
            }
            Expansion::Unit {
                follow_units,
                climb_units,
                exclude_unit,
                follow_models,
                climb_attributes,
            } => {
                if *follow_models {
                    steps.push(Step::new(Incoming, RecordKind::Model, Expansion::Inline));
                }
                let walk = |direction| Expansion::Walk {
                    direction,
                    with_models: *follow_models,
                };
                if *follow_units {
                    steps.push(
                        Step::new(Outgoing, RecordKind::Unit, walk(Outgoing)).excluding(exclude_unit.as_deref()),
                    );
                }
                if *climb_units {
                    steps.push(
                        Step::new(Incoming, RecordKind::Unit, walk(Incoming)).excluding(exclude_unit.as_deref()),
                    );
                }
                if *climb_attributes {
                    steps.push(Step::new(
                        Incoming,
                        RecordKind::Attribute,
                        Expansion::Attribute {
                            follow_units: true,
                            exclude_unit: Some(id.to_string()),
                            climb_rules: true,
                        },
                    ));
                }
            }
            Expansion::Model => {
                steps.push(Step::new(
                    Outgoing,
                    RecordKind::Unit,
                    Expansion::Unit {
                        follow_units: true,
                        climb_units: true,
                        exclude_unit: None,
                        follow_models: true,
                        climb_attributes: true,
                    },
                ));
            }
            Expansion::Walk {
                direction,
                with_models,
            } => {
                if *with_models {
                    steps.push(Step::new(Incoming, RecordKind::Model, Expansion::Inline));
                }
                steps.push(Step::new(*direction, kind, self.clone()));
            }
            Expansion::Inline => {}
        }
        steps
    }
}

/// One listed record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextEntry {
    /// 1-based line number in the store
    pub line_number: usize,
    /// Distance from the starting record along the walk
    pub depth: usize,
    pub kind: RecordKind,
    pub id: String,
    /// Encoded line
    pub text: String,
}

/// Result of a context extraction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContextListing {
    pub entries: Vec<ContextEntry>,
    /// Referenced identifiers with no live record behind them
    pub missing: Vec<NodeKey>,
}

impl ContextListing {
    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.id.as_str()).collect()
    }

    /// Text form: one line per entry, optionally numbered and indented by depth
    pub fn render(&self, indented: bool, numbered: bool) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            if numbered {
                out.push_str(&format!("{}\t", entry.line_number));
            }
            if indented {
                out.push_str(&"  ".repeat(entry.depth));
            }
            out.push_str(&entry.text);
            out.push('\n');
        }
        out
    }
}

struct Frame {
    key: NodeKey,
    depth: usize,
    expansion: Expansion,
}

/// Walks the reference graph of a store
pub struct ContextExtractor<'a> {
    store: &'a RecordStore,
}

impl<'a> ContextExtractor<'a> {
    pub fn new(store: &'a RecordStore) -> Self {
        Self { store }
    }

    /// Context of record `id`; fails `UnknownIdentifier` if there is no such record
    pub fn extract(&self, id: &str) -> Result<ContextListing> {
        let kind = self
            .store
            .kind_of(id)
            .ok_or_else(|| Error::UnknownIdentifier(id.to_string()))?;
        let graph = self.store.graph();

        let mut listing = ContextListing::default();
        let mut visited: HashSet<NodeKey> = HashSet::new();
        let mut stack = vec![Frame {
            key: NodeKey::new(kind, id),
            depth: 0,
            expansion: Expansion::start(kind, id),
        }];

        while let Some(frame) = stack.pop() {
            if !visited.insert(frame.key.clone()) {
                continue;
            }
            let Some((line_number, text)) = self.store.locate(&frame.key) else {
                listing.missing.push(frame.key);
                continue;
            };
            listing.entries.push(ContextEntry {
                line_number,
                depth: frame.depth,
                kind: frame.key.kind,
                id: frame.key.id.clone(),
                text: text.to_string(),
            });

            let mut children = Vec::new();
            for step in frame.expansion.steps(frame.key.kind, &frame.key.id) {
                for neighbor in graph.list(frame.key.kind, &frame.key.id, step.direction, step.target) {
                    if step.exclude.as_deref() == Some(neighbor.as_str()) {
                        continue;
                    }
                    let key = NodeKey::new(step.target, neighbor.as_str());
                    if visited.contains(&key) {
                        continue;
                    }
                    children.push(Frame {
                        key,
                        depth: frame.depth + 1,
                        expansion: step.expansion.clone(),
                    });
                }
            }
            stack.extend(children.into_iter().rev());
        }
        Ok(listing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(lines: &[&str], id: &str) -> ContextListing {
        let store = RecordStore::from_lines(lines).unwrap();
        ContextExtractor::new(&store).extract(id).unwrap()
    }

    fn depths(listing: &ContextListing) -> Vec<(&str, usize)> {
        listing.entries.iter().map(|e| (e.id.as_str(), e.depth)).collect()
    }

    const SCENARIO: &[&str] = &[
        "D\tncbi:123",
        "S\tS1\tncbi:123\ttable 1",
        "S\tS2\tncbi:123\ttable 2",
        "G\tGt_x\ttaxonomic\tx\tNCBITaxon:1",
        "U\tUp_z\tspecific_protein\tz\t.\t.",
        "A\tAp_y\tUp_z\tpresence",
        "V\tVall_1\tS1\tAp_y\tGt_x\t>\t0",
    ];

    #[test]
    fn test_document_scenario() {
        let listing = extract(SCENARIO, "D-ncbi-123");
        assert_eq!(
            depths(&listing),
            vec![
                ("D-ncbi-123", 0),
                ("S1", 1),
                ("Vall_1", 2),
                ("Gt_x", 3),
                ("Ap_y", 3),
                ("Up_z", 4),
                ("S2", 1),
            ]
        );
        assert_eq!(listing.entries[0].line_number, 1);
        assert_eq!(listing.entries[2].line_number, 7);
        assert!(listing.missing.is_empty());
    }

    #[test]
    fn test_rule_start_pulls_evidence_and_document() {
        let listing = extract(SCENARIO, "Vall_1");
        assert_eq!(
            depths(&listing),
            vec![
                ("Vall_1", 0),
                ("Gt_x", 1),
                ("Ap_y", 1),
                ("Up_z", 2),
                ("S1", 1),
                ("D-ncbi-123", 2),
            ]
        );
    }

    #[test]
    fn test_unit_start() {
        let lines = [
            "U\tUg_a\tspecific_gene\ta\t.\t.",
            "U\tUh_a\thomolog_gene\t.\t.\thomolog:Ug_a",
            "M\tUg_a\tpfam\tPF1",
            "A\tAp_a\tUg_a\tpresence",
            "V\tV1\tT1\tAp_a\tGt_g\t>\t0",
            "G\tGt_g\ttaxonomic\tg\t.",
            "T\tT1\tpmid:1\tquote",
        ];
        let listing = extract(&lines, "Ug_a");
        assert_eq!(
            depths(&listing),
            vec![
                ("Ug_a", 0),
                ("M-Ug_a-pfam-PF1", 1),
                ("Uh_a", 1),
                ("Ap_a", 1),
                ("V1", 2),
                ("Gt_g", 3),
                ("T1", 3),
            ]
        );
        // the triggering attribute is not listed again under the rule
        assert_eq!(listing.ids().iter().filter(|id| **id == "Ap_a").count(), 1);
        // T1 references a document that has no record
        assert_eq!(listing.missing, vec![NodeKey::new(RecordKind::Document, "D-pmid-1")]);
    }

    #[test]
    fn test_cyclic_groups_terminate() {
        let lines = [
            "G\tGc_a\tcombined\ta\tGc_b",
            "G\tGc_b\tcombined\tb\tGc_c",
            "G\tGc_c\tcombined\tc\tGc_a",
        ];
        let listing = extract(&lines, "Gc_a");
        assert_eq!(listing.ids(), vec!["Gc_a", "Gc_b", "Gc_c"]);
        assert_eq!(depths(&listing)[2], ("Gc_c", 2));
    }

    #[test]
    fn test_diamond_lists_once() {
        let lines = [
            "G\tGt_base\ttaxonomic\tbase\t.",
            "G\tGc_l\tcombined\tl\tGt_base",
            "G\tGc_r\tcombined\tr\tGt_base",
            "G\tGc_top\tcombined\ttop\tGc_l & Gc_r",
        ];
        let listing = extract(&lines, "Gc_top");
        assert_eq!(listing.ids(), vec!["Gc_top", "Gc_l", "Gt_base", "Gc_r"]);
    }

    #[test]
    fn test_neighbor_of_wrong_kind_is_missing() {
        let lines = ["G\tGt_a\ttaxonomic\ta\t.", "A\tAp_x\tGt_a\tpresence"];
        let listing = extract(&lines, "Ap_x");
        assert_eq!(listing.ids(), vec!["Ap_x"]);
        assert_eq!(listing.missing, vec![NodeKey::new(RecordKind::Unit, "Gt_a")]);
    }

    #[test]
    fn test_evidence_kind_follows_live_record() {
        let mut store = RecordStore::from_lines(SCENARIO).unwrap();
        store.delete("S1").unwrap();
        store.create_line("T\tS1\tncbi:123\tquoted").unwrap();

        let listing = ContextExtractor::new(&store).extract("Vall_1").unwrap();
        let s1 = listing.entries.iter().find(|e| e.id == "S1").unwrap();
        assert_eq!(s1.kind, RecordKind::TextSource);
        assert!(listing.missing.is_empty());
    }

    #[test]
    fn test_unknown_start() {
        let store = RecordStore::from_lines(SCENARIO).unwrap();
        let err = ContextExtractor::new(&store).extract("nope").unwrap_err();
        assert!(matches!(err, Error::UnknownIdentifier(id) if id == "nope"));
    }

    #[test]
    fn test_render() {
        let listing = extract(SCENARIO, "S2");
        assert_eq!(
            listing.render(true, true),
            "3\tS\tS2\tncbi:123\ttable 2\n1\t  D\tncbi:123\n"
        );
        assert_eq!(listing.render(false, false), "S\tS2\tncbi:123\ttable 2\nD\tncbi:123\n");
    }

    #[test]
    fn test_listing_serializes() {
        let listing = extract(SCENARIO, "S2");
        let json = serde_json::to_value(&listing).unwrap();
        assert_eq!(json["entries"][1]["kind"], "Document");
        assert_eq!(json["entries"][1]["depth"], 1);
    }
}
