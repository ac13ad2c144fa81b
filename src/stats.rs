//! Corpus statistics
//!
//! Read-only summary of a store: record counts by kind and by subtype, rule
//! usage and the state of the reference graph.

use crate::graph::GraphStats;
use crate::kind::RecordKind;
use crate::record::{GroupRef, Record};
use crate::references::{COMBINED_GROUP, INVERTED_GROUP};
use crate::store::RecordStore;
use crate::ui::table::counts_table;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Portion label of a rule group that covers the whole group
const WHOLE_GROUP: &str = "all";

type Counts<K> = BTreeMap<K, usize>;

/// Usage of one rule kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuleStats {
    pub total: usize,
    /// Number of evidence ids cited -> number of rules
    pub by_sources: Counts<usize>,
    pub by_operator: Counts<String>,
    /// Group portion (`all` when unrestricted) -> group slots
    pub by_portion: Counts<String>,
    /// Number of attribute slots -> number of rules
    pub by_attribute_count: Counts<usize>,
    /// Distinct attributes cited
    pub attributes_used: usize,
    /// Distinct groups cited
    pub groups_used: usize,
}

#[derive(Default)]
struct RuleUsage {
    stats: RuleStats,
    attributes: BTreeSet<String>,
    groups: BTreeSet<String>,
}

impl RuleUsage {
    fn add(&mut self, sources: usize, attributes: &[String], groups: &[&GroupRef], operator: &str) {
        self.stats.total += 1;
        *self.stats.by_sources.entry(sources).or_default() += 1;
        *self.stats.by_operator.entry(operator.to_string()).or_default() += 1;
        *self.stats.by_attribute_count.entry(attributes.len()).or_default() += 1;
        self.attributes.extend(attributes.iter().cloned());
        for group in groups {
            let portion = group.portion.as_deref().unwrap_or(WHOLE_GROUP);
            *self.stats.by_portion.entry(portion.to_string()).or_default() += 1;
            self.groups.insert(group.id.clone());
        }
    }

    fn finish(mut self) -> RuleStats {
        self.stats.attributes_used = self.attributes.len();
        self.stats.groups_used = self.groups.len();
        self.stats
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CorpusStats {
    pub total_records: usize,
    pub by_kind: Counts<RecordKind>,
    pub groups_by_type: Counts<String>,
    /// Group type -> definition prefix (text before the first `:`), for
    /// groups that are not boolean expressions
    pub group_definition_prefixes: BTreeMap<String, Counts<String>>,
    pub units_by_type: Counts<String>,
    pub attributes_by_mode: Counts<String>,
    /// Unit type -> attribute mode, for attributes of live units
    pub attribute_modes_by_unit_type: BTreeMap<String, Counts<String>>,
    /// Number of attributes -> number of units having that many
    pub units_by_attribute_count: Counts<usize>,
    pub models_by_resource: Counts<String>,
    pub units_with_models: usize,
    pub validating_rules: RuleStats,
    pub comparative_rules: RuleStats,
    pub graph: GraphStats,
    pub tombstones: usize,
}

impl CorpusStats {
    pub fn collect(store: &RecordStore) -> Self {
        let mut stats = Self {
            graph: store.graph().stats(),
            tombstones: store.tombstones(),
            ..Default::default()
        };
        let mut attributes_per_unit: Counts<&str> = BTreeMap::new();
        let mut validating = RuleUsage::default();
        let mut comparative = RuleUsage::default();

        for (_, record) in store.records() {
            stats.total_records += 1;
            *stats.by_kind.entry(record.kind()).or_default() += 1;
            match record {
                Record::Group(g) => {
                    *stats.groups_by_type.entry(g.group_type.clone()).or_default() += 1;
                    if g.group_type != COMBINED_GROUP && g.group_type != INVERTED_GROUP {
                        let prefix = g.definition.split(':').next().unwrap_or_default();
                        *stats
                            .group_definition_prefixes
                            .entry(g.group_type.clone())
                            .or_default()
                            .entry(prefix.to_string())
                            .or_default() += 1;
                    }
                }
                Record::Unit(u) => *stats.units_by_type.entry(u.unit_type.clone()).or_default() += 1,
                Record::Attribute(a) => {
                    *stats.attributes_by_mode.entry(a.mode.mode.clone()).or_default() += 1;
                    *attributes_per_unit.entry(a.unit_id.as_str()).or_default() += 1;
                    if let Ok(Record::Unit(u)) = store.read(&a.unit_id) {
                        *stats
                            .attribute_modes_by_unit_type
                            .entry(u.unit_type.clone())
                            .or_default()
                            .entry(a.mode.mode.clone())
                            .or_default() += 1;
                    }
                }
                Record::Model(m) => *stats.models_by_resource.entry(m.resource_id.clone()).or_default() += 1,
                Record::ValidatingRule(v) => validating.add(
                    v.sources.len(),
                    std::slice::from_ref(&v.attribute),
                    &[&v.group],
                    &v.operator,
                ),
                Record::ComparativeRule(c) => comparative.add(
                    c.sources.len(),
                    &c.attributes,
                    &[&c.group1, &c.group2],
                    &c.operator,
                ),
                Record::Document(_) | Record::Source(_) | Record::TextSource(_) => {}
            }
        }

        for count in attributes_per_unit.values() {
            *stats.units_by_attribute_count.entry(*count).or_default() += 1;
        }
        stats.validating_rules = validating.finish();
        stats.comparative_rules = comparative.finish();
        stats.units_with_models = store
            .records_of_kind(RecordKind::Unit)
            .iter()
            .filter_map(|r| match r {
                Record::Unit(u) => Some(u.id.as_str()),
                _ => None,
            })
            .filter(|id| {
                store
                    .graph()
                    .referenced_by(RecordKind::Unit, id, RecordKind::Model)
                    .iter()
                    .any(|m| store.id_exists(m))
            })
            .count();
        stats
    }

    /// One table per section, separated by blank lines
    pub fn render(&self) -> String {
        let mut sections = Vec::new();

        let mut overview: Vec<(&str, usize)> = vec![("records", self.total_records)];
        overview.extend(self.by_kind.iter().map(|(k, n)| (k.as_str(), *n)));
        overview.extend([
            ("units with models", self.units_with_models),
            ("edges", self.graph.edges),
            ("dangling references", self.graph.placeholders),
            ("unresolved evidence", self.graph.pending),
            ("deleted this session", self.tombstones),
        ]);
        sections.push(counts_table(overview));

        for map in [
            &self.groups_by_type,
            &self.units_by_type,
            &self.attributes_by_mode,
            &self.models_by_resource,
        ] {
            push_counts(&mut sections, map.iter().map(|(k, n)| (k.clone(), *n)));
        }
        for nested in [&self.group_definition_prefixes, &self.attribute_modes_by_unit_type] {
            push_counts(
                &mut sections,
                nested
                    .iter()
                    .flat_map(|(outer, inner)| inner.iter().map(move |(k, n)| (format!("{} / {}", outer, k), *n))),
            );
        }
        push_counts(
            &mut sections,
            self.units_by_attribute_count
                .iter()
                .map(|(count, n)| (format!("units with {} attribute(s)", count), *n)),
        );
        for (kind, rules) in [
            (RecordKind::ValidatingRule, &self.validating_rules),
            (RecordKind::ComparativeRule, &self.comparative_rules),
        ] {
            if rules.total > 0 {
                sections.push(rules.render(kind));
            }
        }
        sections.join("\n\n")
    }
}

impl RuleStats {
    fn render(&self, kind: RecordKind) -> String {
        let mut rows: Vec<(String, usize)> = vec![
            (kind.as_str().to_string(), self.total),
            ("attributes used".to_string(), self.attributes_used),
            ("groups used".to_string(), self.groups_used),
        ];
        rows.extend(self.by_sources.iter().map(|(s, n)| (format!("with {} source(s)", s), *n)));
        rows.extend(self.by_attribute_count.iter().map(|(a, n)| (format!("with {} attribute(s)", a), *n)));
        rows.extend(self.by_operator.iter().map(|(op, n)| (format!("operator {}", op), *n)));
        rows.extend(self.by_portion.iter().map(|(p, n)| (format!("portion {}", p), *n)));
        counts_table(rows.iter().map(|(l, n)| (l.as_str(), *n)))
    }
}

fn push_counts(sections: &mut Vec<String>, rows: impl Iterator<Item = (String, usize)>) {
    let rows: Vec<(String, usize)> = rows.collect();
    if !rows.is_empty() {
        sections.push(counts_table(rows.iter().map(|(l, n)| (l.as_str(), *n))));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect() {
        let mut store = RecordStore::from_lines([
            "D\tncbi:1",
            "S\tS1\tncbi:1\tfig 1",
            "S\tS2\tncbi:1\tfig 2",
            "G\tGt_a\ttaxonomic\ta\tNCBITaxon:1",
            "G\tGt_b\ttaxonomic\tb\tNCBITaxon:2",
            "G\tGc_ab\tcombined\tab\tGt_a | Gt_b",
            "U\tUg_x\tspecific_gene\tx\t.\t.",
            "U\tUg_y\tspecific_gene\ty\t.\t.",
            "A\tAp_x\tUg_x\tpresence",
            "A\tAc_x\tUg_x\tcount",
            "A\tAp_y\tUg_y\tpresence",
            "M\tUg_x\tpfam\tPF1",
            "M\tUg_y\tpfam\tPF2",
            "V\tV1\tS1,S2\tAp_x\tGt_a:most\t>\t0",
            "V\tV2\tS1\tAp_y\tGt_a\t>\t0",
            "C\tC1\tS1\tAp_x,Ac_x\tGt_a\tGt_b\t>",
        ])
        .unwrap();
        store.delete("Gt_b").unwrap();

        let stats = CorpusStats::collect(&store);
        assert_eq!(stats.total_records, 15);
        assert_eq!(stats.by_kind[&RecordKind::Source], 2);
        assert_eq!(stats.groups_by_type["taxonomic"], 1);
        assert_eq!(stats.group_definition_prefixes["taxonomic"]["NCBITaxon"], 1);
        assert!(!stats.group_definition_prefixes.contains_key("combined"));
        assert_eq!(stats.units_by_type["specific_gene"], 2);
        assert_eq!(stats.attributes_by_mode["presence"], 2);
        assert_eq!(stats.attribute_modes_by_unit_type["specific_gene"]["count"], 1);
        assert_eq!(stats.units_by_attribute_count[&2], 1);
        assert_eq!(stats.units_by_attribute_count[&1], 1);
        assert_eq!(stats.models_by_resource["pfam"], 2);
        assert_eq!(stats.units_with_models, 2);

        let v = &stats.validating_rules;
        assert_eq!(v.total, 2);
        assert_eq!(v.by_sources[&2], 1);
        assert_eq!(v.by_sources[&1], 1);
        assert_eq!(v.by_operator[">"], 2);
        assert_eq!(v.by_portion["most"], 1);
        assert_eq!(v.by_portion["all"], 1);
        assert_eq!(v.attributes_used, 2);
        assert_eq!(v.groups_used, 1);

        let c = &stats.comparative_rules;
        assert_eq!(c.total, 1);
        assert_eq!(c.by_attribute_count[&2], 1);
        assert_eq!(c.by_portion["all"], 2);
        assert_eq!(c.groups_used, 2);

        assert_eq!(stats.graph.placeholders, 1);
        assert_eq!(stats.tombstones, 1);
    }

    #[test]
    fn test_render_and_json() {
        let store = RecordStore::from_lines([
            "U\tUg_x\tspecific_gene\tx\t.\t.",
            "A\tAp_x\tUg_x\tpresence",
            "G\tGt_a\ttaxonomic\ta\tNCBITaxon:1",
            "V\tV1\tS1\tAp_x\tGt_a\t>\t0",
        ])
        .unwrap();
        let stats = CorpusStats::collect(&store);
        let text = stats.render();
        assert!(text.contains("specific_gene"));
        assert!(text.contains("unit"));
        assert!(text.contains("specific_gene / presence"));
        assert!(text.contains("operator >"));
        assert!(!text.contains("comparative_rule"));

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["total_records"], 4);
        assert_eq!(json["units_by_type"]["specific_gene"], 1);
        assert_eq!(json["validating_rules"]["by_operator"][">"], 1);
    }
}
