//! Identifier resolution and generation
//!
//! Identifiers are unique across the whole store, not per kind. Most kinds
//! store their identifier explicitly; Documents and Models derive it from
//! other fields, which is why renames can cascade (see `store`).

use crate::kind::RecordKind;
use crate::record::{Record, ID_DELIMITER, PLACEHOLDER};
use crate::{Error, Result};
use std::collections::{HashMap, HashSet};

/// Check the identifier alphabet: letters, digits and underscore
pub fn is_valid_id(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Canonical identifier of a record
pub fn compute_id(record: &Record) -> Result<String> {
    match record {
        Record::Document(r) => composite(record.kind(), &["D", &r.link.prefix, &r.link.item]),
        Record::Model(r) => composite(record.kind(), &["M", &r.unit_id, &r.resource_id, &r.model_id]),
        Record::Source(r) => explicit(record.kind(), &r.id),
        Record::TextSource(r) => explicit(record.kind(), &r.id),
        Record::Group(r) => explicit(record.kind(), &r.id),
        Record::Unit(r) => explicit(record.kind(), &r.id),
        Record::Attribute(r) => explicit(record.kind(), &r.id),
        Record::ValidatingRule(r) => explicit(record.kind(), &r.id),
        Record::ComparativeRule(r) => explicit(record.kind(), &r.id),
    }
}

fn explicit(kind: RecordKind, id: &str) -> Result<String> {
    if id.is_empty() {
        return Err(Error::MalformedRecord(format!("{} record without identifier", kind)));
    }
    if !is_valid_id(id) {
        return Err(Error::MalformedRecord(format!("{} record: invalid identifier '{}'", kind, id)));
    }
    Ok(id.to_string())
}

/// Join the parts of a derived identifier; a part holding the delimiter
/// would make the result ambiguous
fn composite(kind: RecordKind, parts: &[&str]) -> Result<String> {
    if parts.iter().any(|p| p.is_empty()) {
        return Err(Error::MalformedRecord(format!(
            "{} record: identifier component missing",
            kind
        )));
    }
    if let Some(part) = parts.iter().find(|p| p.contains(ID_DELIMITER)) {
        return Err(Error::MalformedRecord(format!(
            "{} record: '{}' must not contain '{}'",
            kind, part, ID_DELIMITER
        )));
    }
    Ok(parts.join(&ID_DELIMITER.to_string()))
}

/// Anything that can answer "is this identifier taken?"
pub trait IdLookup {
    fn id_exists(&self, id: &str) -> bool;
}

impl IdLookup for HashSet<String> {
    fn id_exists(&self, id: &str) -> bool {
        self.contains(id)
    }
}

impl<V> IdLookup for HashMap<String, V> {
    fn id_exists(&self, id: &str) -> bool {
        self.contains_key(id)
    }
}

fn attribute_mode_prefix(mode: &str) -> Option<&'static str> {
    Some(match mode {
        "complete" => "all",
        "conservation" => "v",
        "count" => "c",
        "members_presence" => "mp",
        "presence" => "p",
        "relative" => "r",
        "relative_length" => "rl",
        _ => return None,
    })
}

fn group_type_prefix(group_type: &str) -> Option<&'static str> {
    if group_type.ends_with("_requirement") {
        return Some("r");
    }
    Some(match group_type {
        "requirement" | "specific_nutrient_availablity" => "r",
        "biological_interaction" => "i",
        "biological_interaction_partner_taxonomy" => "ip",
        "combined" => "c",
        "cultiviability" => "cv",
        "geographical" => "g",
        "gram_stain" => "gs",
        "habitat" => "h",
        "inverted" => "n",
        "metabolic" => "m",
        "metagenome_assembled" => "ma",
        "paraphyletic" => "pt",
        "resultive_disease_symptom" => "d",
        "strain" => "s",
        "taxis" => "x",
        "taxonomic" => "t",
        "trophic_strategy" => "ts",
        _ => return None,
    })
}

fn unit_type_prefix(unit_type: &str) -> Option<&'static str> {
    Some(match unit_type {
        "amino_acid" => "aa",
        "base" => "b",
        "family_or_domain" => "d",
        "feature_type" => "t",
        "function" => "f",
        "homolog_gene" | "homolog_protein" => "h",
        "ortholog_group" => "og",
        "ortholog_groups_category" => "k",
        "protein_complex" => "pc",
        "specific_gene" => "g",
        "specific_protein" => "p",
        "gene_cluster" => "c",
        "gene_system" => "y",
        "metabolic_pathway" => "w",
        "genomic_island" => "i",
        "trophic_strategy" => "ts",
        "unit" => "u",
        _ => return None,
    })
}

/// Prefix used when a subtype has no registered mnemonic
const GENERIC_PREFIX: &str = "x";

/// Replace every character outside the identifier alphabet
fn sanitize(s: &str, replacement: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c.to_string()
            } else {
                replacement.to_string()
            }
        })
        .collect()
}

fn leading(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

fn is_free(ids: &impl IdLookup, candidate: &str, replacing: Option<&str>) -> bool {
    replacing == Some(candidate) || !ids.id_exists(candidate)
}

/// Return `candidate`, or `candidate_<n>` with the smallest n >= 2 that is free
fn with_suffix_if_taken(ids: &impl IdLookup, candidate: String, replacing: Option<&str>) -> String {
    if is_free(ids, &candidate, replacing) {
        return candidate;
    }
    (2..)
        .map(|n| format!("{}_{}", candidate, n))
        .find(|id| is_free(ids, id, replacing))
        .unwrap_or(candidate)
}

/// Mnemonic identifier for a new attribute: `A<mode>_<unit>`
pub fn generate_attribute_id(
    ids: &impl IdLookup,
    unit_id: &str,
    mode: &str,
    replacing: Option<&str>,
) -> String {
    let unit = unit_id.strip_prefix('U').unwrap_or(unit_id);
    let prefix = match attribute_mode_prefix(mode) {
        Some(p) => p.to_string(),
        None => format!("{}{}", GENERIC_PREFIX, sanitize(&leading(mode, 2), "")),
    };
    with_suffix_if_taken(ids, format!("A{}_{}", prefix, unit), replacing)
}

/// Mnemonic identifier for a new group: `G<type>_<name fragment>`
pub fn generate_group_id(
    ids: &impl IdLookup,
    name: &str,
    group_type: &str,
    replacing: Option<&str>,
) -> String {
    let fragment = name
        .split(' ')
        .map(|word| leading(&sanitize(word, ""), 5))
        .collect::<Vec<_>>()
        .join("_");
    let prefix = match group_type_prefix(group_type) {
        Some(p) => p.to_string(),
        None => format!("{}{}", GENERIC_PREFIX, leading(group_type, 1)),
    };
    with_suffix_if_taken(ids, format!("G{}_{}", prefix, fragment), replacing)
}

/// Mnemonic identifier for a new unit: `U<type>_<name>`
///
/// The name comes from the symbol, else the description, else the
/// definition; a one-word definition wins over a multi-word description.
pub fn generate_unit_id(
    ids: &impl IdLookup,
    unit_type: &str,
    symbol: &str,
    description: &str,
    definition: &str,
    replacing: Option<&str>,
) -> String {
    let prefix = match unit_type_prefix(unit_type) {
        Some(p) => p.to_string(),
        None => format!("{}{}", GENERIC_PREFIX, sanitize(&leading(unit_type, 2), "")),
    };
    let mut words: Vec<&str> = if symbol != PLACEHOLDER {
        vec![symbol]
    } else {
        description.split(' ').collect()
    };
    if symbol == PLACEHOLDER && definition != PLACEHOLDER {
        let definition_words: Vec<&str> = definition.split(' ').collect();
        if description == PLACEHOLDER || (words.len() > 1 && definition_words.len() == 1) {
            words = definition_words;
        }
    }
    let words: Vec<String> = words.iter().map(|w| sanitize(w, "_")).collect();
    let name = if words.len() == 1 {
        words[0].clone()
    } else {
        words
            .iter()
            .filter(|w| !w.is_empty())
            .map(|w| leading(w, 5))
            .collect::<Vec<_>>()
            .join("_")
    };
    with_suffix_if_taken(ids, format!("U{}_{}", prefix, name), replacing)
}

/// Sequential identifier `<code><n>` for kinds without descriptive fields
pub fn generate_sequential_id(ids: &impl IdLookup, kind: RecordKind, replacing: Option<&str>) -> String {
    (1..)
        .map(|n| format!("{}{}", kind.code(), n))
        .find(|id| is_free(ids, id, replacing))
        .unwrap_or_else(|| kind.code().to_string())
}

/// Descriptive fields available for identifier generation
#[derive(Debug, Clone, Default)]
pub struct IdFields<'a> {
    pub name: Option<&'a str>,
    pub symbol: Option<&'a str>,
    pub description: Option<&'a str>,
    pub definition: Option<&'a str>,
    pub unit_id: Option<&'a str>,
}

/// Generate a fresh identifier for a record of `kind` and `subtype`
/// (group type, unit type or attribute mode).
///
/// Falls back to a sequential identifier when the fields needed by the
/// mnemonic scheme are missing. Composite-id kinds cannot be named and
/// yield `MalformedRecord`.
pub fn generate_id(
    ids: &impl IdLookup,
    kind: RecordKind,
    subtype: &str,
    fields: &IdFields<'_>,
    replacing: Option<&str>,
) -> Result<String> {
    let id = match kind {
        RecordKind::Document | RecordKind::Model => {
            return Err(Error::MalformedRecord(format!(
                "{} identifiers are derived from the record fields",
                kind
            )));
        }
        RecordKind::Attribute => match fields.unit_id {
            Some(unit_id) => generate_attribute_id(ids, unit_id, subtype, replacing),
            None => generate_sequential_id(ids, kind, replacing),
        },
        RecordKind::Group => match fields.name {
            Some(name) => generate_group_id(ids, name, subtype, replacing),
            None => generate_sequential_id(ids, kind, replacing),
        },
        RecordKind::Unit => {
            let symbol = fields.symbol.unwrap_or(PLACEHOLDER);
            let description = fields.description.unwrap_or(PLACEHOLDER);
            let definition = fields.definition.unwrap_or(PLACEHOLDER);
            if symbol == PLACEHOLDER && description == PLACEHOLDER && definition == PLACEHOLDER {
                generate_sequential_id(ids, kind, replacing)
            } else {
                generate_unit_id(ids, subtype, symbol, description, definition, replacing)
            }
        }
        RecordKind::Source
        | RecordKind::TextSource
        | RecordKind::ValidatingRule
        | RecordKind::ComparativeRule => generate_sequential_id(ids, kind, replacing),
    };
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{DocumentLink, Model};

    fn taken(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_valid_id() {
        assert!(is_valid_id("Ug_lacZ_2"));
        assert!(!is_valid_id(""));
        assert!(!is_valid_id("D-ncbi-1"));
        assert!(!is_valid_id("a b"));
    }

    #[test]
    fn test_compute_composite_ids() {
        let doc = Record::Document(crate::record::Document {
            link: DocumentLink::new("PMID", "42"),
            tags: None,
        });
        assert_eq!(compute_id(&doc).unwrap(), "D-PMID-42");

        let model = Record::Model(Model {
            unit_id: "Ug_lacZ".into(),
            resource_id: "pfam".into(),
            model_id: "PF1".into(),
            tags: None,
        });
        assert_eq!(compute_id(&model).unwrap(), "M-Ug_lacZ-pfam-PF1");

        let broken = Record::Model(Model {
            unit_id: "".into(),
            resource_id: "pfam".into(),
            model_id: "PF1".into(),
            tags: None,
        });
        assert!(matches!(compute_id(&broken), Err(Error::MalformedRecord(_))));

        let ambiguous = Record::Model(Model {
            unit_id: "Ug_lacZ".into(),
            resource_id: "pf-am".into(),
            model_id: "PF1".into(),
            tags: None,
        });
        assert!(matches!(compute_id(&ambiguous), Err(Error::MalformedRecord(_))));
    }

    #[test]
    fn test_compute_explicit_id_checks_alphabet() {
        let unit = |id: &str| {
            Record::Unit(crate::record::Unit {
                id: id.into(),
                unit_type: "specific_gene".into(),
                symbol: "x".into(),
                description: ".".into(),
                definition: ".".into(),
                tags: None,
            })
        };
        assert_eq!(compute_id(&unit("Ug_x")).unwrap(), "Ug_x");
        assert!(matches!(compute_id(&unit("Ux\tbad")), Err(Error::MalformedRecord(_))));
        assert!(matches!(compute_id(&unit("U-x")), Err(Error::MalformedRecord(_))));
        assert!(matches!(compute_id(&unit("")), Err(Error::MalformedRecord(_))));
    }

    #[test]
    fn test_attribute_ids() {
        let ids = taken(&["Ap_lacZ"]);
        assert_eq!(generate_attribute_id(&ids, "Ug_lacZ", "count", None), "Ac_g_lacZ");
        assert_eq!(generate_attribute_id(&ids, "lacZ", "presence", None), "Ap_lacZ_2");
        assert_eq!(generate_attribute_id(&ids, "lacZ", "presence", Some("Ap_lacZ")), "Ap_lacZ");
        assert_eq!(generate_attribute_id(&ids, "Ux", "weird mode", None), "Axwe_x");
    }

    #[test]
    fn test_group_ids() {
        let ids = taken(&[]);
        assert_eq!(
            generate_group_id(&ids, "Escherichia coli", "taxonomic", None),
            "Gt_Esche_coli"
        );
        assert_eq!(generate_group_id(&ids, "iron", "iron_requirement", None), "Gr_iron");
        assert_eq!(generate_group_id(&ids, "lake", "zone", None), "Gxz_lake");
    }

    #[test]
    fn test_unit_ids() {
        let ids = taken(&["Ug_lacZ", "Ug_lacZ_2"]);
        assert_eq!(generate_unit_id(&ids, "specific_gene", "lacZ", ".", ".", None), "Ug_lacZ_3");
        assert_eq!(
            generate_unit_id(&ids, "function", ".", "nitrogen fixation", ".", None),
            "Uf_nitro_fixat"
        );
        // one-word definition wins over a multi-word description
        assert_eq!(
            generate_unit_id(&ids, "function", ".", "nitrogen fixation", "GO:0009399", None),
            "Uf_GO_0009399"
        );
        assert_eq!(generate_unit_id(&ids, "mystery", "abc", ".", ".", None), "Uxmy_abc");
    }

    #[test]
    fn test_sequential_ids() {
        let ids = taken(&["S1", "S2"]);
        assert_eq!(generate_sequential_id(&ids, RecordKind::Source, None), "S3");
        assert_eq!(generate_sequential_id(&ids, RecordKind::Source, Some("S1")), "S1");
        assert_eq!(generate_sequential_id(&ids, RecordKind::ValidatingRule, None), "V1");
    }

    #[test]
    fn test_generate_id_dispatch() {
        let ids = taken(&[]);
        let fields = IdFields {
            symbol: Some("nifH"),
            ..Default::default()
        };
        assert_eq!(
            generate_id(&ids, RecordKind::Unit, "specific_gene", &fields, None).unwrap(),
            "Ug_nifH"
        );
        assert_eq!(
            generate_id(&ids, RecordKind::Unit, "specific_gene", &IdFields::default(), None).unwrap(),
            "U1"
        );
        assert!(generate_id(&ids, RecordKind::Model, "", &fields, None).is_err());
    }

    #[test]
    fn test_generation_is_deterministic() {
        let ids = taken(&["Gt_Esche_coli"]);
        let a = generate_group_id(&ids, "Escherichia coli", "taxonomic", None);
        let b = generate_group_id(&ids, "Escherichia coli", "taxonomic", None);
        assert_eq!(a, b);
        assert_eq!(a, "Gt_Esche_coli_2");
    }
}
