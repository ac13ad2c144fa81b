//! Reference extraction and rewriting
//!
//! Each record kind has a fixed rule telling which identifiers embedded in
//! its fields point at other records. Rule evidence is kept apart: Source and
//! Text-source ids share a namespace, so their kind is only known once the
//! whole corpus is indexed.

use crate::identifier::is_valid_id;
use crate::kind::RecordKind;
use crate::record::{DocumentLink, GroupRef, Record};
use crate::{Error, Result};
use regex::Regex;
use std::sync::OnceLock;

/// Group type whose definition is a boolean expression over groups
pub const COMBINED_GROUP: &str = "combined";
/// Group type whose definition negates another group
pub const INVERTED_GROUP: &str = "inverted";
/// Definition prefix of a group derived from a parent group
pub const DERIVED_PREFIX: &str = "derived:";
/// Definition prefix of a homolog unit
pub const HOMOLOG_PREFIX: &str = "homolog:";
/// Unit type whose definition is a comma-separated arrangement of units
pub const ARRANGEMENT_UNIT: &str = "set!:arrangement";

fn id_token() -> &'static Regex {
    static ID_TOKEN: OnceLock<Regex> = OnceLock::new();
    ID_TOKEN.get_or_init(|| Regex::new(r"[A-Za-z0-9_]+").expect("identifier token pattern"))
}

/// References found in one record, in field order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct References {
    /// Targets whose kind is known from the field they appear in
    pub direct: Vec<(RecordKind, String)>,
    /// Rule evidence; Source or Text-source, decided by the graph
    pub evidence: Vec<String>,
}

impl References {
    fn push(&mut self, kind: RecordKind, id: impl Into<String>) {
        self.direct.push((kind, id.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.direct.is_empty() && self.evidence.is_empty()
    }

}

fn is_group_expression(group_type: &str) -> bool {
    group_type == COMBINED_GROUP || group_type == INVERTED_GROUP
}

fn is_homolog(unit_type: &str) -> bool {
    unit_type.starts_with("homolog_")
}

fn is_aggregate(unit_type: &str) -> bool {
    unit_type.starts_with('*') || unit_type.starts_with("set!:")
}

/// Identifier following `prefix` at the start of `definition`
fn prefixed_id<'a>(definition: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = definition.strip_prefix(prefix)?;
    let m = id_token().find(rest)?;
    (m.start() == 0).then(|| m.as_str())
}

fn arrangement_parts(definition: &str) -> impl Iterator<Item = &str> {
    definition.split(',').map(str::trim).filter(|p| is_valid_id(p))
}

/// Extract the references of a record
pub fn extract(record: &Record) -> References {
    let mut refs = References::default();
    match record {
        Record::Document(_) => {}
        Record::Source(r) => refs.push(RecordKind::Document, r.document.document_id()),
        Record::TextSource(r) => refs.push(RecordKind::Document, r.document.document_id()),
        Record::Group(r) => {
            if is_group_expression(&r.group_type) {
                for token in id_token().find_iter(&r.definition) {
                    refs.push(RecordKind::Group, token.as_str());
                }
            }
            // any group type may be derived, expressions included
            if let Some(parent) = derived_parent(&r.definition) {
                refs.push(RecordKind::Group, parent);
            }
        }
        Record::Unit(r) => {
            if is_homolog(&r.unit_type) {
                if let Some(parent) = prefixed_id(&r.definition, HOMOLOG_PREFIX) {
                    refs.push(RecordKind::Unit, parent);
                }
            } else if r.unit_type == ARRANGEMENT_UNIT {
                for part in arrangement_parts(&r.definition) {
                    refs.push(RecordKind::Unit, part);
                }
            } else if is_aggregate(&r.unit_type) {
                for token in id_token().find_iter(&r.definition) {
                    refs.push(RecordKind::Unit, token.as_str());
                }
            }
        }
        Record::Attribute(r) => {
            refs.push(RecordKind::Unit, r.unit_id.as_str());
            if let Some(unit) = &r.mode.reference {
                refs.push(RecordKind::Unit, unit.as_str());
            }
        }
        Record::Model(r) => refs.push(RecordKind::Unit, r.unit_id.as_str()),
        Record::ValidatingRule(r) => {
            refs.evidence.extend(r.sources.iter().cloned());
            refs.push(RecordKind::Attribute, r.attribute.as_str());
            refs.push(RecordKind::Group, r.group.id.as_str());
        }
        Record::ComparativeRule(r) => {
            refs.evidence.extend(r.sources.iter().cloned());
            for attribute in &r.attributes {
                refs.push(RecordKind::Attribute, attribute.as_str());
            }
            refs.push(RecordKind::Group, r.group1.id.as_str());
            refs.push(RecordKind::Group, r.group2.id.as_str());
        }
    }
    refs
}

/// Parent of a `derived:<id>:...` group definition
fn derived_parent(definition: &str) -> Option<&str> {
    let rest = definition.strip_prefix(DERIVED_PREFIX)?;
    let (parent, _) = rest.split_once(':')?;
    is_valid_id(parent).then_some(parent)
}

/// Replace every whole identifier token equal to `old`; returns the count
fn replace_tokens(text: &mut String, old: &str, new: &str) -> usize {
    let mut count = 0;
    let replaced = id_token()
        .replace_all(text.as_str(), |caps: &regex::Captures<'_>| {
            if &caps[0] == old {
                count += 1;
                new.to_string()
            } else {
                caps[0].to_string()
            }
        })
        .into_owned();
    *text = replaced;
    count
}

fn replace_prefixed(text: &mut String, prefix: &str, old: &str, new: &str) -> usize {
    if prefixed_id(text, prefix) != Some(old) {
        return 0;
    }
    *text = format!("{}{}{}", prefix, new, &text[prefix.len() + old.len()..]);
    1
}

fn replace_parts(text: &mut String, old: &str, new: &str) -> usize {
    let mut count = 0;
    let parts: Vec<String> = text
        .split(',')
        .map(|part| {
            if part.trim() == old {
                count += 1;
                part.replacen(old, new, 1)
            } else {
                part.to_string()
            }
        })
        .collect();
    *text = parts.join(",");
    count
}

fn replace_field(field: &mut String, old: &str, new: &str) -> usize {
    if field == old {
        *field = new.to_string();
        1
    } else {
        0
    }
}

fn replace_group_ref(group: &mut GroupRef, old: &str, new: &str) -> usize {
    replace_field(&mut group.id, old, new)
}

fn replace_list(ids: &mut [String], old: &str, new: &str) -> usize {
    ids.iter_mut().map(|id| replace_field(id, old, new)).sum()
}

fn replace_link(link: &mut DocumentLink, old: &str, new: &str) -> Result<usize> {
    if link.document_id() != old {
        return Ok(0);
    }
    *link = DocumentLink::from_document_id(new)?;
    Ok(1)
}

/// Rewrite `record` so that its references to `(target, old)` point at `new`.
///
/// This is the mirror of [`extract`]: every (kind, target kind) pair that
/// extraction can produce has a rule here. Fails with
/// `UnresolvedReferenceRule` when the pair has no rule or nothing matched.
pub fn rewrite(record: &Record, target: RecordKind, old: &str, new: &str) -> Result<Record> {
    let mut out = record.clone();
    let replaced = match (&mut out, target) {
        (Record::Source(r), RecordKind::Document) => replace_link(&mut r.document, old, new)?,
        (Record::TextSource(r), RecordKind::Document) => replace_link(&mut r.document, old, new)?,
        (Record::Group(r), RecordKind::Group) => {
            if is_group_expression(&r.group_type) {
                replace_tokens(&mut r.definition, old, new)
            } else if derived_parent(&r.definition) == Some(old) {
                let rest = &r.definition[DERIVED_PREFIX.len() + old.len()..];
                r.definition = format!("{}{}{}", DERIVED_PREFIX, new, rest);
                1
            } else {
                0
            }
        }
        (Record::Unit(r), RecordKind::Unit) => {
            if is_homolog(&r.unit_type) {
                replace_prefixed(&mut r.definition, HOMOLOG_PREFIX, old, new)
            } else if r.unit_type == ARRANGEMENT_UNIT {
                replace_parts(&mut r.definition, old, new)
            } else if is_aggregate(&r.unit_type) {
                replace_tokens(&mut r.definition, old, new)
            } else {
                0
            }
        }
        (Record::Attribute(r), RecordKind::Unit) => {
            let mut n = replace_field(&mut r.unit_id, old, new);
            if let Some(unit) = r.mode.reference.as_mut() {
                n += replace_field(unit, old, new);
            }
            n
        }
        (Record::Model(r), RecordKind::Unit) => replace_field(&mut r.unit_id, old, new),
        (Record::ValidatingRule(r), RecordKind::Attribute) => replace_field(&mut r.attribute, old, new),
        (Record::ValidatingRule(r), RecordKind::Group) => replace_group_ref(&mut r.group, old, new),
        (Record::ValidatingRule(r), RecordKind::Source | RecordKind::TextSource) => {
            replace_list(&mut r.sources, old, new)
        }
        (Record::ComparativeRule(r), RecordKind::Attribute) => replace_list(&mut r.attributes, old, new),
        (Record::ComparativeRule(r), RecordKind::Group) => {
            replace_group_ref(&mut r.group1, old, new) + replace_group_ref(&mut r.group2, old, new)
        }
        (Record::ComparativeRule(r), RecordKind::Source | RecordKind::TextSource) => {
            replace_list(&mut r.sources, old, new)
        }
        _ => {
            return Err(Error::UnresolvedReferenceRule {
                from: record.kind(),
                to: target,
                detail: format!("no rule to rewrite {} -> {}", old, new),
            });
        }
    };
    if replaced == 0 {
        return Err(Error::UnresolvedReferenceRule {
            from: record.kind(),
            to: target,
            detail: format!("reference {} not found", old),
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::*;

    fn group(group_type: &str, definition: &str) -> Record {
        Record::Group(Group {
            id: "Gx".into(),
            group_type: group_type.into(),
            name: "x".into(),
            definition: definition.into(),
            tags: None,
        })
    }

    fn unit(unit_type: &str, definition: &str) -> Record {
        Record::Unit(Unit {
            id: "Ux".into(),
            unit_type: unit_type.into(),
            symbol: ".".into(),
            description: ".".into(),
            definition: definition.into(),
            tags: None,
        })
    }

    fn ids(refs: &References, kind: RecordKind) -> Vec<&str> {
        refs.direct
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, id)| id.as_str())
            .collect()
    }

    #[test]
    fn test_group_references() {
        let refs = extract(&group("combined", "(Ga & Gb) | Ga"));
        assert_eq!(ids(&refs, RecordKind::Group), vec!["Ga", "Gb", "Ga"]);

        let refs = extract(&group("inverted", "Ga"));
        assert_eq!(ids(&refs, RecordKind::Group), vec!["Ga"]);

        let refs = extract(&group("taxonomic", "derived:Gparent:strains"));
        assert_eq!(ids(&refs, RecordKind::Group), vec!["Gparent"]);

        // an expression that is also derived lists its parent twice
        let refs = extract(&group("inverted", "derived:Gparent:K12"));
        assert_eq!(ids(&refs, RecordKind::Group), vec!["derived", "Gparent", "K12", "Gparent"]);

        assert!(extract(&group("taxonomic", "NCBITaxon:562")).is_empty());
    }

    #[test]
    fn test_unit_references() {
        let refs = extract(&unit("homolog_gene", "homolog:Ug_lacZ"));
        assert_eq!(ids(&refs, RecordKind::Unit), vec!["Ug_lacZ"]);

        let refs = extract(&unit("set!:arrangement", "Ua, Ub,free text,Uc"));
        assert_eq!(ids(&refs, RecordKind::Unit), vec!["Ua", "Ub", "Uc"]);

        let refs = extract(&unit("set!:any", "Ua|Ub"));
        assert_eq!(ids(&refs, RecordKind::Unit), vec!["Ua", "Ub"]);

        let refs = extract(&unit("*ortholog_group", "Ua Ub"));
        assert_eq!(ids(&refs, RecordKind::Unit), vec!["Ua", "Ub"]);

        assert!(extract(&unit("specific_gene", "GeneID:945006")).is_empty());
    }

    #[test]
    fn test_rule_references() {
        let rule = Record::ComparativeRule(ComparativeRule {
            id: "C1".into(),
            sources: vec!["S1".into(), "T1".into()],
            attributes: vec!["Ap_x".into(), "Ap_x".into()],
            group1: GroupRef::whole("Ga"),
            group2: GroupRef {
                id: "Gb".into(),
                portion: Some("most".into()),
            },
            operator: ">".into(),
            tags: None,
        });
        let refs = extract(&rule);
        assert_eq!(refs.evidence, vec!["S1", "T1"]);
        assert_eq!(ids(&refs, RecordKind::Attribute), vec!["Ap_x", "Ap_x"]);
        assert_eq!(ids(&refs, RecordKind::Group), vec!["Ga", "Gb"]);
    }

    #[test]
    fn test_source_and_attribute_references() {
        let source = Record::Source(Source {
            id: "S1".into(),
            document: DocumentLink::new("ncbi", "123"),
            location: "table 2".into(),
            tags: None,
        });
        assert_eq!(extract(&source).direct, vec![(RecordKind::Document, "D-ncbi-123".to_string())]);

        let attribute = Record::Attribute(Attribute {
            id: "Ar_x".into(),
            unit_id: "Ux".into(),
            mode: AttributeMode::referenced("relative", "Uy"),
            tags: None,
        });
        assert_eq!(ids(&extract(&attribute), RecordKind::Unit), vec!["Ux", "Uy"]);
    }

    #[test]
    fn test_rewrite_tokens_whole_word_only() {
        let rewritten = rewrite(&group("combined", "Ga & Gab"), RecordKind::Group, "Ga", "Gz").unwrap();
        let Record::Group(g) = rewritten else { panic!("not a group") };
        assert_eq!(g.definition, "Gz & Gab");
    }

    #[test]
    fn test_rewrite_prefixed_and_parts() {
        let Record::Group(g) =
            rewrite(&group("strain", "derived:Ga:K12"), RecordKind::Group, "Ga", "Gb").unwrap()
        else {
            panic!("not a group")
        };
        assert_eq!(g.definition, "derived:Gb:K12");

        let Record::Unit(u) =
            rewrite(&unit("homolog_protein", "homolog:Up_a"), RecordKind::Unit, "Up_a", "Up_b").unwrap()
        else {
            panic!("not a unit")
        };
        assert_eq!(u.definition, "homolog:Up_b");

        let Record::Unit(u) =
            rewrite(&unit("set!:arrangement", "Ua, Ub"), RecordKind::Unit, "Ub", "Uc").unwrap()
        else {
            panic!("not a unit")
        };
        assert_eq!(u.definition, "Ua, Uc");
    }

    #[test]
    fn test_rewrite_document_link() {
        let source = Record::TextSource(TextSource {
            id: "T1".into(),
            document: DocumentLink::new("ncbi", "1"),
            text: "quote".into(),
            tags: None,
        });
        let Record::TextSource(t) = rewrite(&source, RecordKind::Document, "D-ncbi-1", "D-ncbi-2").unwrap()
        else {
            panic!("not a text source")
        };
        assert_eq!(t.document, DocumentLink::new("ncbi", "2"));
    }

    #[test]
    fn test_rewrite_mirrors_extraction() {
        let attribute = Record::Attribute(Attribute {
            id: "Ar_x".into(),
            unit_id: "Ux".into(),
            mode: AttributeMode::referenced("relative", "Ux"),
            tags: None,
        });
        let rewritten = rewrite(&attribute, RecordKind::Unit, "Ux", "Uy").unwrap();
        assert_eq!(ids(&extract(&rewritten), RecordKind::Unit), vec!["Uy", "Uy"]);
    }

    #[test]
    fn test_rewrite_failures() {
        let err = rewrite(&group("taxonomic", "plain"), RecordKind::Group, "Ga", "Gb").unwrap_err();
        assert!(matches!(err, Error::UnresolvedReferenceRule { .. }));

        let model = Record::Model(Model {
            unit_id: "Ux".into(),
            resource_id: "pfam".into(),
            model_id: "PF1".into(),
            tags: None,
        });
        let err = rewrite(&model, RecordKind::Group, "Ux", "Uy").unwrap_err();
        assert!(matches!(
            err,
            Error::UnresolvedReferenceRule {
                from: RecordKind::Model,
                to: RecordKind::Group,
                ..
            }
        ));
    }
}
