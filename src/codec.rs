//! Line codec
//!
//! The codec is the only component that knows the textual line format.
//! Everything above it works on [`Record`] values.
//!
//! The default [`EgcCodec`] reads tab-separated lines whose first field is the
//! one-letter kind code. A trailing tags field is optional on every kind.

use crate::identifier::is_valid_id;
use crate::kind::RecordKind;
use crate::record::{
    Attribute, AttributeMode, ComparativeRule, Document, DocumentLink, Group, GroupRef, Model,
    Record, Source, TextSource, Unit, ValidatingRule, ID_DELIMITER,
};
use crate::{Error, Result};
use std::str::FromStr;

/// Trait for line codecs
///
/// A codec is responsible for:
/// 1. Decoding one line (without its newline) into a record
/// 2. Encoding a record back into one line
///
/// `decode(encode(r))` must yield a record with the same identifier as `r`.
pub trait Codec {
    /// Codec name (for display)
    fn name(&self) -> &str;

    /// Decode a single line
    fn decode(&self, line: &str) -> Result<Record>;

    /// Encode a record as a single line
    fn encode(&self, record: &Record) -> String;
}

const FIELD_SEPARATOR: char = '\t';
const LIST_SEPARATOR: char = ',';

/// Tab-separated EGC line format
#[derive(Debug, Default, Clone, Copy)]
pub struct EgcCodec;

impl EgcCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Codec for EgcCodec {
    fn name(&self) -> &str {
        "egc"
    }

    fn decode(&self, line: &str) -> Result<Record> {
        let line = line.strip_suffix('\n').unwrap_or(line);
        let line = line.strip_suffix('\r').unwrap_or(line);
        let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
        let kind = RecordKind::from_str(fields[0])?;
        let mut f = Fields::new(kind, &fields[1..])?;

        let record = match kind {
            RecordKind::Document => Record::Document(Document {
                link: parse_link(f.next()?)?,
                tags: f.tags(),
            }),
            RecordKind::Source => Record::Source(Source {
                id: f.id()?,
                document: parse_link(f.next()?)?,
                location: f.text()?,
                tags: f.tags(),
            }),
            RecordKind::TextSource => Record::TextSource(TextSource {
                id: f.id()?,
                document: parse_link(f.next()?)?,
                text: f.text()?,
                tags: f.tags(),
            }),
            RecordKind::Group => Record::Group(Group {
                id: f.id()?,
                group_type: f.text()?,
                name: f.text()?,
                definition: f.text()?,
                tags: f.tags(),
            }),
            RecordKind::Unit => Record::Unit(Unit {
                id: f.id()?,
                unit_type: f.text()?,
                symbol: f.text()?,
                description: f.text()?,
                definition: f.text()?,
                tags: f.tags(),
            }),
            RecordKind::Attribute => Record::Attribute(Attribute {
                id: f.id()?,
                unit_id: f.id()?,
                mode: parse_mode(f.next()?)?,
                tags: f.tags(),
            }),
            RecordKind::Model => Record::Model(Model {
                unit_id: f.id()?,
                resource_id: f.id_part()?,
                model_id: f.id_part()?,
                tags: f.tags(),
            }),
            RecordKind::ValidatingRule => Record::ValidatingRule(ValidatingRule {
                id: f.id()?,
                sources: parse_id_list(f.next()?, 1, usize::MAX)?,
                attribute: f.id()?,
                group: parse_group_ref(f.next()?)?,
                operator: f.text()?,
                reference: f.text()?,
                tags: f.tags(),
            }),
            RecordKind::ComparativeRule => Record::ComparativeRule(ComparativeRule {
                id: f.id()?,
                sources: parse_id_list(f.next()?, 1, usize::MAX)?,
                attributes: parse_id_list(f.next()?, 1, 2)?,
                group1: parse_group_ref(f.next()?)?,
                group2: parse_group_ref(f.next()?)?,
                operator: f.text()?,
                tags: f.tags(),
            }),
        };
        Ok(record)
    }

    fn encode(&self, record: &Record) -> String {
        let mut fields: Vec<String> = vec![record.kind().code().to_string()];
        match record {
            Record::Document(r) => {
                fields.push(r.link.to_string());
            }
            Record::Source(r) => {
                fields.extend([r.id.clone(), r.document.to_string(), r.location.clone()]);
            }
            Record::TextSource(r) => {
                fields.extend([r.id.clone(), r.document.to_string(), r.text.clone()]);
            }
            Record::Group(r) => {
                fields.extend([
                    r.id.clone(),
                    r.group_type.clone(),
                    r.name.clone(),
                    r.definition.clone(),
                ]);
            }
            Record::Unit(r) => {
                fields.extend([
                    r.id.clone(),
                    r.unit_type.clone(),
                    r.symbol.clone(),
                    r.description.clone(),
                    r.definition.clone(),
                ]);
            }
            Record::Attribute(r) => {
                fields.extend([r.id.clone(), r.unit_id.clone(), encode_mode(&r.mode)]);
            }
            Record::Model(r) => {
                fields.extend([r.unit_id.clone(), r.resource_id.clone(), r.model_id.clone()]);
            }
            Record::ValidatingRule(r) => {
                fields.extend([
                    r.id.clone(),
                    r.sources.join(","),
                    r.attribute.clone(),
                    encode_group_ref(&r.group),
                    r.operator.clone(),
                    r.reference.clone(),
                ]);
            }
            Record::ComparativeRule(r) => {
                fields.extend([
                    r.id.clone(),
                    r.sources.join(","),
                    r.attributes.join(","),
                    encode_group_ref(&r.group1),
                    encode_group_ref(&r.group2),
                    r.operator.clone(),
                ]);
            }
        }
        if let Some(tags) = record.tags() {
            fields.push(tags.to_string());
        }
        fields.join("\t")
    }
}

/// Cursor over the fields following the kind code
struct Fields<'a> {
    kind: RecordKind,
    fields: &'a [&'a str],
    pos: usize,
    required: usize,
}

impl<'a> Fields<'a> {
    fn new(kind: RecordKind, fields: &'a [&'a str]) -> Result<Self> {
        let required = required_fields(kind);
        if fields.len() < required || fields.len() > required + 1 {
            return Err(Error::MalformedRecord(format!(
                "{} record needs {} fields (+ optional tags), found {}",
                kind,
                required,
                fields.len()
            )));
        }
        Ok(Self {
            kind,
            fields,
            pos: 0,
            required,
        })
    }

    fn next(&mut self) -> Result<&'a str> {
        let value = self.fields.get(self.pos).copied().ok_or_else(|| {
            Error::MalformedRecord(format!("{} record: missing field {}", self.kind, self.pos + 2))
        })?;
        self.pos += 1;
        if value.is_empty() {
            return Err(Error::MalformedRecord(format!(
                "{} record: empty field {} (use '.' for no value)",
                self.kind,
                self.pos + 1
            )));
        }
        Ok(value)
    }

    fn text(&mut self) -> Result<String> {
        self.next().map(str::to_string)
    }

    fn id(&mut self) -> Result<String> {
        let value = self.next()?;
        if !is_valid_id(value) {
            return Err(Error::MalformedRecord(format!(
                "{} record: invalid identifier '{}'",
                self.kind, value
            )));
        }
        Ok(value.to_string())
    }

    /// Component of a composite identifier
    fn id_part(&mut self) -> Result<String> {
        let value = self.next()?;
        if value.contains(ID_DELIMITER) {
            return Err(Error::MalformedRecord(format!(
                "{} record: '{}' must not contain '{}'",
                self.kind, value, ID_DELIMITER
            )));
        }
        Ok(value.to_string())
    }

    fn tags(&mut self) -> Option<String> {
        if self.pos == self.required {
            self.fields.get(self.pos).map(|s| s.to_string())
        } else {
            None
        }
    }
}

fn required_fields(kind: RecordKind) -> usize {
    match kind {
        RecordKind::Document => 1,
        RecordKind::Source | RecordKind::TextSource => 3,
        RecordKind::Group => 4,
        RecordKind::Unit => 5,
        RecordKind::Attribute => 3,
        RecordKind::Model => 3,
        RecordKind::ValidatingRule => 6,
        RecordKind::ComparativeRule => 6,
    }
}

fn parse_link(value: &str) -> Result<DocumentLink> {
    let (prefix, item) = value
        .split_once(':')
        .ok_or_else(|| Error::MalformedRecord(format!("Document link must be prefix:item, got '{}'", value)))?;
    if prefix.is_empty() || item.is_empty() {
        return Err(Error::MalformedRecord(format!("Incomplete document link '{}'", value)));
    }
    if prefix.contains(ID_DELIMITER) || item.contains(ID_DELIMITER) {
        return Err(Error::MalformedRecord(format!(
            "Document link '{}' must not contain '{}'",
            value, ID_DELIMITER
        )));
    }
    Ok(DocumentLink::new(prefix, item))
}

fn parse_mode(value: &str) -> Result<AttributeMode> {
    match value.split_once(':') {
        Some((mode, reference)) => {
            if mode.is_empty() || !is_valid_id(reference) {
                return Err(Error::MalformedRecord(format!("Invalid attribute mode '{}'", value)));
            }
            Ok(AttributeMode::referenced(mode, reference))
        }
        None => Ok(AttributeMode::plain(value)),
    }
}

fn encode_mode(mode: &AttributeMode) -> String {
    match &mode.reference {
        Some(reference) => format!("{}:{}", mode.mode, reference),
        None => mode.mode.clone(),
    }
}

fn parse_group_ref(value: &str) -> Result<GroupRef> {
    let (id, portion) = match value.split_once(':') {
        Some((id, portion)) if !portion.is_empty() => (id, Some(portion.to_string())),
        Some(_) => return Err(Error::MalformedRecord(format!("Empty group portion in '{}'", value))),
        None => (value, None),
    };
    if !is_valid_id(id) {
        return Err(Error::MalformedRecord(format!("Invalid group identifier '{}'", id)));
    }
    Ok(GroupRef {
        id: id.to_string(),
        portion,
    })
}

fn encode_group_ref(group: &GroupRef) -> String {
    match &group.portion {
        Some(portion) => format!("{}:{}", group.id, portion),
        None => group.id.clone(),
    }
}

fn parse_id_list(value: &str, min: usize, max: usize) -> Result<Vec<String>> {
    let ids: Vec<String> = value.split(LIST_SEPARATOR).map(str::to_string).collect();
    if let Some(bad) = ids.iter().find(|id| !is_valid_id(id)) {
        return Err(Error::MalformedRecord(format!("Invalid identifier '{}' in list '{}'", bad, value)));
    }
    if ids.len() < min || ids.len() > max {
        return Err(Error::MalformedRecord(format!(
            "Expected {}..={} identifiers, got {} in '{}'",
            min,
            max,
            ids.len(),
            value
        )));
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::compute_id;

    const SAMPLE: &[&str] = &[
        "D\tncbi:123",
        "S\tS1\tncbi:123\tTable_2",
        "T\tT1\tncbi:123\tmost strains carry the gene\tcurator:gg",
        "G\tGt_Ecoli\ttaxonomic\tEscherichia coli\ttaxid:562",
        "U\tUg_lacZ\tspecific_gene\tlacZ\tbeta-galactosidase\t.",
        "A\tAr_lacZ\tUg_lacZ\trelative:Ug_lacY",
        "M\tUg_lacZ\tpfam\tPF02837",
        "V\tVp_1\tS1,T1\tAr_lacZ\tGt_Ecoli:most\t>\t1",
        "C\tCp_1\tS1\tAr_lacZ,Ar_lacZ\tGt_Ecoli\tGt_Styph\t=",
    ];

    #[test]
    fn test_decode_all_kinds() {
        let codec = EgcCodec::new();
        let kinds: Vec<RecordKind> = SAMPLE
            .iter()
            .map(|line| codec.decode(line).unwrap().kind())
            .collect();
        assert_eq!(kinds, RecordKind::all());
    }

    #[test]
    fn test_encode_is_verbatim_for_canonical_lines() {
        let codec = EgcCodec::new();
        for line in SAMPLE {
            let record = codec.decode(line).unwrap();
            assert_eq!(codec.encode(&record), *line);
        }
    }

    #[test]
    fn test_identifier_survives_encoding() {
        let codec = EgcCodec::new();
        for line in SAMPLE {
            let record = codec.decode(line).unwrap();
            let again = codec.decode(&codec.encode(&record)).unwrap();
            assert_eq!(compute_id(&again).unwrap(), compute_id(&record).unwrap());
        }
    }

    #[test]
    fn test_decode_fields() {
        let codec = EgcCodec::new();
        match codec.decode(SAMPLE[5]).unwrap() {
            Record::Attribute(a) => {
                assert_eq!(a.unit_id, "Ug_lacZ");
                assert_eq!(a.mode.mode, "relative");
                assert_eq!(a.mode.reference.as_deref(), Some("Ug_lacY"));
            }
            other => panic!("unexpected record {:?}", other),
        }
        match codec.decode(SAMPLE[7]).unwrap() {
            Record::ValidatingRule(v) => {
                assert_eq!(v.sources, vec!["S1", "T1"]);
                assert_eq!(v.group.portion.as_deref(), Some("most"));
            }
            other => panic!("unexpected record {:?}", other),
        }
        let tagged = codec.decode(SAMPLE[2]).unwrap();
        assert_eq!(tagged.tags(), Some("curator:gg"));
    }

    #[test]
    fn test_decode_errors() {
        let codec = EgcCodec::new();
        assert!(codec.decode("X\tfoo").is_err());
        assert!(codec.decode("S\tS1\tncbi:123").is_err()); // missing location
        assert!(codec.decode("S\tS-1\tncbi:123\tx").is_err()); // bad id
        assert!(codec.decode("D\tnc-bi:123").is_err()); // delimiter in link
        assert!(codec.decode("M\tUx\tpf-am\tPF1").is_err());
        assert!(codec.decode("C\tC1\tS1\tA1,A2,A3\tG1\tG2\t=").is_err());
        assert!(codec.decode("G\tG1\t\tname\tdef").is_err());
    }
}
