//! Record types - the structured form of one EGC line
//!
//! Records are plain data. Identifiers are computed by [`crate::identifier`],
//! references by [`crate::references`]; the line encoding lives in
//! [`crate::codec`].

use crate::kind::RecordKind;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Delimiter joining the fields of a composite identifier.
///
/// The codec rejects field values containing it, so composite ids can be
/// split back into their parts.
pub const ID_DELIMITER: char = '-';

/// Placeholder for an empty free-text field
pub const PLACEHOLDER: &str = ".";

/// Link to an external bibliographic resource, e.g. `PMID:12345`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentLink {
    pub prefix: String,
    pub item: String,
}

impl DocumentLink {
    pub fn new(prefix: impl Into<String>, item: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            item: item.into(),
        }
    }

    /// Identifier of the Document record this link points to
    pub fn document_id(&self) -> String {
        format!("D{d}{}{d}{}", self.prefix, self.item, d = ID_DELIMITER)
    }

    /// Inverse of [`DocumentLink::document_id`]
    pub fn from_document_id(id: &str) -> Result<Self> {
        let mut parts = id.split(ID_DELIMITER);
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some("D"), Some(prefix), Some(item), None) if !prefix.is_empty() && !item.is_empty() => {
                Ok(Self::new(prefix, item))
            }
            _ => Err(Error::MalformedRecord(format!("Not a document identifier: {}", id))),
        }
    }
}

impl std::fmt::Display for DocumentLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.prefix, self.item)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub link: DocumentLink,
    pub tags: Option<String>,
}

/// Evidence taken from a specific location (table, figure...) of a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    pub document: DocumentLink,
    pub location: String,
    pub tags: Option<String>,
}

/// Evidence given as a verbatim text excerpt of a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSource {
    pub id: String,
    pub document: DocumentLink,
    pub text: String,
    pub tags: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub group_type: String,
    pub name: String,
    pub definition: String,
    pub tags: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: String,
    pub unit_type: String,
    pub symbol: String,
    pub description: String,
    pub definition: String,
    pub tags: Option<String>,
}

/// Measurement mode of an attribute; relative modes carry the unit they are
/// measured against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeMode {
    pub mode: String,
    pub reference: Option<String>,
}

impl AttributeMode {
    pub fn plain(mode: impl Into<String>) -> Self {
        Self {
            mode: mode.into(),
            reference: None,
        }
    }

    pub fn referenced(mode: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            mode: mode.into(),
            reference: Some(reference.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub id: String,
    pub unit_id: String,
    pub mode: AttributeMode,
    pub tags: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    pub unit_id: String,
    pub resource_id: String,
    pub model_id: String,
    pub tags: Option<String>,
}

/// Group reference inside a rule, optionally restricted to a portion
/// (`most`, `some`...) of the group members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRef {
    pub id: String,
    pub portion: Option<String>,
}

impl GroupRef {
    pub fn whole(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            portion: None,
        }
    }
}

/// Unary rule: the attribute of the group compared to a reference value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatingRule {
    pub id: String,
    pub sources: Vec<String>,
    pub attribute: String,
    pub group: GroupRef,
    pub operator: String,
    pub reference: String,
    pub tags: Option<String>,
}

/// Binary rule: one or two attributes compared between two groups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparativeRule {
    pub id: String,
    pub sources: Vec<String>,
    /// One attribute, or two attribute slots (which may name the same id)
    pub attributes: Vec<String>,
    pub group1: GroupRef,
    pub group2: GroupRef,
    pub operator: String,
    pub tags: Option<String>,
}

/// One EGC record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "record_type", rename_all = "snake_case")]
pub enum Record {
    Document(Document),
    Source(Source),
    TextSource(TextSource),
    Group(Group),
    Unit(Unit),
    Attribute(Attribute),
    Model(Model),
    ValidatingRule(ValidatingRule),
    ComparativeRule(ComparativeRule),
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Document(_) => RecordKind::Document,
            Record::Source(_) => RecordKind::Source,
            Record::TextSource(_) => RecordKind::TextSource,
            Record::Group(_) => RecordKind::Group,
            Record::Unit(_) => RecordKind::Unit,
            Record::Attribute(_) => RecordKind::Attribute,
            Record::Model(_) => RecordKind::Model,
            Record::ValidatingRule(_) => RecordKind::ValidatingRule,
            Record::ComparativeRule(_) => RecordKind::ComparativeRule,
        }
    }

    pub fn tags(&self) -> Option<&str> {
        match self {
            Record::Document(r) => r.tags.as_deref(),
            Record::Source(r) => r.tags.as_deref(),
            Record::TextSource(r) => r.tags.as_deref(),
            Record::Group(r) => r.tags.as_deref(),
            Record::Unit(r) => r.tags.as_deref(),
            Record::Attribute(r) => r.tags.as_deref(),
            Record::Model(r) => r.tags.as_deref(),
            Record::ValidatingRule(r) => r.tags.as_deref(),
            Record::ComparativeRule(r) => r.tags.as_deref(),
        }
    }

    /// Evidence ids cited by a rule; empty for every other kind
    pub fn sources(&self) -> &[String] {
        match self {
            Record::ValidatingRule(r) => &r.sources,
            Record::ComparativeRule(r) => &r.sources,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_id_roundtrip() {
        let link = DocumentLink::new("ncbi", "123");
        let id = link.document_id();
        assert_eq!(id, "D-ncbi-123");
        assert_eq!(DocumentLink::from_document_id(&id).unwrap(), link);
        assert_eq!(link.to_string(), "ncbi:123");
    }

    #[test]
    fn test_invalid_document_id() {
        assert!(DocumentLink::from_document_id("S-ncbi-123").is_err());
        assert!(DocumentLink::from_document_id("D-ncbi").is_err());
        assert!(DocumentLink::from_document_id("D-a-b-c").is_err());
        assert!(DocumentLink::from_document_id("D--1").is_err());
    }

    #[test]
    fn test_record_kind() {
        let record = Record::Model(Model {
            unit_id: "Ux".into(),
            resource_id: "pfam".into(),
            model_id: "PF001".into(),
            tags: None,
        });
        assert_eq!(record.kind(), RecordKind::Model);
        assert!(record.sources().is_empty());
    }
}
