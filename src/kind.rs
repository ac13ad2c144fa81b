//! Record kinds - the closed set of EGC record types
//!
//! Every line of an EGC file starts with a one-letter code naming its kind:
//! - `D`: Document (bibliographic item)
//! - `S` / `T`: Source / Text-source (evidence extracted from a document)
//! - `G`: Group of organisms
//! - `U`: Unit (genome content element)
//! - `A`: Attribute of a unit
//! - `M`: Model of a unit in an external resource
//! - `V` / `C`: Validating / Comparative expectation rule

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Closed discriminator of a record.
///
/// Kind dispatch throughout the crate is an exhaustive `match` on this enum,
/// so adding a kind is a compile error until every rule handles it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecordKind {
    Document,
    Source,
    TextSource,
    Group,
    Unit,
    Attribute,
    Model,
    ValidatingRule,
    ComparativeRule,
}

impl RecordKind {
    /// One-letter code used in the line encoding
    pub fn code(&self) -> &'static str {
        match self {
            RecordKind::Document => "D",
            RecordKind::Source => "S",
            RecordKind::TextSource => "T",
            RecordKind::Group => "G",
            RecordKind::Unit => "U",
            RecordKind::Attribute => "A",
            RecordKind::Model => "M",
            RecordKind::ValidatingRule => "V",
            RecordKind::ComparativeRule => "C",
        }
    }

    /// Human readable name
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Document => "document",
            RecordKind::Source => "source",
            RecordKind::TextSource => "text_source",
            RecordKind::Group => "group",
            RecordKind::Unit => "unit",
            RecordKind::Attribute => "attribute",
            RecordKind::Model => "model",
            RecordKind::ValidatingRule => "validating_rule",
            RecordKind::ComparativeRule => "comparative_rule",
        }
    }

    /// All kinds, in the order they usually appear in a file
    pub fn all() -> &'static [RecordKind] {
        &[
            RecordKind::Document,
            RecordKind::Source,
            RecordKind::TextSource,
            RecordKind::Group,
            RecordKind::Unit,
            RecordKind::Attribute,
            RecordKind::Model,
            RecordKind::ValidatingRule,
            RecordKind::ComparativeRule,
        ]
    }

    /// Source and Text-source share one identifier namespace
    pub fn is_evidence(&self) -> bool {
        matches!(self, RecordKind::Source | RecordKind::TextSource)
    }

    pub fn is_rule(&self) -> bool {
        matches!(self, RecordKind::ValidatingRule | RecordKind::ComparativeRule)
    }
}

impl FromStr for RecordKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "D" => return Ok(RecordKind::Document),
            "S" => return Ok(RecordKind::Source),
            "T" => return Ok(RecordKind::TextSource),
            "G" => return Ok(RecordKind::Group),
            "U" => return Ok(RecordKind::Unit),
            "A" => return Ok(RecordKind::Attribute),
            "M" => return Ok(RecordKind::Model),
            "V" => return Ok(RecordKind::ValidatingRule),
            "C" => return Ok(RecordKind::ComparativeRule),
            _ => {}
        }
        match s.to_lowercase().as_str() {
            "document" | "doc" => Ok(RecordKind::Document),
            "source" => Ok(RecordKind::Source),
            "text_source" | "textsource" | "text" => Ok(RecordKind::TextSource),
            "group" => Ok(RecordKind::Group),
            "unit" => Ok(RecordKind::Unit),
            "attribute" | "attr" => Ok(RecordKind::Attribute),
            "model" => Ok(RecordKind::Model),
            "validating_rule" | "validating" | "vrule" => Ok(RecordKind::ValidatingRule),
            "comparative_rule" | "comparative" | "crule" => Ok(RecordKind::ComparativeRule),
            _ => Err(Error::MalformedRecord(format!("Unknown record kind: {}", s))),
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_code_roundtrip() {
        for kind in RecordKind::all() {
            let parsed: RecordKind = kind.code().parse().unwrap();
            assert_eq!(*kind, parsed);
        }
    }

    #[test]
    fn test_kind_name_roundtrip() {
        for kind in RecordKind::all() {
            let parsed: RecordKind = kind.as_str().parse().unwrap();
            assert_eq!(*kind, parsed);
        }
    }

    #[test]
    fn test_kind_aliases() {
        assert_eq!(RecordKind::from_str("text").unwrap(), RecordKind::TextSource);
        assert_eq!(RecordKind::from_str("Validating").unwrap(), RecordKind::ValidatingRule);
        assert!(RecordKind::from_str("X").is_err());
    }

    #[test]
    fn test_kind_classes() {
        assert!(RecordKind::TextSource.is_evidence());
        assert!(!RecordKind::Document.is_evidence());
        assert!(RecordKind::ComparativeRule.is_rule());
    }
}
