//! # egcgraph - Reference graph engine for EGC data files
//!
//! An Expected Genome Contents (EGC) file is a list of typed, tab-separated
//! records which reference each other through identifiers embedded in their
//! fields.
//!
//! egcgraph provides:
//! - Typed records with a pluggable line codec
//! - Identifier computation and mnemonic identifier generation
//! - A bidirectional reference index kept consistent across create/update/delete,
//!   including rename cascades through derived identifiers
//! - Context extraction: the neighborhood of a record, as an indented listing
//! - Read-only corpus statistics

pub mod kind;
pub mod record;
pub mod codec;
pub mod identifier;
pub mod references;
pub mod edge;
pub mod graph;
pub mod store;
pub mod query;
pub mod stats;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use kind::RecordKind;
pub use record::Record;
pub use codec::{Codec, EgcCodec};
pub use edge::{Direction, NodeKey};
pub use graph::ReferenceGraph;
pub use store::{RecordStore, StoreOptions};
pub use query::{ContextExtractor, ContextListing};

/// Result type alias for egcgraph operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for egcgraph operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Decode error at line {line}: {message}")]
    Decode { line: usize, message: String },

    #[error("Duplicate identifier: {0}")]
    DuplicateIdentifier(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Kind mismatch for {id}: stored {stored}, given {given}")]
    KindMismatch {
        id: String,
        stored: RecordKind,
        given: RecordKind,
    },

    /// A reference could not be rewritten; always an engine bug
    #[error("No reference rule for {from} -> {to}: {detail}")]
    UnresolvedReferenceRule {
        from: RecordKind,
        to: RecordKind,
        detail: String,
    },

    #[error("Unknown identifier: {0}")]
    UnknownIdentifier(String),

    #[error("Rename cascade does not terminate: {0} renamed twice")]
    RenameCycle(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
