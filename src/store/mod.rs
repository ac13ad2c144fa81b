//! Record Store - ordered records, identifier maps and the reference index
//!
//! The store keeps every record in file order. A deleted record leaves a
//! tombstone so that line numbers of the other records never shift during a
//! session; tombstones are dropped when the file is written back.
//!
//! - `records`: CRUD and the rename cascade
//! - `persist`: whole-file saves and content-addressed backups

pub mod persist;
pub mod records;

pub use persist::{backup, backup_path, write_lines};
pub use records::{CheckReport, RecordStore};

/// Behavior of a store opened from a file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreOptions {
    /// Save the file after every successful mutation
    pub autosave: bool,
    /// Copy the original file to `<file>.<hash8>.bak` before the first mutation
    pub backup: bool,
}
