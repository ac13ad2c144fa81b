//! Read-only queries over a record store

pub mod context;

pub use context::{ContextEntry, ContextExtractor, ContextListing};
