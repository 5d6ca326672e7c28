//! Document store module
//!
//! An in-memory stand-in for the backing document database, exposed through
//! the narrow interface the rest of the crate consumes: filtered lookups,
//! single and multi-document inserts, a unique index on the identifier
//! field, and a cross-collection transaction.
//!
//! ## Responsibilities
//! - Hold named collections of free-shape JSON documents
//! - Enforce identifier uniqueness at insert time (the allocation backstop)
//! - Make multi-document inserts all-or-nothing
//! - Provide the atomic multi-collection write used by user registration

pub mod collection;
pub mod memory;

pub use collection::Collection;
pub use memory::{MemoryStore, Txn};

/// A free-shape record, keyed by field name
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Field every stored document gets stamped with
pub const ID_KEY: &str = "_id";

/// Read a document's internal id
pub fn doc_id(doc: &Document) -> Option<u64> {
    doc.get(ID_KEY).and_then(serde_json::Value::as_u64)
}

/// Read a string field
pub fn doc_str<'a>(doc: &'a Document, field: &str) -> Option<&'a str> {
    doc.get(field).and_then(serde_json::Value::as_str)
}
