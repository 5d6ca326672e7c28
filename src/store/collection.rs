//! Collection
//!
//! One named set of documents with insertion-order storage, an internal
//! monotonically increasing `_id`, and an optional unique index over a
//! single string field (the identifier field of the entity kind stored
//! here).
//!
//! ## Concurrency:
//! - All state sits behind one RwLock (many concurrent readers, exclusive writer)
//! - `insert_many` validates the whole batch before touching the document
//!   vec, so a duplicate anywhere leaves the collection untouched
//! - All methods use `&self`

use std::collections::HashSet;

use parking_lot::{RwLock, RwLockWriteGuard};
use serde_json::Value;

use super::{doc_str, Document, ID_KEY};
use crate::error::{OpsError, Result};

#[derive(Default)]
struct Inner {
    /// Documents in insertion order (oldest first)
    docs: Vec<Document>,

    /// Values of the unique field currently present
    unique: HashSet<String>,

    /// Next internal `_id`
    next_id: u64,
}

/// A named document collection
pub struct Collection {
    name: String,

    /// Field with enforced uniqueness, if any
    unique_field: Option<&'static str>,

    inner: RwLock<Inner>,
}

impl Collection {
    /// Create an empty collection
    pub fn new(name: impl Into<String>, unique_field: Option<&'static str>) -> Self {
        Self {
            name: name.into(),
            unique_field,
            inner: RwLock::new(Inner {
                docs: Vec::new(),
                unique: HashSet::new(),
                next_id: 1,
            }),
        }
    }

    /// Collection name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of stored documents
    pub fn len(&self) -> usize {
        self.inner.read().docs.len()
    }

    /// Whether the collection is empty
    pub fn is_empty(&self) -> bool {
        self.inner.read().docs.is_empty()
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Insert one document, stamping its `_id`
    ///
    /// Returns:
    /// - `Ok(stored)` — the document as stored, `_id` included
    /// - `Err(DuplicateIdentifier)` — the unique field collided; nothing changed
    pub fn insert_one(&self, doc: Document) -> Result<Document> {
        let mut inner = self.inner.write();
        self.check_unique(&inner, &doc)?;
        Ok(Self::apply_insert(&mut inner, self.unique_field, doc))
    }

    /// Insert a batch of documents as one all-or-nothing write
    ///
    /// Every document is checked against the unique index and against the
    /// rest of the batch before any of them is stored. On error the
    /// collection is exactly as it was.
    pub fn insert_many(&self, docs: Vec<Document>) -> Result<usize> {
        let mut inner = self.inner.write();

        if let Some(field) = self.unique_field {
            let mut batch_seen: HashSet<&str> = HashSet::new();
            for doc in &docs {
                if let Some(value) = doc_str(doc, field) {
                    if inner.unique.contains(value) || !batch_seen.insert(value) {
                        return Err(OpsError::DuplicateIdentifier {
                            id: value.to_string(),
                        });
                    }
                }
            }
        }

        let count = docs.len();
        for doc in docs {
            Self::apply_insert(&mut inner, self.unique_field, doc);
        }
        Ok(count)
    }

    /// Merge a patch into the document with the given `_id`
    ///
    /// Fields in `patch` overwrite fields in the stored document; `_id`
    /// cannot be overwritten. A unique-field change is validated first.
    pub fn update_by_id(&self, id: u64, mut patch: Document) -> Result<Option<Document>> {
        patch.remove(ID_KEY);
        let mut inner = self.inner.write();

        let Some(pos) = inner.docs.iter().position(|d| super::doc_id(d) == Some(id)) else {
            return Ok(None);
        };

        // Validate the unique move before mutating anything
        let mut replaced: Option<(String, String)> = None;
        if let Some(field) = self.unique_field {
            let old = doc_str(&inner.docs[pos], field).map(str::to_string);
            let new = patch.get(field).and_then(Value::as_str).map(str::to_string);
            if let Some(new) = new {
                if old.as_deref() != Some(new.as_str()) {
                    if inner.unique.contains(new.as_str()) {
                        return Err(OpsError::DuplicateIdentifier { id: new });
                    }
                    replaced = Some((old.unwrap_or_default(), new));
                }
            }
        }

        if let Some((old, new)) = replaced {
            inner.unique.remove(old.as_str());
            inner.unique.insert(new);
        }
        let doc = &mut inner.docs[pos];
        for (key, value) in patch {
            doc.insert(key, value);
        }
        Ok(Some(doc.clone()))
    }

    /// Remove the document with the given `_id`
    pub fn delete_by_id(&self, id: u64) -> Option<Document> {
        let mut inner = self.inner.write();
        let pos = inner.docs.iter().position(|d| super::doc_id(d) == Some(id))?;
        let doc = inner.docs.remove(pos);
        if let Some(field) = self.unique_field {
            if let Some(value) = doc_str(&doc, field) {
                inner.unique.remove(value);
            }
        }
        Some(doc)
    }

    /// Remove the first document matching the predicate
    pub fn delete_one_by(&self, pred: impl Fn(&Document) -> bool) -> Option<Document> {
        let id = {
            let inner = self.inner.read();
            inner.docs.iter().find(|d| pred(d)).and_then(super::doc_id)
        };
        self.delete_by_id(id?)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Fetch a document by `_id`
    pub fn find_by_id(&self, id: u64) -> Option<Document> {
        self.inner
            .read()
            .docs
            .iter()
            .find(|d| super::doc_id(d) == Some(id))
            .cloned()
    }

    /// First document matching the predicate, in insertion order
    pub fn find_one(&self, pred: impl Fn(&Document) -> bool) -> Option<Document> {
        self.inner.read().docs.iter().find(|d| pred(d)).cloned()
    }

    /// All documents matching the predicate, in insertion order
    pub fn filter(&self, pred: impl Fn(&Document) -> bool) -> Vec<Document> {
        self.inner
            .read()
            .docs
            .iter()
            .filter(|d| pred(d))
            .cloned()
            .collect()
    }

    /// Count documents matching the predicate
    pub fn count(&self, pred: impl Fn(&Document) -> bool) -> usize {
        self.inner.read().docs.iter().filter(|d| pred(d)).count()
    }

    /// Visit every document under the read lock
    pub fn for_each(&self, mut f: impl FnMut(&Document)) {
        for doc in &self.inner.read().docs {
            f(doc);
        }
    }

    /// One page of documents, newest first, plus the total count
    pub fn page(&self, page: usize, per_page: usize) -> (Vec<Document>, usize) {
        let inner = self.inner.read();
        let total = inner.docs.len();
        let page = page.max(1);
        let docs = inner
            .docs
            .iter()
            .rev()
            .skip((page - 1) * per_page)
            .take(per_page)
            .cloned()
            .collect();
        (docs, total)
    }

    // =========================================================================
    // Snapshot Support
    // =========================================================================

    /// All documents, oldest first (snapshot export)
    pub fn export(&self) -> Vec<Document> {
        self.inner.read().docs.clone()
    }

    /// Replace the contents from a snapshot, rebuilding the unique index
    /// and the `_id` watermark
    pub fn restore(&self, docs: Vec<Document>) -> Result<()> {
        let mut unique = HashSet::new();
        let mut next_id = 1;
        for doc in &docs {
            if let Some(field) = self.unique_field {
                if let Some(value) = doc_str(doc, field) {
                    if !unique.insert(value.to_string()) {
                        return Err(OpsError::DuplicateIdentifier {
                            id: value.to_string(),
                        });
                    }
                }
            }
            if let Some(id) = super::doc_id(doc) {
                next_id = next_id.max(id + 1);
            }
        }

        let mut inner = self.inner.write();
        inner.docs = docs;
        inner.unique = unique;
        inner.next_id = next_id;
        Ok(())
    }

    // =========================================================================
    // Transaction Support
    // =========================================================================

    /// Take the write lock for a multi-collection transaction
    pub(crate) fn begin_write(&self) -> TxnGuard<'_> {
        TxnGuard {
            unique_field: self.unique_field,
            inner: self.inner.write(),
        }
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn check_unique(&self, inner: &Inner, doc: &Document) -> Result<()> {
        if let Some(field) = self.unique_field {
            if let Some(value) = doc_str(doc, field) {
                if inner.unique.contains(value) {
                    return Err(OpsError::DuplicateIdentifier {
                        id: value.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Stamp `_id`, maintain the unique index, push. Caller holds the write
    /// lock and has already validated uniqueness.
    fn apply_insert(
        inner: &mut Inner,
        unique_field: Option<&'static str>,
        mut doc: Document,
    ) -> Document {
        let id = inner.next_id;
        inner.next_id += 1;
        doc.insert(ID_KEY.to_string(), Value::from(id));
        if let Some(field) = unique_field {
            if let Some(value) = doc_str(&doc, field) {
                inner.unique.insert(value.to_string());
            }
        }
        inner.docs.push(doc.clone());
        doc
    }
}

/// Held write lock over one collection inside a multi-collection transaction
///
/// Inserts are validated against the live unique index; commits go through
/// [`TxnGuard::insert`] one document at a time while every participating
/// guard stays held, so a failure before the first insert leaves all
/// collections untouched.
pub(crate) struct TxnGuard<'a> {
    unique_field: Option<&'static str>,
    inner: RwLockWriteGuard<'a, Inner>,
}

impl TxnGuard<'_> {
    /// The unique field of the underlying collection, if any
    pub(crate) fn unique_field(&self) -> Option<&'static str> {
        self.unique_field
    }

    /// The `_id` the next inserted document will receive
    pub(crate) fn peek_next_id(&self) -> u64 {
        self.inner.next_id
    }

    /// Whether a unique-field value is already taken
    pub(crate) fn is_unique_taken(&self, value: &str) -> bool {
        self.inner.unique.contains(value)
    }

    /// Insert under the held lock
    pub(crate) fn insert(&mut self, doc: Document) -> Document {
        Collection::apply_insert(&mut self.inner, self.unique_field, doc)
    }
}
