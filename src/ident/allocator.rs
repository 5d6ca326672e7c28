//! Sequence resolution and identifier allocation
//!
//! ## Responsibilities
//! - Resolve the next sequence number for a (kind, prefix) pair from the
//!   numeric maximum of existing identifiers
//! - Serialize in-process allocation per (kind, prefix)
//! - Hand out batch-local running counters for bulk import
//!
//! ## Concurrency Model
//!
//! Allocation has to behave as a critical section per (kind, prefix). Two
//! layers provide that:
//!
//! - a lock table of per-(kind, prefix) mutexes: the single-record create
//!   path resolves, renders, and inserts while holding the pair's lock;
//! - the collection's unique index on the identifier field: anything the
//!   lock cannot see (interleaved bulk imports, a second process against a
//!   shared backing store) is rejected at insert time and retried by the
//!   caller a bounded number of times.
//!
//! The sequence number is the numeric maximum suffix plus one, NOT the
//! suffix of the most recently created document: a document inserted out of
//! numeric order (manual correction, retried import) must not make the
//! sequence regress.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{Identifier, Prefix};
use crate::entity::EntityKind;
use crate::error::Result;
use crate::store::{doc_str, MemoryStore};

/// Allocates identifiers for every entity kind
pub struct IdAllocator {
    store: Arc<MemoryStore>,

    /// Minimum digit width of the rendered sequence number
    width: usize,

    /// One mutex per (kind, prefix) pair, created on first use
    locks: Mutex<HashMap<(EntityKind, Prefix), Arc<Mutex<()>>>>,
}

impl IdAllocator {
    /// Create an allocator over the store
    pub fn new(store: Arc<MemoryStore>, width: usize) -> Self {
        Self {
            store,
            width,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Rendered sequence width
    pub fn width(&self) -> usize {
        self.width
    }

    /// Derive the prefix a record would get
    pub fn derive_prefix(&self, kind: EntityKind, doc: &crate::store::Document) -> Result<Prefix> {
        kind.prefix_rule().derive(doc)
    }

    /// Next sequence number for a (kind, prefix) pair
    ///
    /// Scans the kind's collection for identifiers of the form
    /// `prefix + digits` and returns the numeric maximum plus one; an empty
    /// scan starts the sequence at 1.
    pub fn next_seq(&self, kind: EntityKind, prefix: &Prefix) -> u64 {
        let coll = self.store.collection(kind.collection_name());
        let field = kind.id_field();
        let mut max = 0;
        coll.for_each(|doc| {
            if let Some(id) = doc_str(doc, field) {
                if let Some(seq) = Identifier::parse_seq(id, prefix.as_str()) {
                    max = max.max(seq);
                }
            }
        });
        max + 1
    }

    /// Next identifier for a (kind, prefix) pair
    ///
    /// Callers that are about to insert must hold the pair's lock (see
    /// [`IdAllocator::with_prefix_lock`]) or be prepared to retry on a
    /// duplicate rejection.
    pub fn next_identifier(&self, kind: EntityKind, prefix: &Prefix) -> Identifier {
        Identifier::new(prefix.clone(), self.next_seq(kind, prefix), self.width)
    }

    /// Derive and resolve in one step: the plain `allocate` operation
    pub fn allocate(&self, kind: EntityKind, doc: &crate::store::Document) -> Result<Identifier> {
        let prefix = self.derive_prefix(kind, doc)?;
        self.with_prefix_lock(kind, &prefix, |alloc| {
            Ok(alloc.next_identifier(kind, &prefix))
        })
    }

    /// Run `f` while holding the (kind, prefix) allocation lock
    ///
    /// Everything between resolving a sequence number and inserting the
    /// record belongs inside `f`; otherwise a concurrent caller can resolve
    /// the same number.
    pub fn with_prefix_lock<T>(
        &self,
        kind: EntityKind,
        prefix: &Prefix,
        f: impl FnOnce(&Self) -> Result<T>,
    ) -> Result<T> {
        let entry = {
            let mut locks = self.locks.lock();
            Arc::clone(
                locks
                    .entry((kind, prefix.clone()))
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        let _guard = entry.lock();
        f(self)
    }

    /// Start a batch allocation for one import
    pub fn batch(&self, kind: EntityKind) -> BatchAllocator<'_> {
        BatchAllocator {
            alloc: self,
            kind,
            counters: HashMap::new(),
        }
    }
}

/// Batch-local allocation state for one bulk import
///
/// Rows in a batch are allocated sequentially: the first row touching a
/// prefix seeds a running counter from the persisted maximum, and every
/// later row sees the allocations already handed out in this batch even
/// though nothing has been persisted yet. Nothing here is shared: a failed
/// insert discards the counters and [`BatchAllocator::reset`] reseeds from
/// fresh maxima on retry.
pub struct BatchAllocator<'a> {
    alloc: &'a IdAllocator,
    kind: EntityKind,

    /// Last sequence number handed out per prefix
    counters: HashMap<Prefix, u64>,
}

impl BatchAllocator<'_> {
    /// Allocate the next identifier for a row and stamp it into the row's
    /// identifier field
    pub fn assign(&mut self, doc: &mut crate::store::Document) -> Result<Identifier> {
        let prefix = self.alloc.derive_prefix(self.kind, doc)?;
        let seq = match self.counters.get_mut(&prefix) {
            Some(last) => {
                *last += 1;
                *last
            }
            None => {
                let seed = self.alloc.next_seq(self.kind, &prefix);
                self.counters.insert(prefix.clone(), seed);
                seed
            }
        };
        let id = Identifier::new(prefix, seq, self.alloc.width);
        doc.insert(
            self.kind.id_field().to_string(),
            serde_json::Value::from(id.to_string()),
        );
        Ok(id)
    }

    /// Drop all counters so the next assignment reseeds from the store
    pub fn reset(&mut self) {
        self.counters.clear();
    }
}
