//! In-memory document store
//!
//! Named collections plus the one cross-collection primitive the domain
//! needs: an atomic multi-collection insert transaction. A real deployment
//! would back this with the document database; the rest of the crate only
//! sees the interface.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use super::collection::TxnGuard;
use super::{Collection, Document};
use crate::error::{OpsError, Result};

/// The store: a registry of named collections
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<BTreeMap<String, Arc<Collection>>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch or create a collection with no unique index
    pub fn collection(&self, name: &str) -> Arc<Collection> {
        self.collection_with_unique(name, None)
    }

    /// Fetch or create a collection, registering a unique field on first use
    ///
    /// The unique field is fixed at creation; later callers get the
    /// collection as first registered.
    pub fn collection_with_unique(
        &self,
        name: &str,
        unique_field: Option<&'static str>,
    ) -> Arc<Collection> {
        if let Some(coll) = self.collections.read().get(name) {
            return Arc::clone(coll);
        }
        let mut collections = self.collections.write();
        Arc::clone(
            collections
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(Collection::new(name, unique_field))),
        )
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Run `f` with write locks held over the named collections
    ///
    /// Inserts staged inside `f` apply only if `f` returns `Ok`; any error
    /// leaves every collection untouched. Locks are acquired in collection
    /// name order, the one fixed order every transaction uses.
    pub fn with_transaction<T>(
        &self,
        names: &[&str],
        f: impl FnOnce(&mut Txn<'_>) -> Result<T>,
    ) -> Result<T> {
        let mut sorted: Vec<&str> = names.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let colls: Vec<Arc<Collection>> = sorted
            .iter()
            .map(|name| self.collection(name))
            .collect();

        let mut txn = Txn {
            guards: colls
                .iter()
                .map(|coll| (coll.name().to_string(), coll.begin_write()))
                .collect(),
            staged: BTreeMap::new(),
        };

        let out = f(&mut txn)?;
        txn.commit();
        Ok(out)
    }

    // =========================================================================
    // Snapshot
    // =========================================================================

    /// Write every collection to a JSON snapshot file
    pub fn save_snapshot(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let collections = self.collections.read();
        let snapshot: BTreeMap<&str, Vec<Document>> = collections
            .iter()
            .map(|(name, coll)| (name.as_str(), coll.export()))
            .collect();
        let file = fs::File::create(path)?;
        serde_json::to_writer_pretty(file, &snapshot)
            .map_err(|e| OpsError::Store(format!("snapshot write failed: {e}")))?;
        Ok(())
    }

    /// Restore collections from a JSON snapshot file
    ///
    /// Collections that already exist keep their unique-field registration;
    /// unknown names come back without one.
    pub fn read_snapshot(&self, path: &Path) -> Result<()> {
        let file = fs::File::open(path)?;
        let snapshot: BTreeMap<String, Vec<Document>> = serde_json::from_reader(file)
            .map_err(|e| OpsError::Store(format!("snapshot read failed: {e}")))?;
        for (name, docs) in snapshot {
            self.collection(&name).restore(docs)?;
        }
        Ok(())
    }
}

/// An open multi-collection transaction
///
/// Documents are staged, not yet visible; [`MemoryStore::with_transaction`]
/// commits them while all locks are still held.
pub struct Txn<'a> {
    guards: BTreeMap<String, TxnGuard<'a>>,
    staged: BTreeMap<String, Vec<Document>>,
}

impl Txn<'_> {
    /// The `_id` the next document staged into `collection` will receive
    pub fn next_id(&self, collection: &str) -> Result<u64> {
        let guard = self.guard(collection)?;
        let staged = self.staged.get(collection).map_or(0, Vec::len) as u64;
        Ok(guard.peek_next_id() + staged)
    }

    /// Stage a document for insert
    ///
    /// Unique-field collisions, against stored documents or against
    /// documents staged earlier in this transaction, fail here before
    /// anything has been committed.
    pub fn stage(&mut self, collection: &str, doc: Document) -> Result<()> {
        {
            let guard = self.guard(collection)?;
            if let Some(value) = unique_value(guard, &doc) {
                let staged_dup = self.staged.get(collection).is_some_and(|docs| {
                    docs.iter()
                        .any(|d| unique_value(guard, d).as_deref() == Some(value.as_str()))
                });
                if guard.is_unique_taken(&value) || staged_dup {
                    return Err(OpsError::DuplicateIdentifier { id: value });
                }
            }
        }
        self.staged
            .entry(collection.to_string())
            .or_default()
            .push(doc);
        Ok(())
    }

    fn guard(&self, collection: &str) -> Result<&TxnGuard<'_>> {
        self.guards.get(collection).ok_or_else(|| {
            OpsError::Store(format!(
                "collection \"{collection}\" is not part of this transaction"
            ))
        })
    }

    fn commit(mut self) {
        for (name, docs) in std::mem::take(&mut self.staged) {
            let guard = self
                .guards
                .get_mut(&name)
                .expect("staged collections are always locked");
            for doc in docs {
                guard.insert(doc);
            }
        }
    }
}

fn unique_value(guard: &TxnGuard<'_>, doc: &Document) -> Option<String> {
    guard
        .unique_field()
        .and_then(|field| super::doc_str(doc, field))
        .map(str::to_string)
}
