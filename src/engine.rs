//! Engine Module
//!
//! The coordinating facade over the store, the identifier allocator, the
//! bulk importer, and the user registry.
//!
//! ## Responsibilities
//! - Single-record create/update/delete/fetch per entity kind
//! - Allocate-and-insert with bounded retry on identifier conflicts
//! - Apply each kind's identifier-mutability policy on update
//! - Delegate bulk import and user registration
//!
//! ## Concurrency Model
//!
//! Creation for a (kind, prefix) pair runs inside that pair's allocation
//! lock, so resolve → render → insert is a critical section in-process. The
//! unique index on every kind's identifier field backstops what the lock
//! cannot see; a duplicate rejection re-resolves and retries up to
//! `alloc_max_retries` times before surfacing a conflict.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use crate::config::Config;
use crate::entity::{EntityKind, IdPolicy, ALL_KINDS};
use crate::error::{OpsError, Result};
use crate::ident::{IdAllocator, Identifier, Prefix};
use crate::import::{BulkImporter, ImportReport};
use crate::registry::{LogNotifier, Notifier, RegistrationReceipt, Registry};
use crate::store::{doc_str, Collection, Document, MemoryStore};

/// Snapshot filename inside the data directory
const SNAPSHOT_FILENAME: &str = "ledger.json";

/// The operations-management engine
pub struct OpsEngine {
    config: Config,
    store: Arc<MemoryStore>,
    allocator: IdAllocator,
    registry: Registry,
}

impl OpsEngine {
    /// Create an engine over a fresh in-memory store
    pub fn new(config: Config) -> Self {
        Self::with_notifier(config, Arc::new(LogNotifier))
    }

    /// Create an engine with a custom notification channel
    pub fn with_notifier(config: Config, notifier: Arc<dyn Notifier>) -> Self {
        let store = Arc::new(MemoryStore::new());

        // Register every kind's collection with its identifier unique index
        for kind in ALL_KINDS {
            store.collection_with_unique(kind.collection_name(), Some(kind.id_field()));
        }

        let allocator = IdAllocator::new(Arc::clone(&store), config.sequence_width);
        let registry = Registry::new(Arc::clone(&store), notifier, &config);

        Self {
            config,
            store,
            allocator,
            registry,
        }
    }

    /// Create an engine and load the snapshot under `data_dir`, if present
    pub fn open(config: Config) -> Result<Self> {
        let engine = Self::new(config);
        let snapshot = engine.snapshot_path();
        if snapshot.exists() {
            engine.store.read_snapshot(&snapshot)?;
            info!(path = %snapshot.display(), "snapshot loaded");
        }
        Ok(engine)
    }

    /// Persist the store to the snapshot under `data_dir`
    pub fn save(&self) -> Result<()> {
        self.store.save_snapshot(&self.snapshot_path())
    }

    /// The engine's configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The underlying store
    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    // =========================================================================
    // Identifier Allocation
    // =========================================================================

    /// Compute the identifier a record with these attributes would receive
    pub fn allocate(&self, kind: EntityKind, doc: &Document) -> Result<Identifier> {
        self.allocator.allocate(kind, doc)
    }

    // =========================================================================
    // Single-Record Operations
    // =========================================================================

    /// Create a record, assigning its identifier
    pub fn create(&self, kind: EntityKind, doc: Document) -> Result<Document> {
        let prefix = self.allocator.derive_prefix(kind, &doc)?;
        let coll = self.collection(kind);
        self.insert_with_retry(kind, &prefix, &coll, doc)
    }

    /// Merge a patch into a record
    ///
    /// Identifier handling follows the kind's policy: immutable kinds keep
    /// their stored identifier no matter what the patch says; a
    /// rederive-on-update kind gets a fresh identifier when the patch moves
    /// its derived prefix.
    pub fn update(&self, kind: EntityKind, id: u64, mut patch: Document) -> Result<Document> {
        let coll = self.collection(kind);
        let existing = coll.find_by_id(id).ok_or(OpsError::NotFound {
            kind: kind.label(),
            id,
        })?;

        match kind.id_policy() {
            IdPolicy::Immutable => {
                // The caller does not get to rename a record
                patch.remove(kind.id_field());
            }
            IdPolicy::RederiveOnUpdate => {
                patch.remove(kind.id_field());

                let mut merged = existing.clone();
                for (key, value) in &patch {
                    merged.insert(key.clone(), value.clone());
                }
                let new_prefix = self.allocator.derive_prefix(kind, &merged)?;

                let keeps_prefix = doc_str(&existing, kind.id_field())
                    .and_then(|id| Identifier::parse_seq(id, new_prefix.as_str()))
                    .is_some();
                if !keeps_prefix {
                    // Identity attributes moved the prefix; allocate anew
                    let fresh = self.allocator.with_prefix_lock(kind, &new_prefix, |alloc| {
                        Ok(alloc.next_identifier(kind, &new_prefix))
                    })?;
                    info!(kind = %kind, id, new_id = %fresh, "identifier re-derived on update");
                    patch.insert(
                        kind.id_field().to_string(),
                        Value::from(fresh.to_string()),
                    );
                }
            }
        }

        coll.update_by_id(id, patch)?.ok_or(OpsError::NotFound {
            kind: kind.label(),
            id,
        })
    }

    /// Delete a record
    pub fn delete(&self, kind: EntityKind, id: u64) -> Result<Document> {
        self.collection(kind)
            .delete_by_id(id)
            .ok_or(OpsError::NotFound {
                kind: kind.label(),
                id,
            })
    }

    /// Fetch a record
    pub fn get(&self, kind: EntityKind, id: u64) -> Result<Document> {
        self.collection(kind)
            .find_by_id(id)
            .ok_or(OpsError::NotFound {
                kind: kind.label(),
                id,
            })
    }

    /// One page of records, newest first, plus the total count
    pub fn list(&self, kind: EntityKind, page: usize, per_page: usize) -> (Vec<Document>, usize) {
        self.collection(kind).page(page, per_page)
    }

    // =========================================================================
    // Bulk Import
    // =========================================================================

    /// Import an uploaded tabular file as one atomic batch
    pub fn import_batch(&self, kind: EntityKind, path: &Path) -> Result<ImportReport> {
        BulkImporter::new(&self.store, &self.allocator, &self.config).import(kind, path)
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Register a user (user + OTP + trial order, atomically)
    pub fn register_user(&self, user: Document) -> Result<RegistrationReceipt> {
        self.registry.register(user)
    }

    /// Verify a user's account from their email
    pub fn verify_user(&self, email: &str) -> Result<()> {
        self.registry.verify(email)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn collection(&self, kind: EntityKind) -> Arc<Collection> {
        self.store
            .collection_with_unique(kind.collection_name(), Some(kind.id_field()))
    }

    fn snapshot_path(&self) -> PathBuf {
        self.config.data_dir.join(SNAPSHOT_FILENAME)
    }

    /// Allocate-and-insert under the prefix lock, retrying on duplicates
    fn insert_with_retry(
        &self,
        kind: EntityKind,
        prefix: &Prefix,
        coll: &Collection,
        doc: Document,
    ) -> Result<Document> {
        self.allocator.with_prefix_lock(kind, prefix, |alloc| {
            let attempts = self.config.alloc_max_retries.max(1);
            for attempt in 1..=attempts {
                let ident = alloc.next_identifier(kind, prefix);
                let mut candidate = doc.clone();
                candidate.insert(kind.id_field().to_string(), Value::from(ident.to_string()));

                match coll.insert_one(candidate) {
                    Ok(stored) => {
                        info!(kind = %kind, id = %ident, "record created");
                        return Ok(stored);
                    }
                    Err(OpsError::DuplicateIdentifier { id }) => {
                        // Taken by a writer outside this lock; resolve again
                        warn!(kind = %kind, duplicate = %id, attempt, "create collided, retrying");
                    }
                    Err(e) => return Err(e),
                }
            }
            Err(OpsError::AllocationConflict {
                prefix: prefix.to_string(),
                attempts,
            })
        })
    }
}
