//! Bulk import orchestration
//!
//! Sequences parse → validate → allocate-per-row → persist-all and owns the
//! failure contract: any error means zero rows were persisted, and the
//! uploaded temp file is gone either way.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use super::{parser, validator};
use crate::config::Config;
use crate::entity::EntityKind;
use crate::error::{OpsError, Result};
use crate::ident::IdAllocator;
use crate::store::MemoryStore;

/// Outcome of a successful import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// Rows persisted (always the full batch)
    pub inserted: usize,
}

/// Removes the uploaded temp file when dropped
///
/// Constructed before the first read so every exit path (unsupported
/// format, validation failure, insert rejection, success) releases the
/// file.
struct TempUpload {
    path: PathBuf,
}

impl TempUpload {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to remove uploaded file");
        }
    }
}

/// Runs one bulk import end to end
pub struct BulkImporter<'a> {
    store: &'a MemoryStore,
    allocator: &'a IdAllocator,
    config: &'a Config,
}

impl<'a> BulkImporter<'a> {
    /// Borrow the collaborators for one import call
    pub fn new(store: &'a MemoryStore, allocator: &'a IdAllocator, config: &'a Config) -> Self {
        Self {
            store,
            allocator,
            config,
        }
    }

    /// Import an uploaded file as one atomic batch
    ///
    /// Steps:
    /// 1. Classify by extension; unsupported formats fail before any row is read
    /// 2. Parse into an ordered row set
    /// 3. Validate every row against the kind's rule table
    /// 4. Allocate an identifier per row through a batch-local counter
    /// 5. Insert all rows as one all-or-nothing write; a duplicate from a
    ///    concurrent writer reseeds the counters and retries, bounded by
    ///    `alloc_max_retries`
    ///
    /// On any error zero rows are persisted. The uploaded file is removed on
    /// every exit path.
    pub fn import(&self, kind: EntityKind, path: &Path) -> Result<ImportReport> {
        let _upload = TempUpload::new(path);

        let rows = parser::parse_file(path)?;
        if rows.len() > self.config.import_max_rows {
            return Err(OpsError::ImportTooLarge {
                rows: rows.len(),
                max: self.config.import_max_rows,
            });
        }

        validator::validate_rows(kind, &rows)?;

        let coll = self
            .store
            .collection_with_unique(kind.collection_name(), Some(kind.id_field()));

        let attempts = self.config.alloc_max_retries.max(1);
        let mut batch = self.allocator.batch(kind);
        let mut last_conflict = String::new();

        for attempt in 1..=attempts {
            let mut docs = Vec::with_capacity(rows.len());
            for row in &rows.rows {
                let mut doc = row.to_document();
                batch.assign(&mut doc)?;
                docs.push(doc);
            }

            match coll.insert_many(docs) {
                Ok(inserted) => {
                    info!(kind = %kind, inserted, attempt, "bulk import persisted");
                    return Ok(ImportReport { inserted });
                }
                Err(OpsError::DuplicateIdentifier { id }) => {
                    // A concurrent writer took one of our numbers; reseed
                    // every counter from the store and re-allocate the batch
                    warn!(kind = %kind, duplicate = %id, attempt, "import collided, retrying");
                    last_conflict = id;
                    batch.reset();
                }
                Err(e) => return Err(e),
            }
        }

        Err(OpsError::AllocationConflict {
            prefix: last_conflict,
            attempts,
        })
    }
}
