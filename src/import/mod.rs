//! Bulk import module
//!
//! Turns an uploaded tabular file into persisted records, atomically from
//! the caller's point of view: either every row validates, receives an
//! identifier, and is inserted, or nothing is.
//!
//! ## Pipeline
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌───────────┐    ┌─────────────┐
//! │  Parser  │───▶│ Validator│───▶│ Allocator │───▶│ insert_many │
//! │ csv/xlsx │    │ per-kind │    │ per-row   │    │ all-or-none │
//! └──────────┘    └──────────┘    └───────────┘    └─────────────┘
//! ```
//!
//! The uploaded temp file is removed on every exit path.

pub mod orchestrator;
pub mod parser;
pub mod rules;
pub mod validator;

pub use orchestrator::{BulkImporter, ImportReport};
pub use parser::TabularFormat;
pub use rules::FieldRule;

use crate::store::Document;

/// One parsed row: header-keyed string cells in column order
#[derive(Debug, Clone, Default)]
pub struct Row {
    cells: Vec<(String, String)>,
}

impl Row {
    /// Build a row from (header, cell) pairs
    pub fn new(cells: Vec<(String, String)>) -> Self {
        Self { cells }
    }

    /// Cell value under a header, if the column exists
    pub fn get(&self, field: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(header, _)| header == field)
            .map(|(_, value)| value.as_str())
    }

    /// Whether a field is absent or blank after trimming
    pub fn is_blank(&self, field: &str) -> bool {
        self.get(field).map_or(true, |v| v.trim().is_empty())
    }

    /// Convert to a document, keeping only non-blank cells
    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        for (header, value) in &self.cells {
            if !value.trim().is_empty() {
                doc.insert(header.clone(), serde_json::Value::from(value.trim()));
            }
        }
        doc
    }
}

/// An ordered batch of parsed rows
#[derive(Debug, Clone, Default)]
pub struct RowSet {
    /// Column headers in file order
    pub headers: Vec<String>,

    /// Rows in file order
    pub rows: Vec<Row>,
}

impl RowSet {
    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the batch has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
