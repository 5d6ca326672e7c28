//! Error types for opsledger
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using OpsError
pub type Result<T> = std::result::Result<T, OpsError>;

/// Unified error type for opsledger operations
#[derive(Debug, Error)]
pub enum OpsError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Import Errors
    // -------------------------------------------------------------------------
    #[error("Unsupported file type \"{extension}\". Please upload .csv or .xlsx")]
    UnsupportedFormat { extension: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("{message} in row: {row}")]
    RowValidation {
        /// 1-based row number of the first offending row
        row: usize,
        /// First missing field in that row
        field: &'static str,
        message: &'static str,
    },

    #[error("Import of {rows} rows exceeds the limit of {max}")]
    ImportTooLarge { rows: usize, max: usize },

    // -------------------------------------------------------------------------
    // Identifier Errors
    // -------------------------------------------------------------------------
    #[error("Invalid category {value:?} for ID generation")]
    InvalidCategory { value: String },

    #[error("Category is required for ID generation")]
    MissingCategory,

    #[error("Duplicate identifier \"{id}\"")]
    DuplicateIdentifier { id: String },

    #[error("Allocation for prefix \"{prefix}\" still conflicted after {attempts} attempts")]
    AllocationConflict { prefix: String, attempts: usize },

    // -------------------------------------------------------------------------
    // Record Errors
    // -------------------------------------------------------------------------
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: u64 },

    #[error("Maximum limit of {max} employees reached")]
    EmployeeLimit { max: usize },

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Storage error: {0}")]
    Store(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
