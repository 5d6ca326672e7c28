//! # opsledger
//!
//! The core of an operations-management backend: parties, agents, stores,
//! orders, and products over a document store, with
//! - prefix-sequential identifier allocation, collision-free under
//!   concurrent load
//! - validated, all-or-nothing bulk import from uploaded spreadsheets
//! - transactional user registration (user + OTP + trial subscription)
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        OpsEngine                             │
//! │     (create / update / import_batch / register_user)         │
//! └───────┬──────────────────┬──────────────────┬───────────────┘
//!         │                  │                  │
//!         ▼                  ▼                  ▼
//!  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐
//!  │ IdAllocator │    │BulkImporter │    │  Registry   │
//!  │ (per-prefix │    │ parse→check │    │ (txn: user+ │
//!  │   lock)     │◀───│ →allocate   │    │  otp+order) │
//!  └──────┬──────┘    └──────┬──────┘    └──────┬──────┘
//!         │                  │                  │
//!         └──────────────────┼──────────────────┘
//!                            ▼
//!                    ┌─────────────┐
//!                    │ MemoryStore │
//!                    │ (unique ids,│
//!                    │  insertMany)│
//!                    └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;

pub mod engine;
pub mod entity;
pub mod ident;
pub mod import;
pub mod registry;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::Config;
pub use engine::OpsEngine;
pub use entity::{EntityKind, IdPolicy};
pub use error::{OpsError, Result};
pub use ident::{IdAllocator, Identifier, Prefix, PrefixRule};
pub use import::{ImportReport, RowSet, TabularFormat};
pub use registry::{LogNotifier, Notifier, RegistrationReceipt};
pub use store::{Document, MemoryStore};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of opsledger
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
