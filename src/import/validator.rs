//! Row validation
//!
//! Applies an entity kind's rule table to every row before anything is
//! allocated or persisted. Validation is front-loaded and all-or-nothing:
//! the first missing field of the first offending row fails the whole
//! batch.

use super::rules::rules_for;
use super::RowSet;
use crate::entity::EntityKind;
use crate::error::{OpsError, Result};

/// Validate every row of a batch, in row order
///
/// Returns:
/// - `Ok(())` — every row carries every required field
/// - `Err(RowValidation)` — 1-based row number and field of the first failure
pub fn validate_rows(kind: EntityKind, rows: &RowSet) -> Result<()> {
    let rules = rules_for(kind);
    for (index, row) in rows.rows.iter().enumerate() {
        for rule in rules {
            if row.is_blank(rule.field) {
                return Err(OpsError::RowValidation {
                    row: index + 1,
                    field: rule.field,
                    message: rule.message,
                });
            }
        }
    }
    Ok(())
}
