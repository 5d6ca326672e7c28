//! Identifier module
//!
//! Human-readable record identifiers: a short uppercase alphabetic prefix
//! followed by a zero-padded decimal sequence number ("CU001", "OID042").
//!
//! ## Components
//! - [`Prefix`] / [`PrefixRule`] — derive the alphabetic part from record attributes
//! - [`IdAllocator`] — resolve the next sequence number and serialize allocation
//! - [`BatchAllocator`] — batch-local running counters for bulk import

pub mod allocator;
pub mod prefix;

pub use allocator::{BatchAllocator, IdAllocator};
pub use prefix::{Prefix, PrefixRule};

use std::fmt;

/// A fully composed record identifier
///
/// Invariant: for one entity kind and prefix, sequence numbers are unique and
/// strictly increasing in allocation order. The zero padding is a minimum
/// width; past "999" the number simply grows ("1000"), it never wraps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    prefix: Prefix,
    seq: u64,
    width: usize,
}

impl Identifier {
    /// Compose an identifier from its parts
    pub fn new(prefix: Prefix, seq: u64, width: usize) -> Self {
        Self { prefix, seq, width }
    }

    /// The alphabetic part
    pub fn prefix(&self) -> &Prefix {
        &self.prefix
    }

    /// The numeric part
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Extract the sequence number from a rendered identifier
    ///
    /// Returns `None` unless `id` is exactly `prefix` followed by one or more
    /// ASCII digits. The strict remainder check keeps "CU" from matching a
    /// "CUS001" identifier that belongs to a longer prefix.
    pub fn parse_seq(id: &str, prefix: &str) -> Option<u64> {
        let rest = id.strip_prefix(prefix)?;
        if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        rest.parse().ok()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:0width$}", self.prefix, self.seq, width = self.width)
    }
}
