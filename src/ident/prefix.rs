//! Prefix derivation
//!
//! Pure derivation of the alphabetic identifier prefix from record
//! attributes. Derivation never looks at what has already been allocated,
//! only at the attributes it is given.

use std::fmt;

use serde_json::Value;

use crate::error::{OpsError, Result};
use crate::store::Document;

/// An uppercase alphabetic identifier prefix ("CU", "OID", "FG")
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Prefix(String);

impl Prefix {
    /// Build a prefix, normalizing to uppercase
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().to_uppercase())
    }

    /// The prefix as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How an entity kind derives its identifier prefix
///
/// Party-style and given-name rules are total: missing, empty, or
/// wrong-shaped attributes fall back to the fixed constant. Category
/// initials are the exception: a missing or non-string category is a loud
/// error, not an anonymous record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixRule {
    /// First two characters of `company_name` (for `type == "Company"`) or of
    /// the first consignee name, with a fixed fallback
    PartyStyle { fallback: &'static str },

    /// A fixed literal prefix, e.g. "OID" for orders
    Literal(&'static str),

    /// First letter of each word of `category`, truncated to three
    CategoryInitials,

    /// First three characters of `first_name`, with a fixed fallback
    GivenName { fallback: &'static str },
}

impl PrefixRule {
    /// Derive the prefix for a record
    pub fn derive(&self, doc: &Document) -> Result<Prefix> {
        match self {
            PrefixRule::PartyStyle { fallback } => Ok(derive_party(doc, fallback)),
            PrefixRule::Literal(prefix) => Ok(Prefix::new(*prefix)),
            PrefixRule::CategoryInitials => derive_category(doc),
            PrefixRule::GivenName { fallback } => Ok(derive_given_name(doc, fallback)),
        }
    }
}

/// Leading characters of a trimmed string, uppercased
///
/// Returns `None` when the input holds fewer than `n` characters, so callers
/// fall back instead of producing an undersized prefix.
fn leading_chars(s: &str, n: usize) -> Option<String> {
    let trimmed = s.trim();
    let taken: String = trimmed.chars().take(n).collect();
    if taken.chars().count() < n {
        return None;
    }
    Some(taken.to_uppercase())
}

/// Company name for companies, first consignee name otherwise, "CU"-style
/// fallback when neither yields two characters
fn derive_party(doc: &Document, fallback: &str) -> Prefix {
    let is_company = doc
        .get("type")
        .and_then(Value::as_str)
        .is_some_and(|t| t == "Company");

    if is_company {
        if let Some(prefix) = doc
            .get("company_name")
            .and_then(Value::as_str)
            .and_then(|name| leading_chars(name, 2))
        {
            return Prefix::new(prefix);
        }
    }

    // Consignee name may arrive as a list (first entry wins) or a plain string
    let consignee = match doc.get("consignee_name") {
        Some(Value::Array(names)) => names.first().and_then(Value::as_str),
        Some(Value::String(name)) => Some(name.as_str()),
        _ => None,
    };

    match consignee.and_then(|name| leading_chars(name, 2)) {
        Some(prefix) => Prefix::new(prefix),
        None => Prefix::new(fallback),
    }
}

/// Initials of the category words, truncated to three characters
fn derive_category(doc: &Document) -> Result<Prefix> {
    let category = match doc.get("category") {
        None | Some(Value::Null) => return Err(OpsError::MissingCategory),
        Some(Value::String(s)) => s,
        Some(other) => {
            return Err(OpsError::InvalidCategory {
                value: other.to_string(),
            })
        }
    };

    let initials: String = category
        .to_lowercase()
        .split_whitespace()
        .filter_map(|word| word.chars().next())
        .take(3)
        .collect();

    if initials.is_empty() {
        return Err(OpsError::InvalidCategory {
            value: category.clone(),
        });
    }

    Ok(Prefix::new(initials))
}

/// First three characters of the first name, "EMP" fallback
fn derive_given_name(doc: &Document, fallback: &str) -> Prefix {
    match doc
        .get("first_name")
        .and_then(Value::as_str)
        .and_then(|name| leading_chars(name, 3))
    {
        Some(prefix) => Prefix::new(prefix),
        None => Prefix::new(fallback),
    }
}
