//! Entity kinds
//!
//! The record types the ledger manages, with the per-kind facts the rest of
//! the crate keys off: collection name, identifier field, prefix derivation
//! rule, and the identifier-mutability policy.

use std::fmt;
use std::str::FromStr;

use crate::error::OpsError;
use crate::ident::PrefixRule;

/// What happens to a record's identifier when the record is updated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdPolicy {
    /// The identifier assigned at creation never changes
    Immutable,

    /// A fresh identifier is allocated when an update changes the derived
    /// prefix (parties keep this legacy behavior; an unchanged prefix keeps
    /// the existing identifier)
    RederiveOnUpdate,
}

/// A managed record type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Party,
    Agent,
    Store,
    SalesOrder,
    Product,
}

/// All kinds, in a fixed order
pub const ALL_KINDS: [EntityKind; 5] = [
    EntityKind::Party,
    EntityKind::Agent,
    EntityKind::Store,
    EntityKind::SalesOrder,
    EntityKind::Product,
];

impl EntityKind {
    /// Human-readable name, used in messages
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Party => "Party",
            EntityKind::Agent => "Agent",
            EntityKind::Store => "Store",
            EntityKind::SalesOrder => "Purchase Order",
            EntityKind::Product => "Product",
        }
    }

    /// Backing collection name
    pub fn collection_name(&self) -> &'static str {
        match self {
            EntityKind::Party => "parties",
            EntityKind::Agent => "agents",
            EntityKind::Store => "stores",
            EntityKind::SalesOrder => "orders",
            EntityKind::Product => "products",
        }
    }

    /// Field holding the kind's human-readable identifier
    pub fn id_field(&self) -> &'static str {
        match self {
            EntityKind::Party => "cust_id",
            EntityKind::Agent => "agent_id",
            EntityKind::Store => "store_id",
            EntityKind::SalesOrder => "order_id",
            EntityKind::Product => "product_id",
        }
    }

    /// How the identifier prefix is derived
    pub fn prefix_rule(&self) -> PrefixRule {
        match self {
            EntityKind::Party => PrefixRule::PartyStyle { fallback: "CU" },
            EntityKind::Agent => PrefixRule::Literal("AG"),
            EntityKind::Store => PrefixRule::Literal("ST"),
            EntityKind::SalesOrder => PrefixRule::Literal("OID"),
            EntityKind::Product => PrefixRule::CategoryInitials,
        }
    }

    /// Whether updates may replace the identifier
    pub fn id_policy(&self) -> IdPolicy {
        match self {
            EntityKind::Party => IdPolicy::RederiveOnUpdate,
            _ => IdPolicy::Immutable,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for EntityKind {
    type Err = OpsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "party" | "parties" | "customer" => Ok(EntityKind::Party),
            "agent" | "agents" => Ok(EntityKind::Agent),
            "store" | "stores" => Ok(EntityKind::Store),
            "order" | "orders" | "sale" | "purchase" => Ok(EntityKind::SalesOrder),
            "product" | "products" => Ok(EntityKind::Product),
            other => Err(OpsError::Config(format!("unknown entity kind \"{other}\""))),
        }
    }
}
