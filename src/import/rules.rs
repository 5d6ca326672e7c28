//! Required-field rule tables
//!
//! The per-kind validation rule sets, expressed as data: an ordered list of
//! required fields with their user-facing messages, evaluated top to bottom
//! per row. Adding an entity kind to the import pipeline means adding a
//! table here.

use crate::entity::EntityKind;

/// One required-field check
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    /// Column header the field is read from
    pub field: &'static str,

    /// Message reported when the field is missing or blank
    pub message: &'static str,
}

const PARTY_RULES: &[FieldRule] = &[
    FieldRule {
        field: "type",
        message: "Party type is a required field",
    },
    FieldRule {
        field: "contact_number",
        message: "Contact number is a required field",
    },
    FieldRule {
        field: "bill_to",
        message: "Bill to is a required field",
    },
];

const AGENT_RULES: &[FieldRule] = &[
    FieldRule {
        field: "name",
        message: "Agent name is a required field",
    },
    FieldRule {
        field: "agent_type",
        message: "Agent type is a required field",
    },
    FieldRule {
        field: "contact_number",
        message: "Contact number is a required field",
    },
];

const STORE_RULES: &[FieldRule] = &[
    FieldRule {
        field: "name",
        message: "Store name is a required field",
    },
    FieldRule {
        field: "address_line1",
        message: "Address line 1 is a required field",
    },
    FieldRule {
        field: "city",
        message: "City is a required field",
    },
    FieldRule {
        field: "state",
        message: "State is a required field",
    },
];

const ORDER_RULES: &[FieldRule] = &[
    FieldRule {
        field: "product_qty",
        message: "Product quantity is a required field",
    },
    FieldRule {
        field: "price",
        message: "Price is a required field",
    },
    FieldRule {
        field: "mode_of_payment",
        message: "Mode of payment is a required field",
    },
];

const PRODUCT_RULES: &[FieldRule] = &[
    FieldRule {
        field: "name",
        message: "Product name is a required field",
    },
    FieldRule {
        field: "category",
        message: "Category is a required field",
    },
];

/// The rule table for an entity kind
pub fn rules_for(kind: EntityKind) -> &'static [FieldRule] {
    match kind {
        EntityKind::Party => PARTY_RULES,
        EntityKind::Agent => AGENT_RULES,
        EntityKind::Store => STORE_RULES,
        EntityKind::SalesOrder => ORDER_RULES,
        EntityKind::Product => PRODUCT_RULES,
    }
}
