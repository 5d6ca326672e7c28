//! Tests for the engine facade
//!
//! These tests verify:
//! - Create assigns identifiers and stamps internal ids
//! - Update applies each kind's identifier policy
//! - Delete/get report NotFound for unknown ids
//! - Listing pages newest first
//! - The store's unique index rejects hand-planted duplicates

use opsledger::store::{doc_id, doc_str};
use opsledger::{Config, Document, EntityKind, OpsError, OpsEngine};
use serde_json::{json, Value};

// =============================================================================
// Helper Functions
// =============================================================================

fn engine() -> OpsEngine {
    OpsEngine::new(Config::default())
}

fn doc(pairs: &[(&str, Value)]) -> Document {
    let mut doc = Document::new();
    for (key, value) in pairs {
        doc.insert(key.to_string(), value.clone());
    }
    doc
}

// =============================================================================
// Create
// =============================================================================

#[test]
fn test_create_assigns_identifier_and_internal_id() {
    let engine = engine();
    let stored = engine
        .create(
            EntityKind::Party,
            doc(&[("type", json!("Company")), ("company_name", json!("Acme"))]),
        )
        .unwrap();

    assert_eq!(doc_str(&stored, "cust_id"), Some("AC001"));
    assert!(doc_id(&stored).is_some());
}

#[test]
fn test_order_create_uses_literal_prefix() {
    let engine = engine();
    let o1 = engine
        .create(
            EntityKind::SalesOrder,
            doc(&[("price", json!("120")), ("product_qty", json!("3"))]),
        )
        .unwrap();
    let o2 = engine.create(EntityKind::SalesOrder, Document::new()).unwrap();

    assert_eq!(doc_str(&o1, "order_id"), Some("OID001"));
    assert_eq!(doc_str(&o2, "order_id"), Some("OID002"));
}

#[test]
fn test_product_create_derives_from_category() {
    let engine = engine();
    let fin = engine
        .create(
            EntityKind::Product,
            doc(&[("name", json!("Widget")), ("category", json!("finished goods"))]),
        )
        .unwrap();
    assert_eq!(doc_str(&fin, "product_id"), Some("FG001"));

    let bop = engine
        .create(
            EntityKind::Product,
            doc(&[("name", json!("Bolt")), ("category", json!("bought out parts"))]),
        )
        .unwrap();
    assert_eq!(doc_str(&bop, "product_id"), Some("BOP001"));
}

#[test]
fn test_product_create_without_category_fails_before_insert() {
    let engine = engine();
    let err = engine
        .create(EntityKind::Product, doc(&[("name", json!("Widget"))]))
        .unwrap_err();
    assert!(matches!(err, OpsError::MissingCategory));
    assert_eq!(engine.list(EntityKind::Product, 1, 10).1, 0);
}

// =============================================================================
// Update: Identifier Policies
// =============================================================================

#[test]
fn test_party_update_rederives_when_prefix_moves() {
    let engine = engine();
    let stored = engine
        .create(
            EntityKind::Party,
            doc(&[("type", json!("Company")), ("company_name", json!("Acme"))]),
        )
        .unwrap();
    let id = doc_id(&stored).unwrap();
    assert_eq!(doc_str(&stored, "cust_id"), Some("AC001"));

    let updated = engine
        .update(
            EntityKind::Party,
            id,
            doc(&[("company_name", json!("Zenith"))]),
        )
        .unwrap();
    assert_eq!(doc_str(&updated, "cust_id"), Some("ZE001"));
}

#[test]
fn test_party_update_keeps_identifier_when_prefix_unchanged() {
    let engine = engine();
    let stored = engine
        .create(
            EntityKind::Party,
            doc(&[("type", json!("Company")), ("company_name", json!("Acme"))]),
        )
        .unwrap();
    let id = doc_id(&stored).unwrap();

    let updated = engine
        .update(
            EntityKind::Party,
            id,
            doc(&[("company_name", json!("Acumen")), ("contact_number", json!("9"))]),
        )
        .unwrap();

    // Still an AC name: no new number is burned
    assert_eq!(doc_str(&updated, "cust_id"), Some("AC001"));
    assert_eq!(doc_str(&updated, "contact_number"), Some("9"));
}

#[test]
fn test_agent_identifier_is_immutable() {
    let engine = engine();
    let stored = engine
        .create(EntityKind::Agent, doc(&[("name", json!("North Desk"))]))
        .unwrap();
    let id = doc_id(&stored).unwrap();

    let updated = engine
        .update(
            EntityKind::Agent,
            id,
            doc(&[("agent_id", json!("AG999")), ("name", json!("Renamed Desk"))]),
        )
        .unwrap();

    // The caller's identifier is discarded; the stored one survives
    assert_eq!(doc_str(&updated, "agent_id"), Some("AG001"));
    assert_eq!(doc_str(&updated, "name"), Some("Renamed Desk"));
}

#[test]
fn test_update_unknown_record_is_not_found() {
    let engine = engine();
    let err = engine
        .update(EntityKind::Agent, 42, Document::new())
        .unwrap_err();
    assert!(matches!(err, OpsError::NotFound { id: 42, .. }));
}

// =============================================================================
// Delete / Get / List
// =============================================================================

#[test]
fn test_delete_then_get_is_not_found() {
    let engine = engine();
    let stored = engine
        .create(EntityKind::Store, doc(&[("name", json!("Alpha"))]))
        .unwrap();
    let id = doc_id(&stored).unwrap();

    engine.delete(EntityKind::Store, id).unwrap();
    let err = engine.get(EntityKind::Store, id).unwrap_err();
    assert!(matches!(err, OpsError::NotFound { .. }));
}

#[test]
fn test_deleted_number_is_not_reissued_while_higher_exists() {
    let engine = engine();
    let first = engine.create(EntityKind::Agent, Document::new()).unwrap();
    engine.create(EntityKind::Agent, Document::new()).unwrap();

    engine
        .delete(EntityKind::Agent, doc_id(&first).unwrap())
        .unwrap();

    // AG002 is still the numeric maximum, so the next is AG003
    let next = engine.create(EntityKind::Agent, Document::new()).unwrap();
    assert_eq!(doc_str(&next, "agent_id"), Some("AG003"));
}

#[test]
fn test_list_pages_newest_first() {
    let engine = engine();
    for i in 1..=5 {
        engine
            .create(EntityKind::Store, doc(&[("name", json!(format!("S{i}")))]))
            .unwrap();
    }

    let (page1, total) = engine.list(EntityKind::Store, 1, 2);
    assert_eq!(total, 5);
    let names: Vec<&str> = page1.iter().map(|d| doc_str(d, "name").unwrap()).collect();
    assert_eq!(names, vec!["S5", "S4"]);

    let (page3, _) = engine.list(EntityKind::Store, 3, 2);
    let names: Vec<&str> = page3.iter().map(|d| doc_str(d, "name").unwrap()).collect();
    assert_eq!(names, vec!["S1"]);
}

// =============================================================================
// Unique Index Backstop
// =============================================================================

#[test]
fn test_store_rejects_duplicate_identifiers() {
    let engine = engine();
    engine.create(EntityKind::Agent, Document::new()).unwrap();

    let mut forged = Document::new();
    forged.insert("agent_id".to_string(), Value::from("AG001"));
    let err = engine
        .store()
        .collection(EntityKind::Agent.collection_name())
        .insert_one(forged)
        .unwrap_err();
    assert!(matches!(err, OpsError::DuplicateIdentifier { id } if id == "AG001"));
}
