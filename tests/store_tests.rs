//! Tests for the in-memory document store
//!
//! These tests verify:
//! - insert_many is all-or-nothing against the unique index and within a batch
//! - update_by_id merges patches and polices unique-field moves
//! - Snapshot round-trips preserve documents, the unique index, and the
//!   internal id watermark
//! - Multi-collection transactions commit everything or nothing

use opsledger::store::{doc_id, doc_str, Document, MemoryStore};
use opsledger::OpsError;
use serde_json::Value;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn doc_with(field: &str, value: &str) -> Document {
    let mut doc = Document::new();
    doc.insert(field.to_string(), Value::from(value));
    doc
}

// =============================================================================
// Batch Inserts
// =============================================================================

#[test]
fn test_insert_many_is_all_or_nothing_against_existing() {
    let store = MemoryStore::new();
    let coll = store.collection_with_unique("agents", Some("agent_id"));
    coll.insert_one(doc_with("agent_id", "AG002")).unwrap();

    let batch = vec![
        doc_with("agent_id", "AG001"),
        doc_with("agent_id", "AG002"), // collides with the stored document
        doc_with("agent_id", "AG003"),
    ];
    let err = coll.insert_many(batch).unwrap_err();
    assert!(matches!(err, OpsError::DuplicateIdentifier { id } if id == "AG002"));

    // The non-colliding rows were not inserted either
    assert_eq!(coll.len(), 1);
}

#[test]
fn test_insert_many_rejects_in_batch_duplicates() {
    let store = MemoryStore::new();
    let coll = store.collection_with_unique("agents", Some("agent_id"));

    let batch = vec![doc_with("agent_id", "AG001"), doc_with("agent_id", "AG001")];
    let err = coll.insert_many(batch).unwrap_err();
    assert!(matches!(err, OpsError::DuplicateIdentifier { .. }));
    assert!(coll.is_empty());
}

#[test]
fn test_internal_ids_increase_monotonically() {
    let store = MemoryStore::new();
    let coll = store.collection("things");
    let a = coll.insert_one(Document::new()).unwrap();
    let b = coll.insert_one(Document::new()).unwrap();
    assert!(doc_id(&a).unwrap() < doc_id(&b).unwrap());
}

// =============================================================================
// Updates
// =============================================================================

#[test]
fn test_update_merges_patch() {
    let store = MemoryStore::new();
    let coll = store.collection("stores");
    let stored = coll.insert_one(doc_with("name", "Alpha")).unwrap();
    let id = doc_id(&stored).unwrap();

    let updated = coll
        .update_by_id(id, doc_with("city", "Pune"))
        .unwrap()
        .unwrap();
    assert_eq!(doc_str(&updated, "name"), Some("Alpha"));
    assert_eq!(doc_str(&updated, "city"), Some("Pune"));
}

#[test]
fn test_update_cannot_steal_a_unique_value() {
    let store = MemoryStore::new();
    let coll = store.collection_with_unique("agents", Some("agent_id"));
    coll.insert_one(doc_with("agent_id", "AG001")).unwrap();
    let second = coll.insert_one(doc_with("agent_id", "AG002")).unwrap();

    let err = coll
        .update_by_id(doc_id(&second).unwrap(), doc_with("agent_id", "AG001"))
        .unwrap_err();
    assert!(matches!(err, OpsError::DuplicateIdentifier { id } if id == "AG001"));
}

#[test]
fn test_update_releases_old_unique_value() {
    let store = MemoryStore::new();
    let coll = store.collection_with_unique("agents", Some("agent_id"));
    let stored = coll.insert_one(doc_with("agent_id", "AG001")).unwrap();

    coll.update_by_id(doc_id(&stored).unwrap(), doc_with("agent_id", "AG009"))
        .unwrap();

    // "AG001" is free again
    coll.insert_one(doc_with("agent_id", "AG001")).unwrap();
    assert_eq!(coll.len(), 2);
}

// =============================================================================
// Snapshot
// =============================================================================

#[test]
fn test_snapshot_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ledger.json");

    let store = MemoryStore::new();
    let coll = store.collection_with_unique("agents", Some("agent_id"));
    coll.insert_one(doc_with("agent_id", "AG001")).unwrap();
    coll.insert_one(doc_with("agent_id", "AG002")).unwrap();
    store.save_snapshot(&path).unwrap();

    let restored = MemoryStore::new();
    let coll = restored.collection_with_unique("agents", Some("agent_id"));
    restored.read_snapshot(&path).unwrap();

    assert_eq!(coll.len(), 2);

    // Unique index survived the round trip
    let err = coll.insert_one(doc_with("agent_id", "AG001")).unwrap_err();
    assert!(matches!(err, OpsError::DuplicateIdentifier { .. }));

    // The id watermark survived too: a new insert gets a fresh internal id
    let fresh = coll.insert_one(doc_with("agent_id", "AG003")).unwrap();
    assert_eq!(doc_id(&fresh), Some(3));
}

// =============================================================================
// Transactions
// =============================================================================

#[test]
fn test_transaction_commits_all_collections() {
    let store = MemoryStore::new();
    store.collection("users");
    store.collection("otps");

    store
        .with_transaction(&["users", "otps"], |txn| {
            txn.stage("users", doc_with("email", "a@b.c"))?;
            txn.stage("otps", doc_with("otp", "1234"))?;
            Ok(())
        })
        .unwrap();

    assert_eq!(store.collection("users").len(), 1);
    assert_eq!(store.collection("otps").len(), 1);
}

#[test]
fn test_transaction_failure_commits_nothing() {
    let store = MemoryStore::new();
    store.collection_with_unique("users", Some("email"));
    store.collection("otps");
    store
        .collection_with_unique("users", Some("email"))
        .insert_one(doc_with("email", "taken@b.c"))
        .unwrap();

    let err = store
        .with_transaction(&["users", "otps"], |txn| {
            txn.stage("otps", doc_with("otp", "1234"))?;
            txn.stage("users", doc_with("email", "taken@b.c"))?; // duplicate
            Ok(())
        })
        .unwrap_err();
    assert!(matches!(err, OpsError::DuplicateIdentifier { .. }));

    // The staged OTP never became visible
    assert_eq!(store.collection("otps").len(), 0);
    assert_eq!(store.collection("users").len(), 1);
}

#[test]
fn test_transaction_next_id_matches_committed_id() {
    let store = MemoryStore::new();
    store.collection("users");

    let predicted = store
        .with_transaction(&["users"], |txn| {
            let predicted = txn.next_id("users")?;
            txn.stage("users", doc_with("email", "a@b.c"))?;
            Ok(predicted)
        })
        .unwrap();

    let stored = store
        .collection("users")
        .find_one(|d| doc_str(d, "email") == Some("a@b.c"))
        .unwrap();
    assert_eq!(doc_id(&stored), Some(predicted));
}
