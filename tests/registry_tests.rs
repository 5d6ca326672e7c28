//! Tests for user registration
//!
//! These tests verify:
//! - The first user becomes super with no employee id
//! - Later users get given-name employee ids sequenced over the non-super count
//! - The employee cap is enforced
//! - User, OTP, and trial order commit atomically
//! - A failing notifier never fails the registration

use std::sync::Arc;

use opsledger::registry::{OTPS, SUBSCRIPTION_ORDERS, USERS};
use opsledger::store::{doc_id, doc_str, Document};
use opsledger::{Config, Notifier, OpsError, OpsEngine};
use serde_json::Value;

// =============================================================================
// Helper Functions
// =============================================================================

fn engine() -> OpsEngine {
    OpsEngine::new(Config::default())
}

fn user(first_name: &str, email: &str) -> Document {
    let mut doc = Document::new();
    doc.insert("first_name".to_string(), Value::from(first_name));
    doc.insert("email".to_string(), Value::from(email));
    doc
}

struct FailingNotifier;

impl Notifier for FailingNotifier {
    fn send(&self, _to: &str, _subject: &str, _body: &str) -> opsledger::Result<()> {
        Err(OpsError::Store("smtp unreachable".to_string()))
    }
}

// =============================================================================
// Super User and Employee Ids
// =============================================================================

#[test]
fn test_first_user_is_super_without_employee_id() {
    let engine = engine();
    let receipt = engine.register_user(user("Root", "root@example.com")).unwrap();

    assert_eq!(receipt.user.get("is_super"), Some(&Value::Bool(true)));
    assert_eq!(receipt.user.get("employee_id"), Some(&Value::Null));
}

#[test]
fn test_employee_ids_sequence_over_non_super_count() {
    let engine = engine();
    engine.register_user(user("Root", "root@example.com")).unwrap();

    let second = engine
        .register_user(user("Abcde", "abcde@example.com"))
        .unwrap();
    assert_eq!(doc_str(&second.user, "employee_id"), Some("ABC0001"));
    assert_eq!(second.user.get("is_super"), Some(&Value::Bool(false)));

    let third = engine
        .register_user(user("Barbara", "barbara@example.com"))
        .unwrap();
    assert_eq!(doc_str(&third.user, "employee_id"), Some("BAR0002"));
}

#[test]
fn test_short_first_name_uses_fallback_prefix() {
    let engine = engine();
    engine.register_user(user("Root", "root@example.com")).unwrap();

    let receipt = engine.register_user(user("Al", "al@example.com")).unwrap();
    assert_eq!(doc_str(&receipt.user, "employee_id"), Some("EMP0001"));
}

#[test]
fn test_employee_cap_is_enforced() {
    let config = Config::builder().employee_limit(2).build();
    let engine = OpsEngine::new(config);

    engine.register_user(user("Root", "root@example.com")).unwrap();
    engine.register_user(user("Alice", "alice@example.com")).unwrap();
    engine.register_user(user("Bobby", "bobby@example.com")).unwrap();

    let err = engine
        .register_user(user("Carol", "carol@example.com"))
        .unwrap_err();
    assert!(matches!(err, OpsError::EmployeeLimit { max: 2 }));
}

// =============================================================================
// Transactional Writes
// =============================================================================

#[test]
fn test_registration_writes_user_otp_and_trial_order() {
    let engine = engine();
    let receipt = engine.register_user(user("Root", "root@example.com")).unwrap();
    let user_id = doc_id(&receipt.user).unwrap();

    let otp_doc = engine
        .store()
        .collection(OTPS)
        .find_one(|d| doc_str(d, "email") == Some("root@example.com"))
        .unwrap();
    assert_eq!(doc_str(&otp_doc, "otp"), Some(receipt.otp.as_str()));
    assert_eq!(receipt.otp.len(), 4);

    let order = engine
        .store()
        .collection(SUBSCRIPTION_ORDERS)
        .find_one(|d| d.get("user_id") == Some(&Value::from(user_id)))
        .unwrap();
    assert_eq!(doc_str(&order, "plan"), Some("Free Trial"));
    assert_eq!(doc_str(&order, "status"), Some("created"));
    assert!(doc_str(&order, "end_date").is_some());
}

#[test]
fn test_duplicate_email_rolls_back_everything() {
    let engine = engine();
    engine.register_user(user("Root", "root@example.com")).unwrap();

    let err = engine
        .register_user(user("Clone", "root@example.com"))
        .unwrap_err();
    assert!(matches!(err, OpsError::DuplicateIdentifier { .. }));

    // Exactly one of each document: the failed registration left nothing
    assert_eq!(engine.store().collection(USERS).len(), 1);
    assert_eq!(engine.store().collection(OTPS).len(), 1);
    assert_eq!(engine.store().collection(SUBSCRIPTION_ORDERS).len(), 1);
}

#[test]
fn test_failed_notification_does_not_fail_registration() {
    let engine = OpsEngine::with_notifier(Config::default(), Arc::new(FailingNotifier));
    let receipt = engine.register_user(user("Root", "root@example.com")).unwrap();

    assert_eq!(doc_str(&receipt.user, "email"), Some("root@example.com"));
    assert_eq!(engine.store().collection(USERS).len(), 1);
}

// =============================================================================
// Verification
// =============================================================================

#[test]
fn test_verify_consumes_otp_and_flags_user() {
    let engine = engine();
    engine.register_user(user("Root", "root@example.com")).unwrap();

    engine.verify_user("root@example.com").unwrap();

    assert_eq!(engine.store().collection(OTPS).len(), 0);
    let stored = engine
        .store()
        .collection(USERS)
        .find_one(|d| doc_str(d, "email") == Some("root@example.com"))
        .unwrap();
    assert_eq!(stored.get("is_verified"), Some(&Value::Bool(true)));
}

#[test]
fn test_verify_unknown_email_errors() {
    let engine = engine();
    let err = engine.verify_user("ghost@example.com").unwrap_err();
    assert!(matches!(err, OpsError::Store(_)));
}
