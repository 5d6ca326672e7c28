//! User registry
//!
//! Registration writes three documents (the user, a one-time password, and
//! a trial subscription order) in one store transaction: either all three
//! commit or none do. The verification email is a best-effort side effect
//! outside the transaction boundary; a delivery failure is logged and never
//! rolls anything back.

use std::sync::Arc;

use chrono::{Days, NaiveTime, Utc};
use parking_lot::Mutex;
use rand::Rng;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{OpsError, Result};
use crate::ident::{Identifier, PrefixRule};
use crate::store::{doc_str, Document, MemoryStore};

/// Collection holding user accounts
pub const USERS: &str = "users";

/// Collection holding pending one-time passwords
pub const OTPS: &str = "otps";

/// Collection holding subscription orders
pub const SUBSCRIPTION_ORDERS: &str = "subscription_orders";

/// Digit width of employee sequence numbers ("ABC0001")
const EMPLOYEE_SEQ_WIDTH: usize = 4;

/// Outbound notification channel (email in production)
pub trait Notifier: Send + Sync {
    /// Deliver a message; failures are the caller's to tolerate
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

/// Notifier that logs instead of delivering
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, to: &str, subject: &str, _body: &str) -> Result<()> {
        info!(to, subject, "notification");
        Ok(())
    }
}

/// What a successful registration produced
#[derive(Debug, Clone)]
pub struct RegistrationReceipt {
    /// The stored user document
    pub user: Document,

    /// The one-time password sent to the user
    pub otp: String,
}

/// Coordinates user registration and verification
pub struct Registry {
    store: Arc<MemoryStore>,
    notifier: Arc<dyn Notifier>,
    employee_limit: usize,
    trial_days: u64,

    /// Serializes count-then-insert so concurrent registrations cannot
    /// both observe the same employee count
    gate: Mutex<()>,
}

impl Registry {
    /// Create a registry over the store
    pub fn new(store: Arc<MemoryStore>, notifier: Arc<dyn Notifier>, config: &Config) -> Self {
        // Users are unique by email; the other two collections have no index
        store.collection_with_unique(USERS, Some("email"));
        store.collection(OTPS);
        store.collection(SUBSCRIPTION_ORDERS);
        Self {
            store,
            notifier,
            employee_limit: config.employee_limit,
            trial_days: config.trial_days,
            gate: Mutex::new(()),
        }
    }

    /// Register a user
    ///
    /// - The first user ever becomes super and gets no employee id
    /// - Every later user gets an employee id from the first three letters
    ///   of their first name ("EMP" fallback), sequenced over the non-super
    ///   count, and counts against the employee cap
    /// - User, OTP, and trial subscription order commit atomically
    /// - The OTP email goes out after commit, best-effort
    pub fn register(&self, mut user: Document) -> Result<RegistrationReceipt> {
        let _gate = self.gate.lock();

        let users = self.store.collection(USERS);
        let total_users = users.len();
        let non_super = users.count(|doc| doc.get("is_super") != Some(&Value::Bool(true)));

        if non_super >= self.employee_limit {
            return Err(OpsError::EmployeeLimit {
                max: self.employee_limit,
            });
        }

        let is_super = total_users == 0;
        let employee_id = if is_super {
            None
        } else {
            let rule = PrefixRule::GivenName { fallback: "EMP" };
            let prefix = rule.derive(&user)?;
            Some(Identifier::new(prefix, (non_super + 1) as u64, EMPLOYEE_SEQ_WIDTH).to_string())
        };

        user.insert("is_super".to_string(), Value::Bool(is_super));
        user.insert("is_verified".to_string(), Value::Bool(false));
        match &employee_id {
            Some(id) => user.insert("employee_id".to_string(), Value::from(id.clone())),
            None => user.insert("employee_id".to_string(), Value::Null),
        };

        let email = doc_str(&user, "email").unwrap_or_default().to_string();
        let first_name = doc_str(&user, "first_name").unwrap_or_default().to_string();
        let otp = generate_otp();

        let stored_user =
            self.store
                .with_transaction(&[USERS, OTPS, SUBSCRIPTION_ORDERS], |txn| {
                    let user_id = txn.next_id(USERS)?;
                    txn.stage(USERS, user.clone())?;

                    let mut otp_doc = Document::new();
                    otp_doc.insert("email".to_string(), Value::from(email.clone()));
                    otp_doc.insert("otp".to_string(), Value::from(otp.clone()));
                    txn.stage(OTPS, otp_doc)?;

                    txn.stage(SUBSCRIPTION_ORDERS, self.trial_order(user_id))?;

                    let mut stored = user.clone();
                    stored.insert(crate::store::ID_KEY.to_string(), Value::from(user_id));
                    Ok(stored)
                })?;

        info!(email = %email, is_super, "user registered");

        // Outside the transaction: a failed email never unwinds the writes
        let body = format!(
            "Dear {first_name},\n\nThank you for registering with us! To complete your \
             registration and verify your account, please use the following One-Time \
             Password (OTP): {otp}\n\nThis OTP is valid for 5 minutes. Do not share \
             your OTP with anyone."
        );
        if let Err(e) = self.notifier.send(&email, "Account Verification", &body) {
            warn!(email = %email, error = %e, "OTP delivery failed");
        }

        Ok(RegistrationReceipt {
            user: stored_user,
            otp,
        })
    }

    /// Verify a user: consume the OTP document and flag the account
    pub fn verify(&self, email: &str) -> Result<()> {
        self.store
            .collection(OTPS)
            .delete_one_by(|doc| doc_str(doc, "email") == Some(email));

        let mut patch = Document::new();
        patch.insert("is_verified".to_string(), Value::Bool(true));
        let users = self.store.collection(USERS);
        let user = users.find_one(|doc| doc_str(doc, "email") == Some(email));
        match user.and_then(|doc| crate::store::doc_id(&doc)) {
            Some(id) => {
                users.update_by_id(id, patch)?;
                Ok(())
            }
            None => Err(OpsError::Store(format!("no user registered as {email}"))),
        }
    }

    /// Trial subscription order document for a new user
    fn trial_order(&self, user_id: u64) -> Document {
        let now = Utc::now();
        // Trial ends at midnight `trial_days` out
        let end = (now.date_naive() + Days::new(self.trial_days)).and_time(NaiveTime::MIN);

        let mut order = Document::new();
        order.insert("user_id".to_string(), Value::from(user_id));
        order.insert("plan".to_string(), Value::from("Free Trial"));
        order.insert("amount".to_string(), Value::from(0));
        order.insert("currency".to_string(), Value::from("INR"));
        order.insert("status".to_string(), Value::from("created"));
        order.insert("period".to_string(), Value::from("month"));
        order.insert("start_date".to_string(), Value::from(now.to_rfc3339()));
        order.insert(
            "end_date".to_string(),
            Value::from(end.and_utc().to_rfc3339()),
        );
        order
    }
}

/// Four-digit one-time password
fn generate_otp() -> String {
    let mut rng = rand::rng();
    format!("{:04}", rng.random_range(0..10_000))
}
