//! External collaborator traits and their in-memory implementations.
//!
//! The engine talks to the payment processor, the identity directory and the
//! notifier exclusively through these traits; the in-memory versions back
//! dev wiring and the test suites, with per-step failure injection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use gangway_core::{AccountId, CustomerRef, EmailAddress, FundingSourceRef, PasswordDigest};

/// Owner identity profile handed to the processor and the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerProfile {
    pub name: String,
    pub email: EmailAddress,
}

/// Bank funding-source details handed to the processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankAccount {
    pub routing_number: String,
    pub account_number: String,
    /// `checking` or `savings`; validated upstream.
    pub account_type: String,
}

/// Payment processor failure.
#[derive(Debug, Clone, Error)]
pub enum ProcessorError {
    #[error("processor rejected the call: {0}")]
    Provider(String),

    #[error("processor call timed out")]
    Timeout,
}

impl ProcessorError {
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }
}

/// Identity directory failure.
#[derive(Debug, Clone, Error)]
pub enum DirectoryError {
    #[error("an account already exists for this email")]
    DuplicateAccount,

    #[error("directory rejected the call: {0}")]
    Provider(String),

    #[error("directory call timed out")]
    Timeout,
}

impl DirectoryError {
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }
}

/// Notification dispatch failure. Always swallowed by callers.
#[derive(Debug, Clone, Error)]
#[error("notification dispatch failed: {0}")]
pub struct NotifyError(pub String);

/// Notification templates this pipeline sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Welcome,
    PaymentConfirmed,
}

/// The external payment processor.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn create_customer(&self, owner: &OwnerProfile) -> Result<CustomerRef, ProcessorError>;

    async fn attach_bank_account(
        &self,
        customer: &CustomerRef,
        bank: &BankAccount,
    ) -> Result<FundingSourceRef, ProcessorError>;

    /// Fire-and-forget; callers treat failure as non-fatal.
    async fn initiate_verification(&self, funding_source: &FundingSourceRef) -> Result<(), ProcessorError>;
}

/// The identity/directory store.
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    async fn create_account(
        &self,
        email: &EmailAddress,
        password_digest: &PasswordDigest,
        profile: &OwnerProfile,
    ) -> Result<AccountId, DirectoryError>;

    /// Compensation only: undo a `create_account` whose saga aborted.
    async fn delete_account(&self, account_id: AccountId) -> Result<(), DirectoryError>;

    /// One-time session artifact for the freshly created owner.
    async fn issue_login_token(&self, email: &EmailAddress) -> Result<String, DirectoryError>;
}

/// Best-effort notification dispatch.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(
        &self,
        email: &EmailAddress,
        kind: NotificationKind,
        variables: &JsonValue,
    ) -> Result<(), NotifyError>;
}

// ---------------------------------------------------------------------------
// In-memory implementations
// ---------------------------------------------------------------------------

/// Which processor step should fail (failure injection for tests).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessorFailure {
    #[default]
    None,
    CreateCustomer,
    AttachBankAccount,
    InitiateVerification,
}

/// In-memory payment processor: generates `cus_…`/`fs_…` references.
#[derive(Default)]
pub struct InMemoryProcessor {
    counter: AtomicU64,
    failure: RwLock<ProcessorFailure>,
}

impl InMemoryProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_at(&self, step: ProcessorFailure) {
        if let Ok(mut f) = self.failure.write() {
            *f = step;
        }
    }

    fn failure(&self) -> ProcessorFailure {
        self.failure.read().map(|f| *f).unwrap_or_default()
    }

    fn next_ref(&self, prefix: &str) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{prefix}_{n:08}")
    }
}

#[async_trait]
impl PaymentProcessor for InMemoryProcessor {
    async fn create_customer(&self, _owner: &OwnerProfile) -> Result<CustomerRef, ProcessorError> {
        if self.failure() == ProcessorFailure::CreateCustomer {
            return Err(ProcessorError::provider("simulated create_customer failure"));
        }
        CustomerRef::new(self.next_ref("cus")).map_err(|e| ProcessorError::provider(e.to_string()))
    }

    async fn attach_bank_account(
        &self,
        _customer: &CustomerRef,
        _bank: &BankAccount,
    ) -> Result<FundingSourceRef, ProcessorError> {
        if self.failure() == ProcessorFailure::AttachBankAccount {
            return Err(ProcessorError::provider("simulated attach_bank_account failure"));
        }
        FundingSourceRef::new(self.next_ref("fs")).map_err(|e| ProcessorError::provider(e.to_string()))
    }

    async fn initiate_verification(&self, _funding_source: &FundingSourceRef) -> Result<(), ProcessorError> {
        if self.failure() == ProcessorFailure::InitiateVerification {
            return Err(ProcessorError::provider("simulated initiate_verification failure"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoginClaims {
    sub: String,
    exp: i64,
    /// Single-use marker handled by the session frontend.
    otp: bool,
}

/// In-memory identity directory: account map plus HS256 login tokens.
pub struct InMemoryDirectory {
    accounts: RwLock<HashMap<EmailAddress, AccountId>>,
    token_secret: Vec<u8>,
    fail_create: RwLock<bool>,
    fail_tokens: RwLock<bool>,
}

impl InMemoryDirectory {
    pub fn new(token_secret: impl Into<Vec<u8>>) -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            token_secret: token_secret.into(),
            fail_create: RwLock::new(false),
            fail_tokens: RwLock::new(false),
        }
    }

    pub fn fail_create_account(&self, fail: bool) {
        if let Ok(mut f) = self.fail_create.write() {
            *f = fail;
        }
    }

    pub fn fail_token_issuance(&self, fail: bool) {
        if let Ok(mut f) = self.fail_tokens.write() {
            *f = fail;
        }
    }

    /// Test visibility: is there an account for this email right now?
    pub fn has_account(&self, email: &EmailAddress) -> bool {
        self.accounts.read().map(|a| a.contains_key(email)).unwrap_or(false)
    }
}

#[async_trait]
impl IdentityDirectory for InMemoryDirectory {
    async fn create_account(
        &self,
        email: &EmailAddress,
        _password_digest: &PasswordDigest,
        _profile: &OwnerProfile,
    ) -> Result<AccountId, DirectoryError> {
        if self.fail_create.read().map(|f| *f).unwrap_or(false) {
            return Err(DirectoryError::provider("simulated create_account failure"));
        }

        let mut accounts = self
            .accounts
            .write()
            .map_err(|_| DirectoryError::provider("lock poisoned"))?;
        if accounts.contains_key(email) {
            return Err(DirectoryError::DuplicateAccount);
        }
        let id = AccountId::new();
        accounts.insert(email.clone(), id);
        Ok(id)
    }

    async fn delete_account(&self, account_id: AccountId) -> Result<(), DirectoryError> {
        let mut accounts = self
            .accounts
            .write()
            .map_err(|_| DirectoryError::provider("lock poisoned"))?;
        accounts.retain(|_, id| *id != account_id);
        Ok(())
    }

    async fn issue_login_token(&self, email: &EmailAddress) -> Result<String, DirectoryError> {
        if self.fail_tokens.read().map(|f| *f).unwrap_or(false) {
            return Err(DirectoryError::provider("simulated token issuance failure"));
        }

        let claims = LoginClaims {
            sub: email.to_string(),
            exp: (Utc::now() + chrono::Duration::minutes(15)).timestamp(),
            otp: true,
        };
        jsonwebtoken::encode(
            &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS256),
            &claims,
            &jsonwebtoken::EncodingKey::from_secret(&self.token_secret),
        )
        .map_err(|e| DirectoryError::provider(e.to_string()))
    }
}

/// One captured notification.
#[derive(Debug, Clone)]
pub struct SentNotification {
    pub email: EmailAddress,
    pub kind: NotificationKind,
    pub variables: JsonValue,
}

/// Notifier that records every send; optionally fails.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentNotification>>,
    fail: RwLock<bool>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_sends(&self, fail: bool) {
        if let Ok(mut f) = self.fail.write() {
            *f = fail;
        }
    }

    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(
        &self,
        email: &EmailAddress,
        kind: NotificationKind,
        variables: &JsonValue,
    ) -> Result<(), NotifyError> {
        if self.fail.read().map(|f| *f).unwrap_or(false) {
            return Err(NotifyError("simulated notification failure".to_string()));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(SentNotification {
                email: email.clone(),
                kind,
                variables: variables.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> OwnerProfile {
        OwnerProfile {
            name: "Ada Lovelace".to_string(),
            email: EmailAddress::parse("owner@acme.test").unwrap(),
        }
    }

    #[tokio::test]
    async fn processor_generates_distinct_references() {
        let processor = InMemoryProcessor::new();
        let c1 = processor.create_customer(&profile()).await.unwrap();
        let c2 = processor.create_customer(&profile()).await.unwrap();
        assert_ne!(c1, c2);
        assert!(c1.as_str().starts_with("cus_"));
    }

    #[tokio::test]
    async fn directory_rejects_duplicate_emails_and_compensates_deletes() {
        let directory = InMemoryDirectory::new(b"test-secret".to_vec());
        let email = EmailAddress::parse("owner@acme.test").unwrap();
        let digest = PasswordDigest::from_plaintext("pw-123456");

        let id = directory.create_account(&email, &digest, &profile()).await.unwrap();
        let err = directory.create_account(&email, &digest, &profile()).await.unwrap_err();
        assert!(matches!(err, DirectoryError::DuplicateAccount));

        directory.delete_account(id).await.unwrap();
        assert!(!directory.has_account(&email));
    }

    #[tokio::test]
    async fn login_tokens_decode_with_the_issuing_secret() {
        let directory = InMemoryDirectory::new(b"test-secret".to_vec());
        let email = EmailAddress::parse("owner@acme.test").unwrap();
        let token = directory.issue_login_token(&email).await.unwrap();

        let decoded = jsonwebtoken::decode::<LoginClaims>(
            &token,
            &jsonwebtoken::DecodingKey::from_secret(b"test-secret"),
            &jsonwebtoken::Validation::new(jsonwebtoken::Algorithm::HS256),
        )
        .unwrap();
        assert_eq!(decoded.claims.sub, "owner@acme.test");
        assert!(decoded.claims.otp);
    }

    #[tokio::test]
    async fn recording_notifier_captures_sends() {
        let notifier = RecordingNotifier::new();
        let email = EmailAddress::parse("owner@acme.test").unwrap();
        notifier
            .send(&email, NotificationKind::Welcome, &serde_json::json!({"plan": "standard"}))
            .await
            .unwrap();

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind, NotificationKind::Welcome);
    }
}
