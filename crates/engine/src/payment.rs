//! Payment account provisioning: customer, funding source, verification.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use gangway_billing::VerificationStatus;
use gangway_core::{CustomerRef, FundingSourceRef};
use gangway_infra::providers::{BankAccount, OwnerProfile, PaymentProcessor, ProcessorError};

/// Outcome of payment provisioning, fed into tenant creation and the
/// persisted payment account.
#[derive(Debug, Clone)]
pub struct ProvisionedBilling {
    pub customer_ref: CustomerRef,
    pub funding_source_ref: FundingSourceRef,
    pub verification: VerificationStatus,
}

/// Fatal payment-provisioning failure. Verification initiation never appears
/// here; its failure is non-fatal.
#[derive(Debug, Error)]
pub enum PaymentProviderError {
    #[error("customer creation failed: {0}")]
    CreateCustomer(#[source] ProcessorError),

    #[error("funding source attachment failed: {0}")]
    AttachBankAccount(#[source] ProcessorError),
}

/// Provisions the processor-side billing relationship.
///
/// No local state is mutated here; the orchestrator persists the resulting
/// payment account. Each outbound call carries the configured timeout; a
/// timeout is that step's ordinary failure.
#[derive(Clone)]
pub struct PaymentProvisioner {
    processor: Arc<dyn PaymentProcessor>,
    call_timeout: Duration,
}

impl PaymentProvisioner {
    pub fn new(processor: Arc<dyn PaymentProcessor>, call_timeout: Duration) -> Self {
        Self {
            processor,
            call_timeout,
        }
    }

    /// Run the three provisioning steps in order.
    ///
    /// Steps (a) create customer and (b) attach bank account are fatal.
    /// Step (c) initiate verification is non-fatal: on failure the call
    /// still succeeds with `verification = pending` and verification is
    /// retried out of band.
    pub async fn provision(
        &self,
        owner: &OwnerProfile,
        bank: &BankAccount,
    ) -> Result<ProvisionedBilling, PaymentProviderError> {
        let customer_ref = self
            .bounded(self.processor.create_customer(owner))
            .await
            .map_err(PaymentProviderError::CreateCustomer)?;

        let funding_source_ref = self
            .bounded(self.processor.attach_bank_account(&customer_ref, bank))
            .await
            .map_err(PaymentProviderError::AttachBankAccount)?;

        let verification = match self
            .bounded(self.processor.initiate_verification(&funding_source_ref))
            .await
        {
            Ok(()) => VerificationStatus::Pending,
            Err(e) => {
                warn!(
                    customer_ref = %customer_ref,
                    error = %e,
                    "verification initiation failed; continuing with pending status"
                );
                VerificationStatus::Pending
            }
        };

        Ok(ProvisionedBilling {
            customer_ref,
            funding_source_ref,
            verification,
        })
    }

    async fn bounded<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T, ProcessorError>>,
    ) -> Result<T, ProcessorError> {
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(ProcessorError::Timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gangway_core::EmailAddress;
    use gangway_infra::providers::{InMemoryProcessor, ProcessorFailure};

    fn test_owner() -> OwnerProfile {
        OwnerProfile {
            name: "Ada Lovelace".to_string(),
            email: EmailAddress::parse("owner@acme.test").unwrap(),
        }
    }

    fn test_bank() -> BankAccount {
        BankAccount {
            routing_number: "021000021".to_string(),
            account_number: "123456789".to_string(),
            account_type: "checking".to_string(),
        }
    }

    fn provisioner(processor: Arc<InMemoryProcessor>) -> PaymentProvisioner {
        PaymentProvisioner::new(processor, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn happy_path_returns_refs_and_pending_verification() {
        let processor = Arc::new(InMemoryProcessor::new());
        let billing = provisioner(processor)
            .provision(&test_owner(), &test_bank())
            .await
            .unwrap();

        assert!(billing.customer_ref.as_str().starts_with("cus_"));
        assert!(billing.funding_source_ref.as_str().starts_with("fs_"));
        assert_eq!(billing.verification, VerificationStatus::Pending);
    }

    #[tokio::test]
    async fn customer_creation_failure_is_fatal() {
        let processor = Arc::new(InMemoryProcessor::new());
        processor.fail_at(ProcessorFailure::CreateCustomer);

        let err = provisioner(processor)
            .provision(&test_owner(), &test_bank())
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentProviderError::CreateCustomer(_)));
    }

    #[tokio::test]
    async fn funding_source_failure_is_fatal() {
        let processor = Arc::new(InMemoryProcessor::new());
        processor.fail_at(ProcessorFailure::AttachBankAccount);

        let err = provisioner(processor)
            .provision(&test_owner(), &test_bank())
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentProviderError::AttachBankAccount(_)));
    }

    #[tokio::test]
    async fn verification_initiation_failure_is_swallowed() {
        let processor = Arc::new(InMemoryProcessor::new());
        processor.fail_at(ProcessorFailure::InitiateVerification);

        let billing = provisioner(processor)
            .provision(&test_owner(), &test_bank())
            .await
            .unwrap();
        assert_eq!(billing.verification, VerificationStatus::Pending);
    }
}
