//! Search submissions: queue an account for crawling.

use serde::Serialize;
use std::sync::Arc;

use crate::context::StageContext;
use crate::core::{LineageRecord, LineageStatus};
use crate::errors::{LineageError, Result};
use crate::ledger::StatusLedger;
use crate::utils::{validate_account_address, Clock};

/// Result of [`InquiryService::submit`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InquiryOutcome {
    /// The record after submission.
    pub record: LineageRecord,
    /// True if the submission created the record.
    pub created: bool,
}

/// Accepts account searches.
///
/// A new account is queued at the pending status. An account whose pipeline
/// already finished is reset to [`LineageStatus::ReInquiry`] so the first
/// stage collects it again. An account still moving through the pipeline,
/// or claimed by an enrichment stage, is left alone.
#[derive(Clone)]
pub struct InquiryService {
    ledger: Arc<dyn StatusLedger>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for InquiryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InquiryService")
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl InquiryService {
    /// Creates a service over `ledger`.
    #[must_use]
    pub fn new(ledger: Arc<dyn StatusLedger>, clock: Arc<dyn Clock>) -> Self {
        Self { ledger, clock }
    }

    /// Creates a service sharing a stage context's ledger and clock.
    #[must_use]
    pub fn from_context(ctx: &StageContext) -> Self {
        Self::new(ctx.ledger().clone(), ctx.clock().clone())
    }

    /// Submits `account` on `network`.
    pub async fn submit(&self, account: &str, network: &str) -> Result<InquiryOutcome> {
        validate_account_address(account)?;

        let Some(existing) = self.ledger.find_one(account, network).await? else {
            let record = self
                .ledger
                .create(LineageRecord::new(
                    account,
                    network,
                    LineageStatus::PendingHorizonApiDatasets,
                    self.clock.now(),
                ))
                .await?;
            tracing::info!(account, network, record_id = %record.id, "Queued new inquiry");
            return Ok(InquiryOutcome {
                record,
                created: true,
            });
        };

        if !existing.status.is_pipeline_complete() || existing.status.is_in_progress() {
            tracing::debug!(
                account,
                network,
                status = %existing.status,
                "Inquiry already in the pipeline"
            );
            return Ok(InquiryOutcome {
                record: existing,
                created: false,
            });
        }

        let reset = self
            .ledger
            .claim(existing.id, existing.status, LineageStatus::ReInquiry)
            .await?;
        if reset {
            tracing::info!(account, network, from = %existing.status, "Re-inquiry queued");
        }

        let record = self
            .ledger
            .find_by_id(existing.id)
            .await?
            .ok_or_else(|| LineageError::account_not_found(account, network))?;
        Ok(InquiryOutcome {
            record,
            created: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestHarness;
    use tokio_test::{assert_err, assert_ok};

    const GA: &str = "GAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

    #[tokio::test]
    async fn test_new_account_is_queued() {
        let harness = TestHarness::new();
        let service = InquiryService::from_context(&harness.ctx);

        let outcome = assert_ok!(service.submit(GA, "public").await);

        assert!(outcome.created);
        assert_eq!(outcome.record.status, LineageStatus::PendingHorizonApiDatasets);
        assert_eq!(harness.ledger.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_account_rejected() {
        let harness = TestHarness::new();
        let service = InquiryService::from_context(&harness.ctx);

        let err = assert_err!(service.submit("not-an-account", "public").await);

        assert!(matches!(err, LineageError::InvalidAccount(_)));
        assert!(harness.ledger.is_empty());
    }

    #[tokio::test]
    async fn test_finished_account_is_reset() {
        let harness = TestHarness::new();
        harness
            .add_record(GA, LineageStatus::DoneUpdatingDirectory)
            .await
            .unwrap();
        let service = InquiryService::from_context(&harness.ctx);

        let outcome = assert_ok!(service.submit(GA, "public").await);

        assert!(!outcome.created);
        assert_eq!(outcome.record.status, LineageStatus::ReInquiry);
        assert_eq!(harness.ledger.len(), 1);
    }

    #[tokio::test]
    async fn test_in_flight_account_untouched() {
        let harness = TestHarness::new();
        harness
            .add_record(GA, LineageStatus::InProgressCollectingCreator)
            .await
            .unwrap();
        let service = InquiryService::from_context(&harness.ctx);

        let outcome = service.submit(GA, "public").await.unwrap();

        assert_eq!(outcome.record.status, LineageStatus::InProgressCollectingCreator);
    }
}
