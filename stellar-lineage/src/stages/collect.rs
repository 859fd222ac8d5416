//! Horizon dataset collection: account snapshot, operations, effects.

use async_trait::async_trait;

use super::LineageStage;
use crate::context::StageContext;
use crate::core::{LineageRecord, LineageStatus, RecordPatch, NO_CREATOR, NO_HOME_DOMAIN};
use crate::documents::{
    DocumentMetadata, DocumentStore, HORIZON_ACCOUNTS, HORIZON_EFFECTS, HORIZON_OPERATIONS,
};
use crate::errors::{LineageError, Result};
use crate::utils::document_id_from_href;

/// The three collection stages share one upstream rate limit.
const COLLECTING: &[LineageStatus] = &[
    LineageStatus::InProgressCollectingAccounts,
    LineageStatus::InProgressCollectingOperations,
    LineageStatus::InProgressCollectingEffects,
];

/// Which Horizon response a collection stage fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizonDataset {
    /// `GET /accounts/{id}`
    Accounts,
    /// `GET /accounts/{id}/operations`
    Operations,
    /// `GET /accounts/{id}/effects`
    Effects,
}

/// Fetches one Horizon dataset and stores it as a document.
#[derive(Debug, Clone, Copy)]
pub struct HorizonCollectStage {
    dataset: HorizonDataset,
}

impl HorizonCollectStage {
    /// Creates the stage for `dataset`.
    #[must_use]
    pub const fn new(dataset: HorizonDataset) -> Self {
        Self { dataset }
    }

    const fn collection(&self) -> &'static str {
        match self.dataset {
            HorizonDataset::Accounts => HORIZON_ACCOUNTS,
            HorizonDataset::Operations => HORIZON_OPERATIONS,
            HorizonDataset::Effects => HORIZON_EFFECTS,
        }
    }

    fn existing_href<'a>(&self, record: &'a LineageRecord) -> Option<&'a str> {
        match self.dataset {
            HorizonDataset::Accounts => record.accounts_doc_href.as_deref(),
            HorizonDataset::Operations => record.operations_doc_href.as_deref(),
            HorizonDataset::Effects => record.effects_doc_href.as_deref(),
        }
    }
}

#[async_trait]
impl LineageStage for HorizonCollectStage {
    fn name(&self) -> &'static str {
        match self.dataset {
            HorizonDataset::Accounts => "collect_horizon_accounts",
            HorizonDataset::Operations => "collect_horizon_operations",
            HorizonDataset::Effects => "collect_horizon_effects",
        }
    }

    fn entry(&self) -> &'static [LineageStatus] {
        match self.dataset {
            HorizonDataset::Accounts => &[
                LineageStatus::PendingHorizonApiDatasets,
                LineageStatus::ReInquiry,
            ],
            HorizonDataset::Operations => &[LineageStatus::DoneCollectingAccounts],
            HorizonDataset::Effects => &[LineageStatus::DoneCollectingOperations],
        }
    }

    fn in_progress(&self) -> LineageStatus {
        match self.dataset {
            HorizonDataset::Accounts => LineageStatus::InProgressCollectingAccounts,
            HorizonDataset::Operations => LineageStatus::InProgressCollectingOperations,
            HorizonDataset::Effects => LineageStatus::InProgressCollectingEffects,
        }
    }

    fn done(&self) -> LineageStatus {
        match self.dataset {
            HorizonDataset::Accounts => LineageStatus::DoneCollectingAccounts,
            HorizonDataset::Operations => LineageStatus::DoneCollectingOperations,
            HorizonDataset::Effects => LineageStatus::DoneHorizonApiDatasets,
        }
    }

    fn single_flight(&self) -> Vec<LineageStatus> {
        COLLECTING.to_vec()
    }

    async fn execute(&self, ctx: &StageContext, record: &LineageRecord) -> Result<RecordPatch> {
        let network = ctx.network(&record.network)?;
        let account = record.account.as_str();
        let horizon = ctx.horizon();

        let (operation, url) = match self.dataset {
            HorizonDataset::Accounts => ("horizon.account", network.account_url(account)),
            HorizonDataset::Operations => ("horizon.operations", network.operations_url(account)),
            HorizonDataset::Effects => ("horizon.effects", network.effects_url(account)),
        };

        let policy = ctx.upstream_policy(self.name());
        let fetched = policy
            .call(operation, || async move {
                match self.dataset {
                    HorizonDataset::Accounts => horizon.account(network, account).await,
                    HorizonDataset::Operations => horizon.operations(network, account).await,
                    HorizonDataset::Effects => horizon.effects(network, account).await,
                }
            })
            .await;
        let payload = match fetched {
            Err(LineageError::Upstream(err))
                if err.is_not_found() && self.dataset == HorizonDataset::Accounts =>
            {
                tracing::info!(
                    stage = self.name(),
                    account,
                    network = %record.network,
                    "Account not on the ledger, ending its chain"
                );
                return Ok(unfunded_patch());
            }
            other => other?,
        };

        // Reuse the previous document id so a re-inquiry replaces it.
        let reuse_id = self.existing_href(record).and_then(document_id_from_href);
        let stored = ctx
            .documents_for(self.name())
            .put(
                self.collection(),
                reuse_id.as_deref(),
                &DocumentMetadata::new(account, &record.network, url),
                &payload,
            )
            .await?;

        tracing::debug!(
            stage = self.name(),
            account,
            href = %stored.href,
            "Stored Horizon dataset"
        );

        let mut patch = RecordPatch::new();
        match self.dataset {
            HorizonDataset::Accounts => patch.accounts_doc_href = Some(stored.href),
            HorizonDataset::Operations => patch.operations_doc_href = Some(stored.href),
            HorizonDataset::Effects => patch.effects_doc_href = Some(stored.href),
        }
        Ok(patch)
    }
}

/// An unfunded account has no snapshot, operations or creator to collect.
/// Its record ends with sentinel data so the rest of the fleet keeps moving.
fn unfunded_patch() -> RecordPatch {
    RecordPatch::new()
        .with_creator(NO_CREATOR)
        .with_home_domain(NO_HOME_DOMAIN)
        .with_native_balance(0.0)
        .with_final_status(LineageStatus::DoneUpdatingDirectory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::InMemoryDocumentStore;
    use crate::ledger::InMemoryStatusLedger;
    use crate::testing::{fixtures, StaticDirectoryApi, TestHarness};
    use crate::upstream::MockHorizonApi;
    use crate::utils::Clock;
    use std::sync::Arc;

    const GA: &str = "GAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

    #[tokio::test]
    async fn test_operations_stage_calls_horizon_for_record_network() {
        let mut horizon = MockHorizonApi::new();
        horizon
            .expect_operations()
            .withf(|network, account| network.name == "testnet" && account == GA)
            .times(1)
            .returning(|_, _| Ok(fixtures::operations_json(vec![])));
        horizon.expect_account().never();

        let documents = InMemoryDocumentStore::new();
        let ctx = StageContext::builder()
            .ledger(Arc::new(InMemoryStatusLedger::new()))
            .documents(Arc::new(documents.clone()))
            .horizon(Arc::new(horizon))
            .directory(Arc::new(StaticDirectoryApi::new()))
            .build()
            .unwrap();
        let record = LineageRecord::new(
            GA,
            "testnet",
            LineageStatus::InProgressCollectingOperations,
            ctx.clock().now(),
        );

        let patch = HorizonCollectStage::new(HorizonDataset::Operations)
            .execute(&ctx, &record)
            .await
            .unwrap();

        let href = patch.operations_doc_href.unwrap();
        assert!(href.starts_with("memory://horizon_operations/"));
        assert!(patch.accounts_doc_href.is_none());
        let stored = documents.get(&href).await.unwrap();
        assert_eq!(stored.metadata.network, "testnet");
        assert!(stored.metadata.external_url.ends_with("/operations"));
    }

    #[tokio::test]
    async fn test_recollection_reuses_document_id() {
        let harness = TestHarness::new();
        harness
            .horizon
            .insert_account(GA, fixtures::account_json(GA, None, "5.0"));
        let stage = HorizonCollectStage::new(HorizonDataset::Accounts);
        let mut record = harness.add_pending(GA).await.unwrap();

        let first = stage.execute(&harness.ctx, &record).await.unwrap();
        record.accounts_doc_href = first.accounts_doc_href.clone();
        harness
            .horizon
            .insert_account(GA, fixtures::account_json(GA, None, "9.0"));
        let second = stage.execute(&harness.ctx, &record).await.unwrap();

        assert_eq!(first.accounts_doc_href, second.accounts_doc_href);
        assert_eq!(harness.documents.count(HORIZON_ACCOUNTS), 1);
        let stored = harness
            .documents
            .get(&second.accounts_doc_href.unwrap())
            .await
            .unwrap();
        assert_eq!(stored.raw_data["balances"][0]["balance"], "9.0");
    }

    #[test]
    fn test_collection_stages_share_single_flight() {
        for dataset in [
            HorizonDataset::Accounts,
            HorizonDataset::Operations,
            HorizonDataset::Effects,
        ] {
            assert_eq!(HorizonCollectStage::new(dataset).single_flight().len(), 3);
        }
    }
}
