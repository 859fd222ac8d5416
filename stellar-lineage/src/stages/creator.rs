//! Creator account from the stored operations page.

use async_trait::async_trait;

use super::{require_href, LineageStage};
use crate::context::StageContext;
use crate::core::{LineageRecord, LineageStatus, RecordPatch, NO_CREATOR};
use crate::documents::DocumentStore;
use crate::errors::Result;
use crate::upstream::parse;

/// Finds the `create_account` operation that funded the record's account.
///
/// Accounts without one (genesis, or created outside the first page) get the
/// creator sentinel, which ends their chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectCreatorStage;

#[async_trait]
impl LineageStage for CollectCreatorStage {
    fn name(&self) -> &'static str {
        "collect_creator_account"
    }

    fn entry(&self) -> &'static [LineageStatus] {
        &[LineageStatus::DoneUpdatingFromRawData]
    }

    fn in_progress(&self) -> LineageStatus {
        LineageStatus::InProgressCollectingCreator
    }

    fn done(&self) -> LineageStatus {
        LineageStatus::DoneCollectingCreator
    }

    async fn execute(&self, ctx: &StageContext, record: &LineageRecord) -> Result<RecordPatch> {
        let href = require_href(record.operations_doc_href.as_deref(), "operations", record)?;
        let operations = ctx.documents_for(self.name()).get(href).await?;

        let Some(info) = parse::creator(&operations.raw_data, &record.account) else {
            tracing::info!(account = %record.account, "No create_account operation found");
            return Ok(RecordPatch::new().with_creator(NO_CREATOR));
        };

        let mut patch = RecordPatch::new().with_creator(info.funder);
        patch.account_created_at = info.created_at;
        Ok(patch)
    }
}
