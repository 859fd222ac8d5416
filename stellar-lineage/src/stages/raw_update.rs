//! Balance and home domain from the stored account snapshot.

use async_trait::async_trait;

use super::{require_href, LineageStage};
use crate::context::StageContext;
use crate::core::{LineageRecord, LineageStatus, RecordPatch};
use crate::documents::DocumentStore;
use crate::errors::Result;
use crate::upstream::parse;

/// Copies native balance and home domain onto the record.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateFromRawDataStage;

#[async_trait]
impl LineageStage for UpdateFromRawDataStage {
    fn name(&self) -> &'static str {
        "update_from_accounts_raw_data"
    }

    fn entry(&self) -> &'static [LineageStatus] {
        &[LineageStatus::DoneHorizonApiDatasets]
    }

    fn in_progress(&self) -> LineageStatus {
        LineageStatus::InProgressUpdatingFromRawData
    }

    fn done(&self) -> LineageStatus {
        LineageStatus::DoneUpdatingFromRawData
    }

    async fn execute(&self, ctx: &StageContext, record: &LineageRecord) -> Result<RecordPatch> {
        let href = require_href(record.accounts_doc_href.as_deref(), "account snapshot", record)?;
        let snapshot = ctx.documents_for(self.name()).get(href).await?;

        Ok(RecordPatch::new()
            .with_native_balance(parse::native_balance(&snapshot.raw_data))
            .with_home_domain(parse::home_domain(&snapshot.raw_data)))
    }
}
