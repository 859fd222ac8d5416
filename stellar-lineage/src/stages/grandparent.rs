//! Ensures the creator account has its own lineage record.

use async_trait::async_trait;
use serde_json::json;

use super::LineageStage;
use crate::context::StageContext;
use crate::core::{LineageRecord, LineageStatus, RecordPatch};
use crate::errors::Result;
use crate::events;

/// Queues the creator for crawling.
///
/// A missing creator record is created at the pending status. An existing
/// one is re-armed only when its pipeline has finished, nothing holds it,
/// and it is older than the configured refresh age. Records still moving
/// through the pipeline keep their progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeGrandparentStage;

#[async_trait]
impl LineageStage for MakeGrandparentStage {
    fn name(&self) -> &'static str {
        "make_grandparent_lineage"
    }

    fn entry(&self) -> &'static [LineageStatus] {
        &[LineageStatus::DoneCollectingCreator]
    }

    fn in_progress(&self) -> LineageStatus {
        LineageStatus::InProgressMakeGrandparent
    }

    fn done(&self) -> LineageStatus {
        LineageStatus::DoneMakeGrandparentLineage
    }

    async fn execute(&self, ctx: &StageContext, record: &LineageRecord) -> Result<RecordPatch> {
        let Some(creator) = record.creator() else {
            tracing::debug!(account = %record.account, "Chain ends here, no creator");
            return Ok(RecordPatch::new());
        };

        let ledger = ctx.ledger();
        let now = ctx.clock().now();

        let Some(existing) = ledger.find_one(creator, &record.network).await? else {
            let created = ledger
                .create(LineageRecord::new(
                    creator,
                    &record.network,
                    LineageStatus::PendingHorizonApiDatasets,
                    now,
                ))
                .await?;
            tracing::info!(
                account = %record.account,
                creator,
                record_id = %created.id,
                "Queued creator account"
            );
            ctx.emit(
                events::STAGE_ADVANCED,
                json!({
                    "stage": self.name(),
                    "record_id": created.id,
                    "account": creator,
                    "network": record.network,
                    "status": created.status,
                }),
            )
            .await;
            return Ok(RecordPatch::new());
        };

        let finished =
            existing.status.is_pipeline_complete() && !existing.status.is_in_progress();
        let stale = now - existing.updated_at >= ctx.config().grandparent_refresh();
        if !finished || !stale {
            tracing::debug!(
                creator,
                status = %existing.status,
                "Creator record already present"
            );
            return Ok(RecordPatch::new());
        }

        let rearmed = ledger
            .claim(
                existing.id,
                existing.status,
                LineageStatus::PendingHorizonApiDatasets,
            )
            .await?;
        if rearmed {
            tracing::info!(creator, record_id = %existing.id, "Re-armed stale creator record");
        }
        Ok(RecordPatch::new())
    }
}
