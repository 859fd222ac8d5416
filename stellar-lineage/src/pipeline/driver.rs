//! Runs one stage against the ledger, one record per invocation.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

use crate::context::StageContext;
use crate::core::LineageStatus;
use crate::errors::Result;
use crate::events;
use crate::observability::execute_span;
use crate::stages::LineageStage;

/// What one driver invocation did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StageOutcome {
    /// A record was claimed and moved to the stage's done status.
    Advanced {
        /// The advanced record.
        record_id: Uuid,
        /// Its account.
        account: String,
        /// The status written.
        status: LineageStatus,
    },
    /// No record was at an entry status.
    Idle,
    /// Another record is already in flight for this stage.
    Busy,
    /// The stage or the fleet is marked unhealthy.
    Unhealthy,
    /// The picked record changed status before it could be claimed.
    LostClaim,
}

impl StageOutcome {
    /// Returns true if a record was advanced.
    #[must_use]
    pub const fn is_advanced(&self) -> bool {
        matches!(self, Self::Advanced { .. })
    }
}

/// Drives one [`LineageStage`].
///
/// Each call to [`StageDriver::run_once`]:
/// 1. skips if the stage or the fleet is unhealthy;
/// 2. skips if any record is at one of the stage's single-flight statuses;
/// 3. claims the oldest record at an entry status;
/// 4. runs the stage and writes the returned fields plus the done status.
///
/// A failure after the claim leaves the record at its in-progress status and
/// is returned to the caller.
#[derive(Clone)]
pub struct StageDriver {
    stage: Arc<dyn LineageStage>,
    ctx: StageContext,
}

impl fmt::Debug for StageDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageDriver")
            .field("stage", &self.stage.name())
            .finish_non_exhaustive()
    }
}

impl StageDriver {
    /// Creates a driver.
    #[must_use]
    pub fn new(stage: Arc<dyn LineageStage>, ctx: StageContext) -> Self {
        Self { stage, ctx }
    }

    /// The stage's cron name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.stage.name()
    }

    /// Advances at most one record by one step.
    pub async fn run_once(&self) -> Result<StageOutcome> {
        let span = tracing::info_span!("stage", stage = self.name());
        self.run_inner().instrument(span).await
    }

    async fn run_inner(&self) -> Result<StageOutcome> {
        let name = self.name();
        let ledger = self.ctx.ledger();

        if !self.ctx.health().is_healthy(name).await? {
            tracing::info!("Stage unhealthy, skipping");
            self.skipped("unhealthy").await;
            return Ok(StageOutcome::Unhealthy);
        }

        let in_flight = ledger
            .find_first_by_status(&self.stage.single_flight())
            .await?;
        if let Some(busy) = in_flight {
            tracing::debug!(
                record_id = %busy.id,
                status = %busy.status,
                "Another record in flight, skipping"
            );
            self.skipped("busy").await;
            return Ok(StageOutcome::Busy);
        }

        let Some(record) = ledger.find_first_by_status(self.stage.entry()).await? else {
            tracing::trace!("Nothing to do");
            return Ok(StageOutcome::Idle);
        };

        let in_progress = self.stage.in_progress();
        if !ledger.claim(record.id, record.status, in_progress).await? {
            tracing::debug!(record_id = %record.id, "Record changed before claim");
            return Ok(StageOutcome::LostClaim);
        }

        tracing::info!(
            record_id = %record.id,
            account = %record.account,
            network = %record.network,
            from = %record.status,
            "Claimed record"
        );
        self.ctx
            .emit(
                events::STAGE_CLAIMED,
                json!({
                    "stage": name,
                    "record_id": record.id,
                    "account": record.account,
                    "network": record.network,
                    "status": in_progress,
                }),
            )
            .await;

        let work = self
            .stage
            .execute(&self.ctx, &record)
            .instrument(execute_span(name, &record.account, &record.network));
        match work.await {
            Ok(patch) => {
                let done = patch.final_status.unwrap_or_else(|| self.stage.done());
                let updated = ledger.advance(record.id, patch, done).await?;
                tracing::info!(
                    record_id = %updated.id,
                    account = %updated.account,
                    status = %done,
                    "Advanced record"
                );
                self.ctx
                    .emit(
                        events::STAGE_ADVANCED,
                        json!({
                            "stage": name,
                            "record_id": updated.id,
                            "account": updated.account,
                            "network": updated.network,
                            "status": done,
                        }),
                    )
                    .await;
                Ok(StageOutcome::Advanced {
                    record_id: updated.id,
                    account: updated.account,
                    status: done,
                })
            }
            Err(err) => {
                tracing::error!(
                    record_id = %record.id,
                    account = %record.account,
                    error = %err,
                    "Stage failed, record left in progress"
                );
                self.ctx
                    .emit(
                        events::STAGE_FAILED,
                        json!({
                            "stage": name,
                            "record_id": record.id,
                            "account": record.account,
                            "network": record.network,
                            "status": in_progress,
                            "error": err.to_string(),
                        }),
                    )
                    .await;
                Err(err)
            }
        }
    }

    async fn skipped(&self, reason: &str) {
        self.ctx
            .emit(
                events::STAGE_SKIPPED,
                json!({"stage": self.name(), "reason": reason}),
            )
            .await;
    }
}
