//! Pipeline stages.
//!
//! Each stage owns one slice of the status space: an entry set, one
//! in-progress status and one done status. Stages only compute the fields to
//! write; claiming, advancing and reporting belong to
//! [`crate::pipeline::StageDriver`].

mod collect;
mod creator;
mod enrich;
mod grandparent;
mod raw_update;

pub use collect::{HorizonCollectStage, HorizonDataset};
pub use creator::CollectCreatorStage;
pub use enrich::{AssetsAndFlagsStage, DirectoryStage};
pub use grandparent::MakeGrandparentStage;
pub use raw_update::UpdateFromRawDataStage;

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

use crate::context::StageContext;
use crate::core::{LineageRecord, LineageStatus, RecordPatch};
use crate::errors::{LineageError, Result};

/// One step of the acquisition pipeline.
#[async_trait]
pub trait LineageStage: Send + Sync + Debug {
    /// Cron name, used for health rows and logs.
    fn name(&self) -> &'static str;

    /// Statuses this stage picks up.
    fn entry(&self) -> &'static [LineageStatus];

    /// Status written when a record is claimed.
    fn in_progress(&self) -> LineageStatus;

    /// Status written when the stage succeeds.
    fn done(&self) -> LineageStatus;

    /// Statuses that make this stage wait. Any record at one of these blocks
    /// new claims fleet-wide.
    fn single_flight(&self) -> Vec<LineageStatus> {
        vec![self.in_progress()]
    }

    /// Does the stage's work for a claimed record and returns the fields to
    /// merge.
    async fn execute(&self, ctx: &StageContext, record: &LineageRecord) -> Result<RecordPatch>;
}

/// The six stages that walk a record from pending to its creator record.
#[must_use]
pub fn main_stages() -> Vec<Arc<dyn LineageStage>> {
    vec![
        Arc::new(HorizonCollectStage::new(HorizonDataset::Accounts)),
        Arc::new(HorizonCollectStage::new(HorizonDataset::Operations)),
        Arc::new(HorizonCollectStage::new(HorizonDataset::Effects)),
        Arc::new(UpdateFromRawDataStage),
        Arc::new(CollectCreatorStage),
        Arc::new(MakeGrandparentStage),
    ]
}

/// The two enrichment stages that run after the main chain.
#[must_use]
pub fn enrichment_stages() -> Vec<Arc<dyn LineageStage>> {
    vec![Arc::new(AssetsAndFlagsStage), Arc::new(DirectoryStage)]
}

/// Every stage in pipeline order.
#[must_use]
pub fn all_stages() -> Vec<Arc<dyn LineageStage>> {
    let mut stages = main_stages();
    stages.extend(enrichment_stages());
    stages
}

/// Returns the href or a not-found error naming the missing document.
pub(crate) fn require_href<'a>(
    href: Option<&'a str>,
    what: &str,
    record: &LineageRecord,
) -> Result<&'a str> {
    href.ok_or_else(|| {
        LineageError::NotFound(format!(
            "{what} document for {} on {}",
            record.account, record.network
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_stages_chain_done_into_next_entry() {
        let stages = all_stages();
        for pair in stages.windows(2) {
            assert!(
                pair[1].entry().contains(&pair[0].done()),
                "{} does not pick up {}",
                pair[1].name(),
                pair[0].done()
            );
        }
    }

    #[test]
    fn test_stage_names_unique() {
        let names: HashSet<_> = all_stages().iter().map(|s| s.name()).collect();
        assert_eq!(names.len(), 8);
    }

    #[test]
    fn test_in_progress_statuses_are_disjoint() {
        let statuses: HashSet<_> = all_stages().iter().map(|s| s.in_progress()).collect();
        assert_eq!(statuses.len(), 8);
        assert!(statuses.iter().all(LineageStatus::is_in_progress));
    }

    #[test]
    fn test_first_stage_accepts_re_inquiry() {
        let first = &main_stages()[0];
        assert!(first.entry().contains(&LineageStatus::PendingHorizonApiDatasets));
        assert!(first.entry().contains(&LineageStatus::ReInquiry));
    }
}
