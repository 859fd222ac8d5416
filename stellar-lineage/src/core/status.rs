//! Lineage and health status enums.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::LineageError;

/// Where a lineage record sits in the acquisition pipeline.
///
/// Each stage owns one `IN_PROGRESS_*` value and writes one `DONE_*` value,
/// which is the entry status of the next stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineageStatus {
    /// Freshly discovered, waiting for the Horizon datasets.
    PendingHorizonApiDatasets,
    /// A user asked to refresh an already crawled account.
    ReInquiry,
    /// Fetching the account snapshot.
    InProgressCollectingAccounts,
    /// Account snapshot stored.
    DoneCollectingAccounts,
    /// Fetching the operations page.
    InProgressCollectingOperations,
    /// Operations page stored.
    DoneCollectingOperations,
    /// Fetching the effects page.
    InProgressCollectingEffects,
    /// All three Horizon documents stored.
    DoneHorizonApiDatasets,
    /// Parsing balance and home domain from the snapshot.
    InProgressUpdatingFromRawData,
    /// Balance and home domain written.
    DoneUpdatingFromRawData,
    /// Parsing the `create_account` operation.
    InProgressCollectingCreator,
    /// Creator account (or sentinel) written.
    DoneCollectingCreator,
    /// Ensuring the creator has its own lineage record.
    InProgressMakeGrandparent,
    /// Creator record exists; the main chain is complete for this account.
    DoneMakeGrandparentLineage,
    /// Parsing assets and flags from the snapshot.
    InProgressUpdatingAssetsAndFlags,
    /// Assets and flags written.
    DoneUpdatingAssetsAndFlags,
    /// Fetching directory enrichment.
    InProgressUpdatingDirectory,
    /// Directory enrichment written.
    DoneUpdatingDirectory,
}

impl LineageStatus {
    /// Every status in pipeline order.
    pub const ALL: [Self; 18] = [
        Self::PendingHorizonApiDatasets,
        Self::ReInquiry,
        Self::InProgressCollectingAccounts,
        Self::DoneCollectingAccounts,
        Self::InProgressCollectingOperations,
        Self::DoneCollectingOperations,
        Self::InProgressCollectingEffects,
        Self::DoneHorizonApiDatasets,
        Self::InProgressUpdatingFromRawData,
        Self::DoneUpdatingFromRawData,
        Self::InProgressCollectingCreator,
        Self::DoneCollectingCreator,
        Self::InProgressMakeGrandparent,
        Self::DoneMakeGrandparentLineage,
        Self::InProgressUpdatingAssetsAndFlags,
        Self::DoneUpdatingAssetsAndFlags,
        Self::InProgressUpdatingDirectory,
        Self::DoneUpdatingDirectory,
    ];

    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PendingHorizonApiDatasets => "PENDING_HORIZON_API_DATASETS",
            Self::ReInquiry => "RE_INQUIRY",
            Self::InProgressCollectingAccounts => "IN_PROGRESS_COLLECTING_ACCOUNTS",
            Self::DoneCollectingAccounts => "DONE_COLLECTING_ACCOUNTS",
            Self::InProgressCollectingOperations => "IN_PROGRESS_COLLECTING_OPERATIONS",
            Self::DoneCollectingOperations => "DONE_COLLECTING_OPERATIONS",
            Self::InProgressCollectingEffects => "IN_PROGRESS_COLLECTING_EFFECTS",
            Self::DoneHorizonApiDatasets => "DONE_HORIZON_API_DATASETS",
            Self::InProgressUpdatingFromRawData => "IN_PROGRESS_UPDATING_FROM_RAW_DATA",
            Self::DoneUpdatingFromRawData => "DONE_UPDATING_FROM_RAW_DATA",
            Self::InProgressCollectingCreator => "IN_PROGRESS_COLLECTING_CREATOR",
            Self::DoneCollectingCreator => "DONE_COLLECTING_CREATOR",
            Self::InProgressMakeGrandparent => "IN_PROGRESS_MAKE_GRANDPARENT",
            Self::DoneMakeGrandparentLineage => "DONE_MAKE_GRANDPARENT_LINEAGE",
            Self::InProgressUpdatingAssetsAndFlags => "IN_PROGRESS_UPDATING_ASSETS_AND_FLAGS",
            Self::DoneUpdatingAssetsAndFlags => "DONE_UPDATING_ASSETS_AND_FLAGS",
            Self::InProgressUpdatingDirectory => "IN_PROGRESS_UPDATING_DIRECTORY",
            Self::DoneUpdatingDirectory => "DONE_UPDATING_DIRECTORY",
        }
    }

    /// Returns true if a stage has claimed the record and not yet released it.
    #[must_use]
    pub const fn is_in_progress(&self) -> bool {
        matches!(
            self,
            Self::InProgressCollectingAccounts
                | Self::InProgressCollectingOperations
                | Self::InProgressCollectingEffects
                | Self::InProgressUpdatingFromRawData
                | Self::InProgressCollectingCreator
                | Self::InProgressMakeGrandparent
                | Self::InProgressUpdatingAssetsAndFlags
                | Self::InProgressUpdatingDirectory
        )
    }

    /// Returns true once the creator record has been made.
    ///
    /// Enrichment statuses count as complete; they only decorate the record.
    #[must_use]
    pub const fn is_pipeline_complete(&self) -> bool {
        matches!(
            self,
            Self::DoneMakeGrandparentLineage
                | Self::InProgressUpdatingAssetsAndFlags
                | Self::DoneUpdatingAssetsAndFlags
                | Self::InProgressUpdatingDirectory
                | Self::DoneUpdatingDirectory
        )
    }
}

impl fmt::Display for LineageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LineageStatus {
    type Err = LineageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|status| status.as_str() == s)
            .copied()
            .ok_or_else(|| LineageError::UnknownStatus(s.to_string()))
    }
}

/// Reason tag recorded when the blockchain or directory API keeps failing.
pub const RATE_LIMITED_BY_EXTERNAL_API_SERVER: &str = "RATE_LIMITED_BY_EXTERNAL_API_SERVER";

/// Reason tag recorded when the document store keeps failing.
pub const RATE_LIMITED_BY_DOCUMENT_STORE: &str = "RATE_LIMITED_BY_DOCUMENT_STORE";

const HEALTHY: &str = "HEALTHY";
const UNHEALTHY_PREFIX: &str = "UNHEALTHY_";

/// Health of one scheduled stage ("cron").
///
/// Serialized as `HEALTHY` or `UNHEALTHY_<tag>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum HealthStatus {
    /// The stage may run.
    Healthy,
    /// The stage is suspended; the payload is the reason tag without prefix.
    Unhealthy(String),
}

impl HealthStatus {
    /// Creates an unhealthy status from a reason tag.
    #[must_use]
    pub fn unhealthy(tag: impl Into<String>) -> Self {
        Self::Unhealthy(tag.into())
    }

    /// Returns true for [`HealthStatus::Healthy`].
    #[must_use]
    pub const fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// Returns the reason tag of an unhealthy status.
    #[must_use]
    pub fn reason_tag(&self) -> Option<&str> {
        match self {
            Self::Healthy => None,
            Self::Unhealthy(tag) => Some(tag),
        }
    }
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self::Healthy
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => f.write_str(HEALTHY),
            Self::Unhealthy(tag) => write!(f, "{UNHEALTHY_PREFIX}{tag}"),
        }
    }
}

impl FromStr for HealthStatus {
    type Err = LineageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == HEALTHY {
            return Ok(Self::Healthy);
        }
        match s.strip_prefix(UNHEALTHY_PREFIX) {
            Some(tag) if !tag.is_empty() => Ok(Self::Unhealthy(tag.to_string())),
            _ => Err(LineageError::UnknownStatus(s.to_string())),
        }
    }
}

impl From<HealthStatus> for String {
    fn from(status: HealthStatus) -> Self {
        status.to_string()
    }
}

impl TryFrom<String> for HealthStatus {
    type Error = LineageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
