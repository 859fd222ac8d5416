//! Core domain model types.
//!
//! This module contains the fundamental types used throughout the crate:
//! - Lineage and health status enums
//! - Lineage records, field patches and health observations
//! - Parsed asset and flag entries

mod record;
mod status;

pub use record::{
    AccountAsset, AccountFlag, CronHealthRecord, LineageRecord, RecordPatch, NO_CREATOR,
    NO_HOME_DOMAIN,
};
pub use status::{
    HealthStatus, LineageStatus, RATE_LIMITED_BY_DOCUMENT_STORE,
    RATE_LIMITED_BY_EXTERNAL_API_SERVER,
};
