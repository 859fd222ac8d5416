//! Persisted records: lineage rows and cron health rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::{HealthStatus, LineageStatus};
use crate::errors::Result;

/// Creator sentinel for accounts without a discoverable `create_account` operation.
pub const NO_CREATOR: &str = "no_element_funder";

/// Home domain sentinel for accounts that never set one.
pub const NO_HOME_DOMAIN: &str = "no_element_home_domain";

/// One row per (account, network); the most recently created row is current.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineageRecord {
    /// Unique row id.
    pub id: Uuid,
    /// The account address.
    pub account: String,
    /// The funding account, or [`NO_CREATOR`].
    pub creator_account: String,
    /// Network name ("public" or "testnet").
    pub network: String,
    /// When the account was created on the ledger, once discovered.
    pub account_created_at: Option<DateTime<Utc>>,
    /// Home domain, or [`NO_HOME_DOMAIN`].
    pub home_domain: String,
    /// Native (XLM) balance.
    pub native_balance: f64,
    /// Document href of the raw account snapshot.
    pub accounts_doc_href: Option<String>,
    /// Document href of the raw operations page.
    pub operations_doc_href: Option<String>,
    /// Document href of the raw effects page.
    pub effects_doc_href: Option<String>,
    /// Parsed asset list as inline JSON.
    pub assets_json: Option<String>,
    /// Parsed flag list as inline JSON.
    pub flags_json: Option<String>,
    /// Combined directory enrichment as inline JSON.
    pub directory_json: Option<String>,
    /// Pipeline status.
    pub status: LineageStatus,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Last write time.
    pub updated_at: DateTime<Utc>,
}

impl LineageRecord {
    /// Creates a record with sentinel defaults.
    #[must_use]
    pub fn new(
        account: impl Into<String>,
        network: impl Into<String>,
        status: LineageStatus,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            account: account.into(),
            creator_account: NO_CREATOR.to_string(),
            network: network.into(),
            account_created_at: None,
            home_domain: NO_HOME_DOMAIN.to_string(),
            native_balance: 0.0,
            accounts_doc_href: None,
            operations_doc_href: None,
            effects_doc_href: None,
            assets_json: None,
            flags_json: None,
            directory_json: None,
            status,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the creator account unless it is the sentinel.
    #[must_use]
    pub fn creator(&self) -> Option<&str> {
        if self.creator_account == NO_CREATOR || self.creator_account.is_empty() {
            None
        } else {
            Some(&self.creator_account)
        }
    }

    /// Decodes the inline asset list, empty when not yet collected.
    pub fn assets(&self) -> Result<Vec<AccountAsset>> {
        decode_inline(self.assets_json.as_deref())
    }

    /// Decodes the inline flag list, empty when not yet collected.
    pub fn flags(&self) -> Result<Vec<AccountFlag>> {
        decode_inline(self.flags_json.as_deref())
    }
}

fn decode_inline<T: serde::de::DeserializeOwned>(json: Option<&str>) -> Result<Vec<T>> {
    match json {
        Some(raw) if !raw.trim().is_empty() => Ok(serde_json::from_str(raw)?),
        _ => Ok(Vec::new()),
    }
}

/// Field-merge update applied by [`crate::ledger::StatusLedger::advance`].
///
/// `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPatch {
    /// New creator account.
    pub creator_account: Option<String>,
    /// New account creation time.
    pub account_created_at: Option<DateTime<Utc>>,
    /// New home domain.
    pub home_domain: Option<String>,
    /// New native balance.
    pub native_balance: Option<f64>,
    /// New snapshot href.
    pub accounts_doc_href: Option<String>,
    /// New operations href.
    pub operations_doc_href: Option<String>,
    /// New effects href.
    pub effects_doc_href: Option<String>,
    /// New inline assets.
    pub assets_json: Option<String>,
    /// New inline flags.
    pub flags_json: Option<String>,
    /// New inline directory enrichment.
    pub directory_json: Option<String>,
    /// Status to write instead of the stage's done status.
    pub final_status: Option<LineageStatus>,
}

impl RecordPatch {
    /// Creates an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the creator account.
    #[must_use]
    pub fn with_creator(mut self, creator: impl Into<String>) -> Self {
        self.creator_account = Some(creator.into());
        self
    }

    /// Sets the account creation time.
    #[must_use]
    pub fn with_account_created_at(mut self, at: DateTime<Utc>) -> Self {
        self.account_created_at = Some(at);
        self
    }

    /// Sets the home domain.
    #[must_use]
    pub fn with_home_domain(mut self, domain: impl Into<String>) -> Self {
        self.home_domain = Some(domain.into());
        self
    }

    /// Sets the native balance.
    #[must_use]
    pub fn with_native_balance(mut self, balance: f64) -> Self {
        self.native_balance = Some(balance);
        self
    }

    /// Ends the pipeline at `status` instead of the stage's done status.
    #[must_use]
    pub fn with_final_status(mut self, status: LineageStatus) -> Self {
        self.final_status = Some(status);
        self
    }

    /// Returns true if the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merges the patch into a record.
    pub fn apply(self, record: &mut LineageRecord) {
        if let Some(v) = self.creator_account {
            record.creator_account = v;
        }
        if let Some(v) = self.account_created_at {
            record.account_created_at = Some(v);
        }
        if let Some(v) = self.home_domain {
            record.home_domain = v;
        }
        if let Some(v) = self.native_balance {
            record.native_balance = v;
        }
        if let Some(v) = self.accounts_doc_href {
            record.accounts_doc_href = Some(v);
        }
        if let Some(v) = self.operations_doc_href {
            record.operations_doc_href = Some(v);
        }
        if let Some(v) = self.effects_doc_href {
            record.effects_doc_href = Some(v);
        }
        if let Some(v) = self.assets_json {
            record.assets_json = Some(v);
        }
        if let Some(v) = self.flags_json {
            record.flags_json = Some(v);
        }
        if let Some(v) = self.directory_json {
            record.directory_json = Some(v);
        }
    }
}

/// A non-native balance held by an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountAsset {
    /// Asset code (e.g. "USDC").
    pub asset_code: String,
    /// Issuing account.
    pub asset_issuer: String,
    /// Asset type (e.g. "credit_alphanum4").
    pub asset_type: String,
    /// Balance as reported by Horizon.
    pub balance: f64,
}

/// One authorization flag of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountFlag {
    /// Flag name (e.g. "auth_required").
    pub name: String,
    /// Whether the flag is set.
    pub enabled: bool,
}

/// One append-only health observation for a named stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CronHealthRecord {
    /// Unique row id.
    pub id: Uuid,
    /// Stage ("cron") name.
    pub cron_name: String,
    /// Observed health.
    pub status: HealthStatus,
    /// Free-text reason.
    pub reason: String,
    /// Observation time.
    pub created_at: DateTime<Utc>,
}

impl CronHealthRecord {
    /// Creates a new observation.
    #[must_use]
    pub fn new(
        cron_name: impl Into<String>,
        status: HealthStatus,
        reason: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            cron_name: cron_name.into(),
            status,
            reason: reason.into(),
            created_at: now,
        }
    }
}
