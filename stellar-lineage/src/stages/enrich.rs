//! Enrichment stages that decorate a finished record.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{require_href, LineageStage};
use crate::context::StageContext;
use crate::core::{LineageRecord, LineageStatus, RecordPatch, NO_HOME_DOMAIN};
use crate::documents::DocumentStore;
use crate::errors::Result;
use crate::upstream::parse;

/// Parses assets and flags out of the stored account snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssetsAndFlagsStage;

#[async_trait]
impl LineageStage for AssetsAndFlagsStage {
    fn name(&self) -> &'static str {
        "collect_account_assets"
    }

    fn entry(&self) -> &'static [LineageStatus] {
        &[LineageStatus::DoneMakeGrandparentLineage]
    }

    fn in_progress(&self) -> LineageStatus {
        LineageStatus::InProgressUpdatingAssetsAndFlags
    }

    fn done(&self) -> LineageStatus {
        LineageStatus::DoneUpdatingAssetsAndFlags
    }

    async fn execute(&self, ctx: &StageContext, record: &LineageRecord) -> Result<RecordPatch> {
        let href = require_href(record.accounts_doc_href.as_deref(), "account snapshot", record)?;
        let snapshot = ctx.documents_for(self.name()).get(href).await?;

        let assets = parse::assets(&snapshot.raw_data);
        let flags = parse::flags(&snapshot.raw_data);

        Ok(RecordPatch {
            assets_json: Some(serde_json::to_string(&assets)?),
            flags_json: Some(serde_json::to_string(&flags)?),
            ..RecordPatch::default()
        })
    }
}

/// Collects directory, rating and blocklist data into one JSON field.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryStage;

#[async_trait]
impl LineageStage for DirectoryStage {
    fn name(&self) -> &'static str {
        "collect_directory"
    }

    fn entry(&self) -> &'static [LineageStatus] {
        &[LineageStatus::DoneUpdatingAssetsAndFlags]
    }

    fn in_progress(&self) -> LineageStatus {
        LineageStatus::InProgressUpdatingDirectory
    }

    fn done(&self) -> LineageStatus {
        LineageStatus::DoneUpdatingDirectory
    }

    async fn execute(&self, ctx: &StageContext, record: &LineageRecord) -> Result<RecordPatch> {
        let network = ctx.network(&record.network)?;
        let account = record.account.as_str();
        let directory = ctx.directory();
        let policy = ctx.upstream_policy(self.name());

        let assets = record.assets()?;
        let rating_asset = parse::rating_asset(account, &assets);

        let asset_list = policy.call("stellar_expert.asset_list", || {
            directory.asset_list(network, account)
        });
        let asset_rating = async {
            match rating_asset {
                Some(asset) => {
                    policy
                        .call("stellar_expert.asset_rating", || {
                            directory.asset_rating(
                                network,
                                &asset.asset_code,
                                &asset.asset_issuer,
                                &asset.asset_type,
                            )
                        })
                        .await
                }
                None => Ok(Value::Null),
            }
        };
        let blocked_domain = async {
            if record.home_domain == NO_HOME_DOMAIN {
                Ok(Value::Null)
            } else {
                policy
                    .call("stellar_expert.blocked_domain", || {
                        directory.blocked_domain(network, &record.home_domain)
                    })
                    .await
            }
        };
        let account_directory = policy.call("stellar_expert.account_directory", || {
            directory.account_directory(network, account)
        });

        let (asset_list, asset_rating, blocked_domain, account_directory) =
            futures::try_join!(asset_list, asset_rating, blocked_domain, account_directory)?;

        let combined = json!({
            "se_asset_list": asset_list,
            "se_asset_rating": asset_rating,
            "se_blocked_domain": blocked_domain,
            "se_account_directory": account_directory,
        });

        Ok(RecordPatch {
            directory_json: Some(combined.to_string()),
            ..RecordPatch::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AccountAsset, AccountFlag};
    use crate::documents::HORIZON_ACCOUNTS;
    use crate::testing::{fixtures, TestHarness};

    const GA: &str = "GAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";
    const GB: &str = "GBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB";

    #[tokio::test]
    async fn test_assets_and_flags_written_inline() {
        let harness = TestHarness::new();
        let snapshot = fixtures::account_with_assets_json(
            GA,
            None,
            "1.0",
            &[("USD", GB, "12.5"), ("LONGASSET", GA, "3")],
        );
        let href = harness
            .store_document(HORIZON_ACCOUNTS, GA, &snapshot)
            .await
            .unwrap();
        let mut record = harness.add_pending(GA).await.unwrap();
        record.accounts_doc_href = Some(href);

        let patch = AssetsAndFlagsStage.execute(&harness.ctx, &record).await.unwrap();
        patch.apply(&mut record);

        let assets = record.assets().unwrap();
        assert_eq!(
            assets,
            vec![
                AccountAsset {
                    asset_code: "USD".into(),
                    asset_issuer: GB.into(),
                    asset_type: "credit_alphanum4".into(),
                    balance: 12.5,
                },
                AccountAsset {
                    asset_code: "LONGASSET".into(),
                    asset_issuer: GA.into(),
                    asset_type: "credit_alphanum12".into(),
                    balance: 3.0,
                },
            ]
        );
        let flags = record.flags().unwrap();
        assert_eq!(flags.len(), 4);
        assert!(flags.contains(&AccountFlag {
            name: "auth_required".into(),
            enabled: true,
        }));
    }

    #[tokio::test]
    async fn test_directory_skips_rating_and_blocklist_without_inputs() {
        let harness = TestHarness::new();
        harness
            .directory
            .insert_account_directory(GA, json!({"name": "Example"}));
        let record = harness.add_pending(GA).await.unwrap();

        let patch = DirectoryStage.execute(&harness.ctx, &record).await.unwrap();

        assert_eq!(harness.directory.calls(), 2);
        let combined: Value = serde_json::from_str(&patch.directory_json.unwrap()).unwrap();
        assert_eq!(combined["se_asset_list"], Value::Null);
        assert_eq!(combined["se_asset_rating"], Value::Null);
        assert_eq!(combined["se_blocked_domain"], Value::Null);
        assert_eq!(combined["se_account_directory"]["name"], "Example");
    }

    #[tokio::test]
    async fn test_directory_rates_self_issued_asset() {
        let harness = TestHarness::new();
        harness
            .directory
            .insert_asset_rating("OWN", GA, json!({"rating": 7}));
        harness
            .directory
            .insert_blocked_domain("bad.example", json!({"blocked": true}));
        let mut record = harness.add_pending(GA).await.unwrap();
        record.home_domain = "bad.example".into();
        record.assets_json = Some(
            serde_json::to_string(&vec![
                AccountAsset {
                    asset_code: "USD".into(),
                    asset_issuer: GB.into(),
                    asset_type: "credit_alphanum4".into(),
                    balance: 1.0,
                },
                AccountAsset {
                    asset_code: "OWN".into(),
                    asset_issuer: GA.into(),
                    asset_type: "credit_alphanum4".into(),
                    balance: 1.0,
                },
            ])
            .unwrap(),
        );

        let patch = DirectoryStage.execute(&harness.ctx, &record).await.unwrap();

        assert_eq!(harness.directory.calls(), 4);
        let combined: Value = serde_json::from_str(&patch.directory_json.unwrap()).unwrap();
        assert_eq!(combined["se_asset_rating"]["rating"], 7);
        assert_eq!(combined["se_blocked_domain"]["blocked"], true);
    }
}
