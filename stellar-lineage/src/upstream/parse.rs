//! Field extraction from raw Horizon responses.
//!
//! Missing or malformed fields resolve to documented defaults instead of
//! errors: a zero balance, the home-domain sentinel, no creator.

use serde_json::Value;

use crate::core::{AccountAsset, AccountFlag, NO_HOME_DOMAIN};
use crate::utils::{parse_horizon_timestamp, Timestamp};

/// Funding information from a `create_account` operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatorInfo {
    /// The funding account.
    pub funder: String,
    /// When the account was created, if the timestamp parsed.
    pub created_at: Option<Timestamp>,
}

fn balances(account: &Value) -> &[Value] {
    account
        .get("balances")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn balance_of(entry: &Value) -> Option<f64> {
    match entry.get("balance")? {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

/// First positive native balance, else 0.0.
#[must_use]
pub fn native_balance(account: &Value) -> f64 {
    balances(account)
        .iter()
        .filter(|entry| str_field(entry, "asset_type") == Some("native"))
        .filter_map(balance_of)
        .find(|balance| *balance > 0.0)
        .unwrap_or(0.0)
}

/// Home domain, or [`NO_HOME_DOMAIN`] when unset.
#[must_use]
pub fn home_domain(account: &Value) -> String {
    match str_field(account, "home_domain") {
        Some(domain) if !domain.is_empty() => domain.to_string(),
        _ => NO_HOME_DOMAIN.to_string(),
    }
}

/// The `create_account` operation that funded `account`, if on this page.
#[must_use]
pub fn creator(operations: &Value, account: &str) -> Option<CreatorInfo> {
    let records = operations
        .pointer("/_embedded/records")
        .and_then(Value::as_array)?;

    records
        .iter()
        .find(|record| {
            str_field(record, "type") == Some("create_account")
                && str_field(record, "account") == Some(account)
        })
        .and_then(|record| {
            let funder = str_field(record, "funder")?;
            Some(CreatorInfo {
                funder: funder.to_string(),
                created_at: str_field(record, "created_at")
                    .and_then(|raw| parse_horizon_timestamp(raw).ok()),
            })
        })
}

/// Every non-native balance that names an asset.
///
/// Liquidity pool shares carry no code or issuer and are skipped.
#[must_use]
pub fn assets(account: &Value) -> Vec<AccountAsset> {
    balances(account)
        .iter()
        .filter_map(|entry| {
            let asset_type = str_field(entry, "asset_type")?;
            if asset_type == "native" {
                return None;
            }
            Some(AccountAsset {
                asset_code: str_field(entry, "asset_code")?.to_string(),
                asset_issuer: str_field(entry, "asset_issuer")?.to_string(),
                asset_type: asset_type.to_string(),
                balance: balance_of(entry).unwrap_or(0.0),
            })
        })
        .collect()
}

/// The account's `flags` object as a list, ordered by flag name.
#[must_use]
pub fn flags(account: &Value) -> Vec<AccountFlag> {
    let Some(object) = account.get("flags").and_then(Value::as_object) else {
        return Vec::new();
    };
    let mut flags: Vec<AccountFlag> = object
        .iter()
        .filter_map(|(name, value)| {
            value.as_bool().map(|enabled| AccountFlag {
                name: name.clone(),
                enabled,
            })
        })
        .collect();
    flags.sort_by(|a, b| a.name.cmp(&b.name));
    flags
}

/// Asset used for the rating lookup.
///
/// Prefers an asset the account issues itself, then the first asset held.
#[must_use]
pub fn rating_asset<'a>(account: &str, assets: &'a [AccountAsset]) -> Option<&'a AccountAsset> {
    assets
        .iter()
        .find(|asset| asset.asset_issuer == account)
        .or_else(|| assets.first())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn account_json() -> Value {
        json!({
            "id": "GTARGET",
            "home_domain": "example.org",
            "balances": [
                {"asset_type": "credit_alphanum4", "asset_code": "USD", "asset_issuer": "GISSUER", "balance": "12.5000000"},
                {"asset_type": "liquidity_pool_shares", "liquidity_pool_id": "abc", "balance": "1.0"},
                {"asset_type": "native", "balance": "100.0000000"}
            ],
            "flags": {"auth_required": true, "auth_revocable": false, "auth_immutable": false}
        })
    }

    #[test]
    fn test_native_balance() {
        assert!((native_balance(&account_json()) - 100.0).abs() < f64::EPSILON);
        assert_eq!(native_balance(&json!({})), 0.0);
        assert_eq!(
            native_balance(&json!({"balances": [{"asset_type": "native", "balance": "0.0"}]})),
            0.0
        );
        assert_eq!(
            native_balance(&json!({"balances": [{"asset_type": "native", "balance": "lots"}]})),
            0.0
        );
    }

    #[test]
    fn test_home_domain() {
        assert_eq!(home_domain(&account_json()), "example.org");
        assert_eq!(home_domain(&json!({})), NO_HOME_DOMAIN);
        assert_eq!(home_domain(&json!({"home_domain": ""})), NO_HOME_DOMAIN);
    }

    #[test]
    fn test_creator_matches_account() {
        let ops = json!({"_embedded": {"records": [
            {"type": "payment", "from": "GX"},
            {"type": "create_account", "account": "GOTHER", "funder": "GWRONG", "created_at": "2019-04-16T19:51:54Z"},
            {"type": "create_account", "account": "GTARGET", "funder": "GPARENT", "created_at": "2019-04-16T19:51:54Z"}
        ]}});

        let info = creator(&ops, "GTARGET").unwrap();
        assert_eq!(info.funder, "GPARENT");
        assert_eq!(
            info.created_at,
            Some(Utc.with_ymd_and_hms(2019, 4, 16, 19, 51, 54).unwrap())
        );
        assert!(creator(&ops, "GNONE").is_none());
        assert!(creator(&json!({}), "GTARGET").is_none());
    }

    #[test]
    fn test_assets_skip_native_and_pools() {
        let parsed = assets(&account_json());
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].asset_code, "USD");
        assert!((parsed[0].balance - 12.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_flags_sorted() {
        let parsed = flags(&account_json());
        let names: Vec<_> = parsed.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["auth_immutable", "auth_required", "auth_revocable"]);
        assert!(parsed[1].enabled);
        assert!(flags(&json!({})).is_empty());
    }

    #[test]
    fn test_rating_asset_prefers_self_issued() {
        let held = AccountAsset {
            asset_code: "USD".into(),
            asset_issuer: "GISSUER".into(),
            asset_type: "credit_alphanum4".into(),
            balance: 1.0,
        };
        let own = AccountAsset {
            asset_code: "OWN".into(),
            asset_issuer: "GTARGET".into(),
            asset_type: "credit_alphanum4".into(),
            balance: 0.0,
        };

        let list = vec![held.clone(), own.clone()];
        assert_eq!(rating_asset("GTARGET", &list), Some(&own));
        assert_eq!(rating_asset("GELSE", &list), Some(&held));
        assert_eq!(rating_asset("GTARGET", &[]), None);
    }
}
