//! Horizon-shaped JSON fixtures.

use serde_json::{json, Value};

/// An account snapshot with a native balance and an optional home domain.
#[must_use]
pub fn account_json(account: &str, home_domain: Option<&str>, native_balance: &str) -> Value {
    account_with_assets_json(account, home_domain, native_balance, &[])
}

/// An account snapshot holding credit assets.
///
/// Each asset is `(code, issuer, balance)`. The account also carries the
/// four standard authorization flags, with `auth_required` set.
#[must_use]
pub fn account_with_assets_json(
    account: &str,
    home_domain: Option<&str>,
    native_balance: &str,
    assets: &[(&str, &str, &str)],
) -> Value {
    let mut balances: Vec<Value> = assets
        .iter()
        .map(|(code, issuer, balance)| {
            json!({
                "balance": balance,
                "asset_type": if code.len() <= 4 { "credit_alphanum4" } else { "credit_alphanum12" },
                "asset_code": code,
                "asset_issuer": issuer,
            })
        })
        .collect();
    balances.push(json!({"balance": native_balance, "asset_type": "native"}));

    let mut value = json!({
        "id": account,
        "account_id": account,
        "sequence": "1",
        "balances": balances,
        "flags": {
            "auth_required": true,
            "auth_revocable": false,
            "auth_immutable": false,
            "auth_clawback_enabled": false,
        },
    });
    if let (Some(domain), Some(object)) = (home_domain, value.as_object_mut()) {
        object.insert("home_domain".to_string(), Value::String(domain.to_string()));
    }
    value
}

/// A `create_account` operation record.
#[must_use]
pub fn create_account_op(funder: &str, account: &str, created_at: &str) -> Value {
    json!({
        "type": "create_account",
        "type_i": 0,
        "source_account": funder,
        "funder": funder,
        "account": account,
        "starting_balance": "10000.0000000",
        "created_at": created_at,
    })
}

/// A payment operation record.
#[must_use]
pub fn payment_op(from: &str, to: &str, amount: &str) -> Value {
    json!({
        "type": "payment",
        "type_i": 1,
        "source_account": from,
        "from": from,
        "to": to,
        "asset_type": "native",
        "amount": amount,
    })
}

/// An operations page wrapping `records`.
#[must_use]
pub fn operations_json(records: Vec<Value>) -> Value {
    json!({"_embedded": {"records": records}})
}

/// An effects page with the `account_created` effect.
#[must_use]
pub fn effects_json(account: &str) -> Value {
    json!({
        "_embedded": {
            "records": [{
                "type": "account_created",
                "account": account,
                "starting_balance": "10000.0000000",
            }]
        }
    })
}
