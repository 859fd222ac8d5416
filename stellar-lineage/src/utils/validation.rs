//! Validation and parsing helpers for account addresses and document hrefs.

use regex::Regex;
use std::sync::LazyLock;

use crate::errors::{LineageError, Result};

#[allow(clippy::expect_used)]
static ACCOUNT_ADDRESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^G[A-Za-z0-9]{55}$").expect("account pattern compiles"));

#[allow(clippy::expect_used)]
static DOCUMENT_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}")
        .expect("document id pattern compiles")
});

/// Returns true if the string looks like a public account address.
#[must_use]
pub fn is_account_address(address: &str) -> bool {
    ACCOUNT_ADDRESS.is_match(address)
}

/// Validates a public account address (56 characters starting with `G`).
pub fn validate_account_address(address: &str) -> Result<()> {
    if is_account_address(address) {
        Ok(())
    } else {
        Err(LineageError::InvalidAccount(address.to_string()))
    }
}

/// Extracts the document id from a document href.
///
/// Takes the last UUID in the href so a UUID-shaped namespace earlier in
/// the path does not shadow the id.
#[must_use]
pub fn document_id_from_href(href: &str) -> Option<String> {
    DOCUMENT_ID
        .find_iter(href)
        .last()
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = "GCF7F72LNF3ODSJIIWPJWEVWX33VT2SVZSUQ5NMDKDLK3N2NFCUAUHPT";

    #[test]
    fn test_valid_account_address() {
        assert!(is_account_address(VALID));
        assert!(validate_account_address(VALID).is_ok());
    }

    #[test]
    fn test_invalid_account_addresses() {
        assert!(!is_account_address(""));
        assert!(!is_account_address(&VALID[1..]));
        assert!(!is_account_address(&VALID.replacen('G', "S", 1)));
        assert!(!is_account_address(&format!("{VALID}X")));
        assert!(matches!(
            validate_account_address("nope"),
            Err(LineageError::InvalidAccount(_))
        ));
    }

    #[test]
    fn test_document_id_from_href() {
        let href = "https://db-1.example.com/api/rest/v2/namespaces/ns/collections/horizon_accounts/a7a3affd-95d6-4de9-88d4-254acc9e3d8f";
        assert_eq!(
            document_id_from_href(href).as_deref(),
            Some("a7a3affd-95d6-4de9-88d4-254acc9e3d8f")
        );
        assert_eq!(document_id_from_href("https://example.com/no-id"), None);
    }

    #[test]
    fn test_document_id_takes_last_uuid() {
        let href = "https://1419f099-ef61-4112-861b-1f94552fab53.example.com/collections/c/3b993958-8d3b-4d59-9146-e41cda66054f";
        assert_eq!(
            document_id_from_href(href).as_deref(),
            Some("3b993958-8d3b-4d59-9146-e41cda66054f")
        );
    }
}
