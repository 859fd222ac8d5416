//! Error types for the lineage crawler.
//!
//! Every fallible operation in the crate returns [`LineageError`]. Upstream
//! failures keep enough structure (HTTP status, transport vs. decode) for the
//! retry layer to decide whether another attempt is worthwhile.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// The main error type for lineage operations.
#[derive(Debug, Error)]
pub enum LineageError {
    /// A record or document that was expected to exist is missing.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The creator chain loops back on itself.
    #[error("{0}")]
    CycleDetected(#[from] CycleDetectedError),

    /// An upstream API call failed.
    #[error("{0}")]
    Upstream(#[from] UpstreamError),

    /// A retried operation failed on every attempt.
    #[error("Retries exhausted for {operation} after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// The operation key that was retried.
        operation: String,
        /// Number of attempts made.
        attempts: usize,
        /// Display of the final error.
        last_error: String,
    },

    /// The document store rejected or failed a request.
    #[error("Document store error: {0}")]
    DocumentStore(String),

    /// The status ledger failed.
    #[error("Ledger error: {0}")]
    Ledger(String),

    /// An account address failed validation.
    #[error("Invalid account address: {0}")]
    InvalidAccount(String),

    /// A configuration value is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A status or health string could not be parsed.
    #[error("Unknown status: {0}")]
    UnknownStatus(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LineageError {
    /// Creates a not-found error for an account on a network.
    #[must_use]
    pub fn account_not_found(account: &str, network: &str) -> Self {
        Self::NotFound(format!("no lineage record for {account} on {network}"))
    }

    /// Returns true if another attempt might succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Upstream(err) => err.is_transient(),
            Self::DocumentStore(_) | Self::Io(_) => true,
            _ => false,
        }
    }
}

/// Result alias used across the crate.
pub type Result<T, E = LineageError> = std::result::Result<T, E>;

/// Failure of a call to an external HTTP API.
#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    /// The API answered with a non-success status code.
    #[error("{api} returned HTTP {status} for {url}")]
    Status {
        /// API name (e.g. "horizon").
        api: String,
        /// The requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// The request never produced a response.
    #[error("{api} transport failure for {url}: {message}")]
    Transport {
        /// API name.
        api: String,
        /// The requested URL.
        url: String,
        /// Underlying error message.
        message: String,
    },

    /// The response body was not the expected JSON.
    #[error("{api} returned an undecodable body for {url}: {message}")]
    Decode {
        /// API name.
        api: String,
        /// The requested URL.
        url: String,
        /// Underlying error message.
        message: String,
    },
}

impl UpstreamError {
    /// Returns true for rate limiting, server errors and transport failures.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Transport { .. } => true,
            Self::Decode { .. } => false,
        }
    }

    /// Returns true if the upstream is actively rate limiting.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::Status { status: 429, .. })
    }

    /// Returns true if the upstream has no such resource.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}

/// Diagnostic metadata attached to structural errors.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ErrorInfo {
    /// Error code (e.g., "LINEAGE-001-CYCLE").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ErrorInfo {
    /// Creates a new error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Raised when an account reappears while walking its creator chain.
#[derive(Debug, Clone, Error)]
#[error("Cycle detected in creator chain: {}", path.join(" -> "))]
pub struct CycleDetectedError {
    /// Accounts visited, ending with the repeated one.
    pub path: Vec<String>,
    /// Diagnostic info.
    pub error_info: ErrorInfo,
}

impl CycleDetectedError {
    /// Creates a new cycle error from the visited path.
    #[must_use]
    pub fn new(path: Vec<String>, network: &str) -> Self {
        let repeated = path.last().cloned().unwrap_or_default();
        let info = ErrorInfo::new(
            "LINEAGE-001-CYCLE",
            format!("Account {repeated} appears twice in its own creator chain"),
        )
        .with_fix_hint("Re-inquire the repeated account so its creator is collected again.")
        .with_context_entry("network", network);

        Self {
            path,
            error_info: info,
        }
    }

    /// The account that closed the loop.
    #[must_use]
    pub fn repeated_account(&self) -> Option<&str> {
        self.path.last().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_detected_error_message() {
        let err = CycleDetectedError::new(
            vec!["GA".to_string(), "GB".to_string(), "GA".to_string()],
            "public",
        );

        assert!(err.to_string().contains("GA -> GB -> GA"));
        assert_eq!(err.error_info.code, "LINEAGE-001-CYCLE");
        assert_eq!(err.repeated_account(), Some("GA"));
        assert_eq!(err.error_info.context.get("network"), Some(&"public".to_string()));
    }

    #[test]
    fn test_upstream_transient_classification() {
        let rate_limited = UpstreamError::Status {
            api: "horizon".into(),
            url: "u".into(),
            status: 429,
        };
        let missing = UpstreamError::Status {
            api: "horizon".into(),
            url: "u".into(),
            status: 404,
        };
        let decode = UpstreamError::Decode {
            api: "horizon".into(),
            url: "u".into(),
            message: "eof".into(),
        };

        assert!(rate_limited.is_transient());
        assert!(rate_limited.is_rate_limited());
        assert!(!missing.is_transient());
        assert!(missing.is_not_found());
        assert!(!rate_limited.is_not_found());
        assert!(!decode.is_transient());
        assert!(LineageError::from(rate_limited).is_transient());
    }

    #[test]
    fn test_not_found_is_not_transient() {
        let err = LineageError::account_not_found("GABC", "testnet");
        assert!(!err.is_transient());
        assert!(err.to_string().contains("GABC"));
    }
}
