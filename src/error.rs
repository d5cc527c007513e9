//! Error types for the integration gate.
//!
//! This module defines the failure taxonomy for the handshake and data
//! loading pipeline:
//!
//! - Popup failures (the host refused to open the authorization window)
//! - Backend call failures (authorize/exchange/load), carrying the server's
//!   human-readable `detail` string when one was provided
//! - The benign "exchange returned nothing" outcome, which means the user
//!   never completed authorization inside the popup
//!
//! No operation in this crate retries automatically; every error is surfaced
//! to the initiating caller and internal state is rolled back to a safe,
//! re-attemptable state.

use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Fallback message used when the backend returns an error response without
/// a `detail` string.
pub(crate) const GENERIC_DETAIL: &str = "the server did not provide an error detail";

/// Errors that can occur during the handshake or data loading.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The host environment refused to create the authorization window.
    ///
    /// Fatal to the session; there is no retry. The caller decides how to
    /// surface this to the user (typically "allow popups and try again").
    #[error("popup blocked - the host refused to open the authorization window")]
    PopupBlocked,

    /// The authorize endpoint failed. No popup was opened.
    #[error("authorize failed: {detail}")]
    Authorize {
        /// Server-provided detail, or a generic fallback message.
        detail: String,
    },

    /// The exchange endpoint failed. Nothing was written to the store.
    #[error("exchange failed: {detail}")]
    Exchange {
        /// Server-provided detail, or a generic fallback message.
        detail: String,
    },

    /// The load endpoint failed. Any previously loaded result is preserved.
    #[error("load failed: {detail}")]
    Load {
        /// Server-provided detail, or a generic fallback message.
        detail: String,
    },

    /// The exchange call succeeded but returned no credential.
    ///
    /// This is the "handshake did not complete" outcome: the popup closed
    /// without the user finishing authorization. Benign - no credential is
    /// stored and a fresh connect attempt can be made immediately.
    #[error("no credential returned - authorization has not completed")]
    EmptyCredential,

    /// No provider with the given identifier is registered.
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    /// An operation needed a stored credential but the store is empty.
    #[error("not connected - complete the handshake before loading data")]
    NotConnected,

    /// A handshake session was driven more than once.
    ///
    /// Sessions are single-use: once a connect attempt reaches `Connected`
    /// or `Failed`, a fresh session is required to retry.
    #[error("session already used - start a new session to retry")]
    SessionConsumed,

    /// Network or HTTP transport error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error (invalid base URL or endpoint path).
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// Create an authorize error, falling back to a generic message when the
    /// server supplied no detail.
    #[must_use]
    pub fn authorize(detail: impl Into<Option<String>>) -> Self {
        Self::Authorize {
            detail: detail.into().unwrap_or_else(|| GENERIC_DETAIL.to_string()),
        }
    }

    /// Create an exchange error, falling back to a generic message.
    #[must_use]
    pub fn exchange(detail: impl Into<Option<String>>) -> Self {
        Self::Exchange {
            detail: detail.into().unwrap_or_else(|| GENERIC_DETAIL.to_string()),
        }
    }

    /// Create a load error, falling back to a generic message.
    #[must_use]
    pub fn load(detail: impl Into<Option<String>>) -> Self {
        Self::Load {
            detail: detail.into().unwrap_or_else(|| GENERIC_DETAIL.to_string()),
        }
    }

    /// Get the server-provided detail string, if this error carries one.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Authorize { detail } | Self::Exchange { detail } | Self::Load { detail } => {
                Some(detail)
            }
            _ => None,
        }
    }

    /// Check whether this error is the benign "not yet authorized" outcome.
    ///
    /// Returns `true` only for [`Error::EmptyCredential`]: the session ends
    /// without a credential, exactly as if it had never started.
    #[must_use]
    pub fn is_benign(&self) -> bool {
        matches!(self, Self::EmptyCredential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::authorize(Some("invalid org".to_string()));
        assert_eq!(err.to_string(), "authorize failed: invalid org");

        let err = Error::PopupBlocked;
        assert!(err.to_string().contains("popup blocked"));

        let err = Error::UnknownProvider("Salesforce".to_string());
        assert!(err.to_string().contains("Salesforce"));
    }

    #[test]
    fn test_generic_fallback() {
        let err = Error::exchange(None);
        assert_eq!(err.detail(), Some(GENERIC_DETAIL));

        let err = Error::load(None);
        assert!(err.to_string().contains(GENERIC_DETAIL));
    }

    #[test]
    fn test_detail_accessor() {
        assert_eq!(
            Error::load(Some("bad token".to_string())).detail(),
            Some("bad token")
        );
        assert_eq!(Error::PopupBlocked.detail(), None);
        assert_eq!(Error::EmptyCredential.detail(), None);
    }

    #[test]
    fn test_is_benign() {
        assert!(Error::EmptyCredential.is_benign());
        assert!(!Error::PopupBlocked.is_benign());
        assert!(!Error::exchange(None).is_benign());
    }

    #[test]
    fn test_error_conversions() {
        let json_err: std::result::Result<serde_json::Value, _> = serde_json::from_str("invalid");
        let err: Error = json_err.unwrap_err().into();
        assert!(matches!(err, Error::Json(_)));

        let url_err: std::result::Result<url::Url, _> = "not a url".parse();
        let err: Error = url_err.unwrap_err().into();
        assert!(matches!(err, Error::Url(_)));
    }
}
