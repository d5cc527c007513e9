//! Backend collaborator client.
//!
//! The authorization server is an opaque HTTP collaborator exposing, per
//! provider, a triplet of form-encoded POST endpoints:
//!
//! | Endpoint | Request fields | Response |
//! |----------|----------------|----------|
//! | `authorize` | `user_id`, `org_id` | authorization URL |
//! | `credentials` | `user_id`, `org_id` | credential object or empty |
//! | `load` | `credentials` (serialized) | ordered opaque records |
//!
//! Error responses carry a human-readable `detail` string which is surfaced
//! to the caller without transformation, with a generic fallback when it is
//! absent.

use serde::Deserialize;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::GateConfig;
use crate::credentials::CredentialObject;
use crate::error::{Error, Result};
use crate::loader::Record;
use crate::provider::ProviderSpec;

/// HTTP client for the per-provider authorize/credentials/load endpoints.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    config: GateConfig,
}

impl BackendClient {
    /// Create a client for the configured backend.
    #[must_use]
    pub fn new(config: GateConfig) -> Self {
        let http = match reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
        {
            Ok(http) => http,
            Err(err) => {
                warn!(error = %err, "HTTP client build failed, using default client without the configured timeout");
                reqwest::Client::default()
            }
        };
        Self { http, config }
    }

    /// Create a client with a pre-configured `reqwest` client.
    ///
    /// Useful for proxies or custom TLS settings; the configured
    /// `http_timeout` is ignored in that case.
    #[must_use]
    pub fn with_http_client(config: GateConfig, http: reqwest::Client) -> Self {
        Self { http, config }
    }

    /// The configuration this client was built with.
    #[must_use]
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.config.base_url.join(path)?)
    }

    /// Request an authorization URL for `(user_id, org_id)`.
    ///
    /// # Errors
    ///
    /// [`Error::Authorize`] with the server's `detail` on an HTTP error
    /// response; [`Error::Network`] on transport failure.
    #[instrument(skip(self, provider), fields(provider = provider.id()))]
    pub async fn authorize(
        &self,
        provider: &ProviderSpec,
        user_id: &str,
        org_id: &str,
    ) -> Result<String> {
        let url = self.endpoint(&provider.authorize_path())?;
        let response = self
            .http
            .post(url)
            .form(&[("user_id", user_id), ("org_id", org_id)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let err = Error::authorize(read_detail(response).await);
            warn!(%status, error = %err, "authorize call failed");
            return Err(err);
        }

        // The backend returns the URL as a JSON string; accept a bare text
        // body as well.
        let body = response.text().await?;
        let auth_url = serde_json::from_str::<String>(&body).unwrap_or(body);
        debug!("received authorization URL");
        Ok(auth_url)
    }

    /// Exchange the pending authorization for a credential.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyCredential`] when the call succeeds but returns no
    /// credential (authorization was never completed inside the popup);
    /// [`Error::Exchange`] with the server's `detail` on an HTTP error.
    #[instrument(skip(self, provider), fields(provider = provider.id()))]
    pub async fn exchange(
        &self,
        provider: &ProviderSpec,
        user_id: &str,
        org_id: &str,
    ) -> Result<CredentialObject> {
        let url = self.endpoint(&provider.credentials_path())?;
        let response = self
            .http
            .post(url)
            .form(&[("user_id", user_id), ("org_id", org_id)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let err = Error::exchange(read_detail(response).await);
            warn!(%status, error = %err, "exchange call failed");
            return Err(err);
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Err(Error::EmptyCredential);
        }

        let credential = CredentialObject::new(serde_json::from_str(&body)?);
        if credential.is_empty() {
            return Err(Error::EmptyCredential);
        }

        debug!("received credential");
        Ok(credential)
    }

    /// Fetch provider records using a granted credential.
    ///
    /// # Errors
    ///
    /// [`Error::Load`] with the server's `detail` on an HTTP error response.
    #[instrument(skip(self, provider, credential), fields(provider = provider.id()))]
    pub async fn load(
        &self,
        provider: &ProviderSpec,
        credential: &CredentialObject,
    ) -> Result<Vec<Record>> {
        let url = self.endpoint(&provider.load_path())?;
        let serialized = serde_json::to_string(credential.as_value())?;
        let response = self
            .http
            .post(url)
            .form(&[("credentials", serialized.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let err = Error::load(read_detail(response).await);
            warn!(%status, error = %err, "load call failed");
            return Err(err);
        }

        let records: Vec<Record> = response.json().await?;
        debug!(count = records.len(), "records loaded");
        Ok(records)
    }
}

/// Error body shape used by the backend (`{"detail": "..."}`).
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

/// Extract the human-readable detail from an error response body.
///
/// Accepts the `{"detail": ...}` object shape or a bare JSON string. `None`
/// when the body carries nothing usable; the error constructors substitute
/// the generic fallback message.
async fn read_detail(response: reqwest::Response) -> Option<String> {
    let body = response.text().await.unwrap_or_default();
    parse_detail(&body)
}

fn parse_detail(body: &str) -> Option<String> {
    if let Ok(ErrorBody {
        detail: Some(detail),
    }) = serde_json::from_str::<ErrorBody>(body)
    {
        match detail {
            serde_json::Value::String(s) if !s.is_empty() => return Some(s),
            serde_json::Value::Null => {}
            other => return Some(other.to_string()),
        }
    }

    match serde_json::from_str::<String>(body) {
        Ok(s) if !s.is_empty() => Some(s),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_detail_object() {
        assert_eq!(
            parse_detail(r#"{"detail": "invalid org"}"#).as_deref(),
            Some("invalid org")
        );
        assert_eq!(
            parse_detail(r#"{"detail": "No credentials found."}"#).as_deref(),
            Some("No credentials found.")
        );
    }

    #[test]
    fn test_parse_detail_bare_string() {
        assert_eq!(
            parse_detail(r#""state mismatch""#).as_deref(),
            Some("state mismatch")
        );
    }

    #[test]
    fn test_parse_detail_structured_value() {
        // FastAPI validation errors put a list under detail; surfaced as-is.
        let detail = parse_detail(r#"{"detail": [{"msg": "field required"}]}"#).unwrap();
        assert!(detail.contains("field required"));
    }

    #[test]
    fn test_parse_detail_absent() {
        assert_eq!(parse_detail(""), None);

        // Non-JSON bodies (e.g. an HTML error page) do not leak through.
        assert_eq!(parse_detail("<html>Bad Gateway</html>"), None);

        assert_eq!(parse_detail(r#"{"detail": null}"#), None);
        assert_eq!(parse_detail(r#"{"detail": ""}"#), None);
    }

    #[test]
    fn test_absent_detail_becomes_generic_message() {
        let err = Error::exchange(parse_detail(""));
        assert!(matches!(err, Error::Exchange { .. }));
        assert!(err.to_string().contains("did not provide an error detail"));
    }
}
